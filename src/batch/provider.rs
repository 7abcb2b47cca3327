//! Batch providers: memory-bounded production of contraction results.

use alloc::vec::Vec;

use hashbrown::HashMap;
use log::debug;

use super::BatchMap;
use crate::element::Element;
use crate::error::{BlockSparseError, BlockSparseResult};
use crate::kernels::Contract2Kernel;
use crate::loops::{BatchRange, BlockLoop, SparseLoopList};
use crate::space::SparseBispace;

/// Produces an output tensor in memory-bounded chunks.
///
/// The caller owns the batch buffer; one batch must hold
/// [`batch_len`](BatchProvider::batch_len) elements for the ranges it
/// requests. A failed batch leaves the buffer partially written and must be
/// discarded.
pub trait BatchProvider<T> {
    /// Number of elements one batch buffer must hold for these ranges.
    fn batch_len(&self, batches: &BatchMap) -> BlockSparseResult<usize>;

    /// Computes one batch into `batch`, zero-filling the batch extent before
    /// accumulation.
    fn get_batch(&mut self, batch: &mut [T], batches: &BatchMap) -> BlockSparseResult<()>;
}

/// Batch provider for a two-tensor contraction.
///
/// Holds the loop list and kernel built by the factory plus borrowed input
/// data. No state changes between batches, so successive `get_batch` calls
/// are independent.
pub struct Contract2BatchProvider<'a, T> {
    list: SparseLoopList,
    kernel: Contract2Kernel,
    a: &'a [T],
    b: &'a [T],
}

impl<'a, T: Element> Contract2BatchProvider<'a, T> {
    /// Builds the provider from the factory's loop plan and input data.
    pub fn new(
        loops: Vec<BlockLoop>,
        bispaces: Vec<SparseBispace>,
        direct_tensors: Vec<usize>,
        a: &'a [T],
        b: &'a [T],
    ) -> BlockSparseResult<Self> {
        let list = SparseLoopList::new(loops, bispaces, direct_tensors)?;
        let kernel = Contract2Kernel::new(&list)?;
        Ok(Self { list, kernel, a, b })
    }

    /// Returns the loop list driving this provider.
    pub fn loop_list(&self) -> &SparseLoopList {
        &self.list
    }

    /// Translates per-(tensor, subspace) ranges into per-loop ranges and the
    /// truncated output size.
    fn resolve_batches(
        &self,
        batches: &BatchMap,
    ) -> BlockSparseResult<(HashMap<usize, BatchRange>, usize)> {
        let mut loop_batches = HashMap::new();
        let mut out_space = self.list.bispaces()[0].clone();
        for (&(tensor_idx, subspace_idx), &range) in batches {
            for (loop_idx, lp) in self.list.loops().iter().enumerate() {
                if lp.subspace_looped(tensor_idx) == Some(subspace_idx) {
                    loop_batches.insert(loop_idx, range);
                }
            }
            if tensor_idx == 0 {
                out_space = out_space.truncate_subspace(subspace_idx, range)?;
            }
        }
        Ok((loop_batches, out_space.nnz()))
    }
}

impl<'a, T: Element> BatchProvider<T> for Contract2BatchProvider<'a, T> {
    fn batch_len(&self, batches: &BatchMap) -> BlockSparseResult<usize> {
        self.resolve_batches(batches).map(|(_, len)| len)
    }

    fn get_batch(&mut self, batch: &mut [T], batches: &BatchMap) -> BlockSparseResult<()> {
        let (loop_batches, batch_len) = self.resolve_batches(batches)?;
        if batch.len() < batch_len {
            return Err(BlockSparseError::BatchTooSmall {
                needed: batch_len,
                got: batch.len(),
            });
        }
        debug!(
            "contraction batch: {} elements, {} restricted loops",
            batch_len,
            loop_batches.len()
        );

        // Contraction accumulates, so the batch extent starts from zero.
        let batch = &mut batch[..batch_len];
        batch.fill(T::zero());
        self.list
            .run(&mut self.kernel, batch, &[self.a, self.b], &loop_batches)
    }
}
