//! Block loops: one loop variable of a multi-tensor operation.

use alloc::vec::Vec;

use crate::error::{BlockSparseError, BlockSparseResult};

/// One loop variable over an ordered tensor list.
///
/// For each participating tensor the loop either advances a specific logical
/// subspace or ignores the tensor entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLoop {
    subspaces: Vec<Option<usize>>,
}

impl BlockLoop {
    /// Creates a loop over `n_tensors` tensors, initially ignoring all of
    /// them.
    pub fn new(n_tensors: usize) -> Self {
        Self {
            subspaces: alloc::vec![None; n_tensors],
        }
    }

    /// Returns the number of tensors in the tensor list.
    #[inline]
    pub fn n_tensors(&self) -> usize {
        self.subspaces.len()
    }

    /// Binds this loop to subspace `subspace_idx` of tensor `tensor_idx`.
    pub fn set_subspace_looped(
        &mut self,
        tensor_idx: usize,
        subspace_idx: usize,
    ) -> BlockSparseResult<()> {
        let slot = self.subspaces.get_mut(tensor_idx).ok_or_else(|| {
            BlockSparseError::bad_parameter("tensor index exceeds the tensor list length")
        })?;
        *slot = Some(subspace_idx);
        Ok(())
    }

    /// Returns true if this loop does not advance tensor `tensor_idx`.
    pub fn is_tensor_ignored(&self, tensor_idx: usize) -> bool {
        self.subspaces
            .get(tensor_idx)
            .is_none_or(|slot| slot.is_none())
    }

    /// Returns the subspace of tensor `tensor_idx` this loop advances, if
    /// any.
    pub fn subspace_looped(&self, tensor_idx: usize) -> Option<usize> {
        self.subspaces.get(tensor_idx).copied().flatten()
    }
}
