//! Sparse loop lists: sparsity-aware nested block iteration.

use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::BlockLoop;
use crate::error::{BlockSparseError, BlockSparseResult};
use crate::kernels::BlockKernel;
use crate::space::SparseBispace;

/// Inclusive block-index range restricting one loop variable for a single
/// run.
pub type BatchRange = (usize, usize);

/// An ordered list of block loops bound to a set of bispaces.
///
/// Tensor 0 is the output; the remaining tensors are inputs in order.
/// `run` iterates the loops outer-to-inner in list order, prunes block
/// combinations that any coupling tree marks structurally zero, and invokes
/// the kernel at the innermost position with contiguous block-major slices.
/// No iteration state survives between runs.
///
/// Direct tensors have no persistent storage: their slice covers only the
/// (possibly batch-truncated) space, so their offsets are computed against
/// the truncated bispace with block indices shifted into the batch range.
#[derive(Debug, Clone)]
pub struct SparseLoopList {
    loops: Vec<BlockLoop>,
    bispaces: Vec<SparseBispace>,
    direct_tensors: Vec<usize>,
    /// Loop index advancing each (tensor, subspace), filled by validation.
    loop_of: Vec<Vec<usize>>,
}

impl SparseLoopList {
    /// Builds a loop list, validating that the loops form a complete,
    /// consistent iteration plan for the bispaces.
    pub fn new(
        loops: Vec<BlockLoop>,
        bispaces: Vec<SparseBispace>,
        direct_tensors: Vec<usize>,
    ) -> BlockSparseResult<Self> {
        if loops.is_empty() || bispaces.is_empty() {
            return Err(BlockSparseError::bad_parameter(
                "a loop list needs at least one loop and one bispace",
            ));
        }
        for &t in &direct_tensors {
            if t >= bispaces.len() {
                return Err(BlockSparseError::bad_parameter(
                    "direct tensor index exceeds the tensor list length",
                ));
            }
        }

        let mut loop_of: Vec<Vec<usize>> = bispaces
            .iter()
            .map(|b| alloc::vec![usize::MAX; b.order()])
            .collect();

        for (loop_idx, lp) in loops.iter().enumerate() {
            if lp.n_tensors() != bispaces.len() {
                return Err(BlockSparseError::bad_parameter(
                    "loop tensor count must match the bispace list length",
                ));
            }
            let mut reference: Option<&crate::space::Subspace> = None;
            let mut bound = false;
            for (t, bispace) in bispaces.iter().enumerate() {
                let Some(s) = lp.subspace_looped(t) else {
                    continue;
                };
                bound = true;
                let subspace = bispace.subspace(s)?;
                match reference {
                    None => reference = Some(subspace),
                    Some(reference) if reference != subspace => {
                        return Err(BlockSparseError::bad_parameter(
                            "a loop must advance subspaces with identical block structure",
                        ));
                    }
                    _ => {}
                }
                if loop_of[t][s] != usize::MAX {
                    return Err(BlockSparseError::bad_parameter(
                        "a subspace cannot be advanced by two loops",
                    ));
                }
                loop_of[t][s] = loop_idx;
            }
            if !bound {
                return Err(BlockSparseError::bad_parameter(
                    "a loop must advance at least one tensor",
                ));
            }
        }

        for slots in &loop_of {
            if slots.iter().any(|&l| l == usize::MAX) {
                return Err(BlockSparseError::bad_parameter(
                    "every subspace of every bispace must be advanced by exactly one loop",
                ));
            }
        }

        Ok(Self {
            loops,
            bispaces,
            direct_tensors,
            loop_of,
        })
    }

    /// Returns the loops in iteration order, outermost first.
    pub fn loops(&self) -> &[BlockLoop] {
        &self.loops
    }

    /// Returns the bispaces, output first.
    pub fn bispaces(&self) -> &[SparseBispace] {
        &self.bispaces
    }

    /// Returns the indices of direct tensors.
    pub fn direct_tensors(&self) -> &[usize] {
        &self.direct_tensors
    }

    /// Executes the nested loops, dispatching `kernel` for every jointly
    /// significant block combination.
    ///
    /// `output` backs tensor 0 and `inputs` the remaining tensors, all in
    /// block-major layout. `batches` restricts loop variables to inclusive
    /// block ranges for this run.
    pub fn run<T, K: BlockKernel<T>>(
        &self,
        kernel: &mut K,
        output: &mut [T],
        inputs: &[&[T]],
        batches: &HashMap<usize, BatchRange>,
    ) -> BlockSparseResult<()> {
        if inputs.len() + 1 != self.bispaces.len() {
            return Err(BlockSparseError::bad_parameter(
                "expected one data slice per tensor",
            ));
        }

        let mut loop_blocks = Vec::with_capacity(self.loops.len());
        for lp in &self.loops {
            let (t, s) = (0..self.bispaces.len())
                .find_map(|t| lp.subspace_looped(t).map(|s| (t, s)))
                .ok_or_else(|| {
                    BlockSparseError::bad_parameter("a loop must advance at least one tensor")
                })?;
            loop_blocks.push(self.bispaces[t][s].n_blocks());
        }

        for (&loop_idx, &(lo, hi)) in batches {
            if loop_idx >= self.loops.len() {
                return Err(BlockSparseError::bad_parameter(
                    "batch range names a loop outside the loop list",
                ));
            }
            if lo > hi || hi >= loop_blocks[loop_idx] {
                return Err(BlockSparseError::out_of_bounds(
                    "batch range is not a valid block range for its loop",
                ));
            }
        }

        // Direct tensors are addressed within the batch buffer: truncate
        // their spaces to the batch ranges and shift block indices down.
        let mut effective = self.bispaces.clone();
        let mut shifts: Vec<Vec<usize>> = self
            .bispaces
            .iter()
            .map(|b| alloc::vec![0; b.order()])
            .collect();
        for (&loop_idx, &range) in batches {
            for &t in &self.direct_tensors {
                if let Some(s) = self.loops[loop_idx].subspace_looped(t) {
                    effective[t] = effective[t].truncate_subspace(s, range)?;
                    shifts[t][s] = range.0;
                }
            }
        }

        if output.len() < effective[0].nnz() {
            return Err(BlockSparseError::out_of_bounds(
                "output slice shorter than its block-index space",
            ));
        }
        for (i, input) in inputs.iter().enumerate() {
            if input.len() < effective[i + 1].nnz() {
                return Err(BlockSparseError::out_of_bounds(
                    "input slice shorter than its block-index space",
                ));
            }
        }

        // A group's tuple can be tested as soon as its innermost-bound loop
        // has set a block index for every member.
        let mut checks: Vec<Vec<(usize, usize)>> = alloc::vec![Vec::new(); self.loops.len()];
        for (t, bispace) in self.bispaces.iter().enumerate() {
            for (g, group) in bispace.sparse_groups().iter().enumerate() {
                let depth = (group.offset()..group.end())
                    .map(|s| self.loop_of[t][s])
                    .fold(0, usize::max);
                checks[depth].push((t, g));
            }
        }

        let mut ctx = RunCtx {
            loop_blocks,
            batches,
            checks,
            effective,
            shifts,
            block_idx: self
                .bispaces
                .iter()
                .map(|b| SmallVec::from_elem(0, b.order()))
                .collect(),
            dims: self.bispaces.iter().map(|b| Vec::with_capacity(b.order())).collect(),
            key_buf: SmallVec::new(),
        };
        self.run_level(0, &mut ctx, kernel, output, inputs)
    }

    fn run_level<T, K: BlockKernel<T>>(
        &self,
        depth: usize,
        ctx: &mut RunCtx<'_>,
        kernel: &mut K,
        output: &mut [T],
        inputs: &[&[T]],
    ) -> BlockSparseResult<()> {
        let (lo, hi) = ctx
            .batches
            .get(&depth)
            .copied()
            .unwrap_or((0, ctx.loop_blocks[depth] - 1));
        'blocks: for block in lo..=hi {
            for t in 0..self.bispaces.len() {
                if let Some(s) = self.loops[depth].subspace_looped(t) {
                    ctx.block_idx[t][s] = block;
                }
            }
            for &(t, g) in &ctx.checks[depth] {
                let group = &self.bispaces[t].sparse_groups()[g];
                let key = &ctx.block_idx[t][group.offset()..group.end()];
                if group.tree().search(key).is_none() {
                    continue 'blocks;
                }
            }
            if depth + 1 == self.loops.len() {
                self.dispatch(ctx, kernel, output, inputs)?;
            } else {
                self.run_level(depth + 1, ctx, kernel, output, inputs)?;
            }
        }
        Ok(())
    }

    /// Computes per-tensor block offsets and dims, then invokes the kernel
    /// on the current block combination.
    fn dispatch<T, K: BlockKernel<T>>(
        &self,
        ctx: &mut RunCtx<'_>,
        kernel: &mut K,
        output: &mut [T],
        inputs: &[&[T]],
    ) -> BlockSparseResult<()> {
        let n_tensors = self.bispaces.len();
        let mut offsets: SmallVec<[usize; 4]> = SmallVec::new();
        let mut lens: SmallVec<[usize; 4]> = SmallVec::new();
        for t in 0..n_tensors {
            ctx.key_buf.clear();
            for (s, &block) in ctx.block_idx[t].iter().enumerate() {
                ctx.key_buf.push(block - ctx.shifts[t][s]);
            }
            offsets.push(ctx.effective[t].block_offset(&ctx.key_buf)?);

            let mut len = 1;
            ctx.dims[t].clear();
            for (s, &block) in ctx.block_idx[t].iter().enumerate() {
                let size = self.bispaces[t][s].block_size(block)?;
                ctx.dims[t].push(size);
                len *= size;
            }
            lens.push(len);
        }

        let out_block = output
            .get_mut(offsets[0]..offsets[0] + lens[0])
            .ok_or_else(|| {
                BlockSparseError::out_of_bounds("output block extends past the output slice")
            })?;
        let mut in_blocks: SmallVec<[&[T]; 4]> = SmallVec::new();
        for (i, input) in inputs.iter().enumerate() {
            let t = i + 1;
            in_blocks.push(input.get(offsets[t]..offsets[t] + lens[t]).ok_or_else(
                || BlockSparseError::out_of_bounds("input block extends past the input slice"),
            )?);
        }
        kernel.run(out_block, &in_blocks, &ctx.dims)
    }
}

struct RunCtx<'a> {
    loop_blocks: Vec<usize>,
    batches: &'a HashMap<usize, BatchRange>,
    checks: Vec<Vec<(usize, usize)>>,
    effective: Vec<SparseBispace>,
    shifts: Vec<Vec<usize>>,
    block_idx: Vec<SmallVec<[usize; 8]>>,
    dims: Vec<Vec<usize>>,
    key_buf: SmallVec<[usize; 8]>,
}
