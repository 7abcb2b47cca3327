//! Block kernels: pluggable leaf operations of the loop machinery.
//!
//! Contains implementations of:
//! - Two-tensor block contraction (matrix-multiply-like accumulation)
//! - Block permutation
//! - Block copy and subtraction

mod contract2;
mod copy;
mod permute;
mod subtract;

pub use contract2::Contract2Kernel;
pub use copy::BlockCopyKernel;
pub use permute::BlockPermuteKernel;
pub use subtract::BlockSubtractKernel;

use alloc::vec::Vec;

use crate::error::BlockSparseResult;

/// A leaf operation executed at the innermost loop position.
///
/// `output` and `inputs` are contiguous block-major slices of the current
/// block combination; `dims[t]` holds tensor `t`'s per-subspace block sizes,
/// the output at index 0. Within a block, elements are laid out row-major
/// over the tensor's subspace order.
pub trait BlockKernel<T> {
    fn run(
        &mut self,
        output: &mut [T],
        inputs: &[&[T]],
        dims: &[Vec<usize>],
    ) -> BlockSparseResult<()>;
}
