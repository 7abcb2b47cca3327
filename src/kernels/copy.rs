//! Block copy kernel.

use alloc::vec::Vec;

use super::BlockKernel;
use crate::element::Element;
use crate::error::{BlockSparseError, BlockSparseResult};

/// Copies one block to the output unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockCopyKernel;

impl<T: Element> BlockKernel<T> for BlockCopyKernel {
    fn run(
        &mut self,
        output: &mut [T],
        inputs: &[&[T]],
        dims: &[Vec<usize>],
    ) -> BlockSparseResult<()> {
        if inputs.len() != 1 || dims.len() != 2 {
            return Err(BlockSparseError::bad_parameter(
                "copy kernel expects one input and two dim lists",
            ));
        }
        if dims[0] != dims[1] {
            return Err(BlockSparseError::bad_parameter(
                "copy kernel requires identical block dims",
            ));
        }
        if output.len() != inputs[0].len() {
            return Err(BlockSparseError::out_of_bounds(
                "block slice length does not match its dims",
            ));
        }
        output.copy_from_slice(inputs[0]);
        Ok(())
    }
}
