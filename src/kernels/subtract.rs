//! Block subtraction kernel.

use alloc::vec::Vec;

use super::BlockKernel;
use crate::element::Element;
use crate::error::{BlockSparseError, BlockSparseResult};

/// Computes `output = a - b` elementwise over one block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockSubtractKernel;

impl<T: Element> BlockKernel<T> for BlockSubtractKernel {
    fn run(
        &mut self,
        output: &mut [T],
        inputs: &[&[T]],
        dims: &[Vec<usize>],
    ) -> BlockSparseResult<()> {
        if inputs.len() != 2 || dims.len() != 3 {
            return Err(BlockSparseError::bad_parameter(
                "subtract kernel expects two inputs and three dim lists",
            ));
        }
        if dims[0] != dims[1] || dims[0] != dims[2] {
            return Err(BlockSparseError::bad_parameter(
                "subtract kernel requires identical block dims",
            ));
        }
        if output.len() != inputs[0].len() || output.len() != inputs[1].len() {
            return Err(BlockSparseError::out_of_bounds(
                "block slice length does not match its dims",
            ));
        }
        for ((out, &a), &b) in output.iter_mut().zip(inputs[0]).zip(inputs[1]) {
            *out = a - b;
        }
        Ok(())
    }
}
