//! Block permutation kernel.

use alloc::vec::Vec;

use smallvec::SmallVec;

use super::BlockKernel;
use crate::element::Element;
use crate::error::{BlockSparseError, BlockSparseResult};
use crate::space::Permutation;

/// Writes a permuted copy of the input block: output index `i` runs over
/// input index `perm[i]`, so `out[u] = in[v]` with `u[i] = v[perm[i]]`.
#[derive(Debug, Clone)]
pub struct BlockPermuteKernel {
    perm: Permutation,
}

impl BlockPermuteKernel {
    pub fn new(perm: Permutation) -> Self {
        Self { perm }
    }
}

impl<T: Element> BlockKernel<T> for BlockPermuteKernel {
    fn run(
        &mut self,
        output: &mut [T],
        inputs: &[&[T]],
        dims: &[Vec<usize>],
    ) -> BlockSparseResult<()> {
        if inputs.len() != 1 || dims.len() != 2 {
            return Err(BlockSparseError::bad_parameter(
                "permute kernel expects one input and two dim lists",
            ));
        }
        let (dims_out, dims_in) = (&dims[0], &dims[1]);
        let order = self.perm.len();
        if dims_out.len() != order || dims_in.len() != order {
            return Err(BlockSparseError::bad_parameter(
                "block order must match the permutation length",
            ));
        }
        for i in 0..order {
            if dims_out[i] != dims_in[self.perm[i]] {
                return Err(BlockSparseError::bad_parameter(
                    "output block dims must be the permuted input dims",
                ));
            }
        }
        let len: usize = dims_in.iter().product();
        if output.len() != len || inputs[0].len() != len {
            return Err(BlockSparseError::out_of_bounds(
                "block slice length does not match its dims",
            ));
        }

        let mut strides_out = alloc::vec![1; order];
        for i in (0..order.saturating_sub(1)).rev() {
            strides_out[i] = strides_out[i + 1] * dims_out[i + 1];
        }

        let input = inputs[0];
        let mut index: SmallVec<[usize; 8]> = SmallVec::from_elem(0, order);
        for &value in input {
            let mut flat_out = 0;
            for i in 0..order {
                flat_out += index[self.perm[i]] * strides_out[i];
            }
            output[flat_out] = value;

            // Advance the row-major odometer over the input dims.
            for axis in (0..order).rev() {
                index[axis] += 1;
                if index[axis] < dims_in[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        Ok(())
    }
}
