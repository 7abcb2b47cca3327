//! Two-tensor block contraction kernel.

use alloc::vec::Vec;

use super::BlockKernel;
use crate::element::Element;
use crate::error::{BlockSparseError, BlockSparseResult};
use crate::loops::SparseLoopList;

/// Accumulates `C += A * B` over one block combination.
///
/// Built from the loop list driving it: each loop is classified by which
/// tensors it advances. Loops advancing the output and exactly one input
/// form the output's free index groups; loops advancing both inputs but not
/// the output are contracted. The kernel walks stride tables built from the
/// current block dims, so any subspace ordering works, not just the matmul
/// layout.
#[derive(Debug)]
pub struct Contract2Kernel {
    /// Uncontracted via A: (subspace in A, subspace in C).
    m_loops: Vec<(usize, usize)>,
    /// Uncontracted via B: (subspace in B, subspace in C).
    n_loops: Vec<(usize, usize)>,
    /// Contracted: (subspace in A, subspace in B).
    k_loops: Vec<(usize, usize)>,
    m_tab: Vec<(usize, usize)>,
    n_tab: Vec<(usize, usize)>,
    k_tab: Vec<(usize, usize)>,
}

impl Contract2Kernel {
    /// Classifies the loop list of a contraction `C = A * B`.
    ///
    /// Expects exactly three bispaces (output first). Every loop must either
    /// pair the output with one input or pair the two inputs; at least one
    /// contracted loop is required.
    pub fn new(list: &SparseLoopList) -> BlockSparseResult<Self> {
        if list.bispaces().len() != 3 {
            return Err(BlockSparseError::bad_parameter(
                "contraction requires an output and two input bispaces",
            ));
        }

        let mut m_loops = Vec::new();
        let mut n_loops = Vec::new();
        let mut k_loops = Vec::new();
        for lp in list.loops() {
            let c = lp.subspace_looped(0);
            let a = lp.subspace_looped(1);
            let b = lp.subspace_looped(2);
            match (c, a, b) {
                (Some(sc), Some(sa), None) => m_loops.push((sa, sc)),
                (Some(sc), None, Some(sb)) => n_loops.push((sb, sc)),
                (None, Some(sa), Some(sb)) => k_loops.push((sa, sb)),
                (Some(_), Some(_), Some(_)) => {
                    return Err(BlockSparseError::bad_parameter(
                        "an index cannot be contracted and appear in the output",
                    ));
                }
                (Some(_), None, None) => {
                    return Err(BlockSparseError::bad_parameter(
                        "an output index must be advanced with one input",
                    ));
                }
                _ => {
                    return Err(BlockSparseError::bad_parameter(
                        "an input index absent from the output must be contracted",
                    ));
                }
            }
        }
        if k_loops.is_empty() {
            return Err(BlockSparseError::bad_parameter(
                "contraction requires at least one contracted index",
            ));
        }

        Ok(Self {
            m_loops,
            n_loops,
            k_loops,
            m_tab: Vec::new(),
            n_tab: Vec::new(),
            k_tab: Vec::new(),
        })
    }

    /// Row-major strides within a block of the given dims.
    fn strides(dims: &[usize]) -> Vec<usize> {
        let mut strides = alloc::vec![1; dims.len()];
        for i in (0..dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * dims[i + 1];
        }
        strides
    }

    /// Expands `(offset in X, offset in Y)` pairs for every index assignment
    /// of the given loop group.
    fn build_table(
        table: &mut Vec<(usize, usize)>,
        group: &[(usize, usize)],
        dims_x: &[usize],
        strides_x: &[usize],
        strides_y: &[usize],
    ) {
        table.clear();
        table.push((0, 0));
        for &(sx, sy) in group {
            let dim = dims_x[sx];
            let prev_len = table.len();
            for entry_idx in 0..prev_len {
                let (off_x, off_y) = table[entry_idx];
                for j in 1..dim {
                    table.push((off_x + j * strides_x[sx], off_y + j * strides_y[sy]));
                }
            }
        }
    }
}

impl<T: Element> BlockKernel<T> for Contract2Kernel {
    fn run(
        &mut self,
        output: &mut [T],
        inputs: &[&[T]],
        dims: &[Vec<usize>],
    ) -> BlockSparseResult<()> {
        if inputs.len() != 2 || dims.len() != 3 {
            return Err(BlockSparseError::bad_parameter(
                "contraction kernel expects two inputs and three dim lists",
            ));
        }
        let (dims_c, dims_a, dims_b) = (&dims[0], &dims[1], &dims[2]);
        for &(sa, sc) in &self.m_loops {
            let (Some(da), Some(dc)) = (dims_a.get(sa), dims_c.get(sc)) else {
                return Err(BlockSparseError::bad_parameter(
                    "dim list too short for the loop plan",
                ));
            };
            if da != dc {
                return Err(BlockSparseError::bad_parameter(
                    "incompatible block dimensions between A and the output",
                ));
            }
        }
        for &(sb, sc) in &self.n_loops {
            let (Some(db), Some(dc)) = (dims_b.get(sb), dims_c.get(sc)) else {
                return Err(BlockSparseError::bad_parameter(
                    "dim list too short for the loop plan",
                ));
            };
            if db != dc {
                return Err(BlockSparseError::bad_parameter(
                    "incompatible block dimensions between B and the output",
                ));
            }
        }
        for &(sa, sb) in &self.k_loops {
            let (Some(da), Some(db)) = (dims_a.get(sa), dims_b.get(sb)) else {
                return Err(BlockSparseError::bad_parameter(
                    "dim list too short for the loop plan",
                ));
            };
            if da != db {
                return Err(BlockSparseError::bad_parameter(
                    "incompatible contracted block dimensions",
                ));
            }
        }
        let len_c: usize = dims_c.iter().product();
        let len_a: usize = dims_a.iter().product();
        let len_b: usize = dims_b.iter().product();
        if output.len() != len_c || inputs[0].len() != len_a || inputs[1].len() != len_b {
            return Err(BlockSparseError::out_of_bounds(
                "block slice length does not match its dims",
            ));
        }

        let strides_c = Self::strides(dims_c);
        let strides_a = Self::strides(dims_a);
        let strides_b = Self::strides(dims_b);

        Self::build_table(&mut self.m_tab, &self.m_loops, dims_a, &strides_a, &strides_c);
        Self::build_table(&mut self.n_tab, &self.n_loops, dims_b, &strides_b, &strides_c);
        Self::build_table(&mut self.k_tab, &self.k_loops, dims_a, &strides_a, &strides_b);

        let a = inputs[0];
        let b = inputs[1];
        for &(a_m, c_m) in &self.m_tab {
            for &(b_n, c_n) in &self.n_tab {
                let mut acc = T::zero();
                for &(a_k, b_k) in &self.k_tab {
                    acc += a[a_m + a_k] * b[b_n + b_k];
                }
                output[c_m + c_n] += acc;
            }
        }
        Ok(())
    }
}
