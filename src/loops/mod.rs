//! Nested block iteration over multiple tensors.
//!
//! A [`BlockLoop`] names one loop variable of a multi-tensor operation; a
//! [`SparseLoopList`] executes a list of them over a set of bispaces,
//! skipping block combinations that sparsity trees mark as structurally
//! zero, and dispatching a block kernel at the innermost position.

mod block_loop;
mod loop_list;

pub use block_loop::BlockLoop;
pub use loop_list::{BatchRange, SparseLoopList};
