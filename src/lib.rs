//! # blocksparse
//!
//! Block-sparse tensor index spaces and memory-bounded contraction for
//! quantum-chemistry-style workloads.
//!
//! ## Features
//!
//! - Sparse block-index spaces (bispaces): composition, permutation,
//!   contraction, and fusion of blocked dimensions
//! - Sparsity trees coupling index groups, with contract/fuse/permute algebra
//! - Sparsity-aware nested loop execution with pluggable block kernels
//! - Batched (memory-bounded) production of contraction results
//!
//! ## Example
//!
//! ```ignore
//! use blocksparse::{contract, BatchProvider, LabeledView, SparseBispace, Subspace};
//!
//! // C(i,j) = sum_k A(i,k) * B(k,j), produced one batch at a time.
//! let a = LabeledView::new(a_space, "ik".parse()?, &a_data);
//! let b = LabeledView::new(b_space, "kj".parse()?, &b_data);
//! let c = LabeledView::direct(c_space, "ij".parse()?);
//!
//! let mut provider = contract("k".parse()?, &a, &b).build(&c)?;
//! provider.get_batch(&mut batch, &batches)?;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod batch;
pub mod element;
pub mod error;
pub mod kernels;
pub mod labels;
pub mod loops;
pub mod space;

pub use batch::{BatchMap, BatchProvider, Contract2BatchProvider, Contract2Factory, ContractConfig, contract};
pub use element::Element;
pub use error::{BlockSparseError, BlockSparseResult};
pub use kernels::{BlockCopyKernel, BlockKernel, BlockPermuteKernel, BlockSubtractKernel, Contract2Kernel};
pub use labels::{LabelExpr, LabeledTensor, LabeledView};
pub use loops::{BatchRange, BlockLoop, SparseLoopList};
pub use space::{
    BispaceBuilder, BlockKey, Permutation, SparseBispace, SparseGroup, SparsityTree, Subspace,
};
