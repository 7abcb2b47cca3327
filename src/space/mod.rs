//! Sparse block-index spaces.
//!
//! A tensor's shape is described by a [`SparseBispace`]: an ordered
//! composition of one-dimensional [`Subspace`]s, some contiguous runs of
//! which are coupled by a [`SparsityTree`] recording which block-index tuples
//! are structurally nonzero.

mod bispace;
mod permutation;
mod subspace;
mod tree;

pub use bispace::{BispaceBuilder, SparseBispace, SparseGroup};
pub use permutation::Permutation;
pub use subspace::Subspace;
pub use tree::{BlockKey, SparsityTree};
