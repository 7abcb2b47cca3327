//! Runtime permutations of subspace order.

use alloc::vec::Vec;

use crate::error::{BlockSparseError, BlockSparseResult};

/// A permutation of `0..n`, applied as `dest[i] = src[perm[i]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    entries: Vec<usize>,
}

impl Permutation {
    /// Creates the identity permutation of length `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            entries: (0..n).collect(),
        }
    }

    /// Creates a permutation from explicit entries.
    ///
    /// Fails unless the entries are a bijection of `0..n`.
    pub fn new(entries: Vec<usize>) -> BlockSparseResult<Self> {
        let n = entries.len();
        let mut seen = alloc::vec![false; n];
        for &e in &entries {
            if e >= n {
                return Err(BlockSparseError::bad_parameter(alloc::format!(
                    "permutation entry {} out of range for length {}",
                    e,
                    n
                )));
            }
            if seen[e] {
                return Err(BlockSparseError::bad_parameter(alloc::format!(
                    "permutation entry {} appears twice",
                    e
                )));
            }
            seen[e] = true;
        }
        Ok(Self { entries })
    }

    /// Returns the permutation length.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true for the zero-length permutation.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if this is the identity.
    pub fn is_identity(&self) -> bool {
        self.entries.iter().enumerate().all(|(i, &e)| i == e)
    }

    /// Returns the entries as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.entries
    }

    /// Applies the permutation to a slice: `result[i] = src[perm[i]]`.
    pub fn apply<T: Clone>(&self, src: &[T]) -> Vec<T> {
        self.entries.iter().map(|&e| src[e].clone()).collect()
    }
}

impl core::ops::Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, idx: usize) -> &usize {
        &self.entries[idx]
    }
}
