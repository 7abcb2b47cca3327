//! One-dimensional block spaces.

use alloc::vec::Vec;

use crate::error::{BlockSparseError, BlockSparseResult};

/// A one-dimensional index space of `dim` elements split into contiguous
/// blocks.
///
/// Block 0 always starts at zero; [`split`](Subspace::split) installs the
/// remaining block boundaries. Blocks are never empty, so a space holds at
/// most `dim` blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subspace {
    dim: usize,
    starts: Vec<usize>,
}

impl Subspace {
    /// Creates an unsplit space of `dim` elements (a single block).
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            starts: alloc::vec![0],
        }
    }

    /// Creates a space of `dim` elements split at the given points.
    pub fn with_split(dim: usize, split_points: &[usize]) -> BlockSparseResult<Self> {
        let mut space = Self::new(dim);
        space.split(split_points)?;
        Ok(space)
    }

    /// Returns the number of elements in this space.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the number of blocks.
    #[inline]
    pub fn n_blocks(&self) -> usize {
        self.starts.len()
    }

    /// Splits this space into blocks starting at the given absolute offsets.
    ///
    /// Points must be non-empty, strictly increasing, and within
    /// `[1, dim - 1]`; block 0 keeps its implicit start at zero.
    pub fn split(&mut self, split_points: &[usize]) -> BlockSparseResult<()> {
        if split_points.is_empty() || split_points.len() > self.dim.saturating_sub(1) {
            return Err(BlockSparseError::out_of_bounds(
                "must have 1 <= number of split points <= dim - 1",
            ));
        }
        for &point in split_points {
            if point > self.dim - 1 {
                return Err(BlockSparseError::out_of_bounds(
                    "split point cannot exceed dim - 1",
                ));
            }
            if point <= *self.starts.last().unwrap_or(&0) {
                return Err(BlockSparseError::out_of_bounds(
                    "split points must be strictly increasing",
                ));
            }
            self.starts.push(point);
        }
        Ok(())
    }

    /// Returns the size of the block with the given block index.
    pub fn block_size(&self, block_idx: usize) -> BlockSparseResult<usize> {
        if block_idx >= self.starts.len() {
            return Err(BlockSparseError::out_of_bounds(
                "block index exceeds the number of blocks",
            ));
        }
        if block_idx + 1 == self.starts.len() {
            Ok(self.dim - self.starts[block_idx])
        } else {
            Ok(self.starts[block_idx + 1] - self.starts[block_idx])
        }
    }

    /// Returns the absolute starting index of the block with the given block
    /// index.
    pub fn block_abs_index(&self, block_idx: usize) -> BlockSparseResult<usize> {
        self.starts
            .get(block_idx)
            .copied()
            .ok_or_else(|| {
                BlockSparseError::out_of_bounds("block index exceeds the number of blocks")
            })
    }
}
