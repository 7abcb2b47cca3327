//! Error types for block-sparse tensor operations.

use alloc::string::String;

/// Errors that can occur while building or executing block-sparse operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum BlockSparseError {
    /// A block index, subspace index, or split point is outside its domain.
    #[cfg_attr(feature = "std", error("out of bounds: {message}"))]
    OutOfBounds { message: String },

    /// A structural precondition of a contraction, fusion, or permutation
    /// was violated.
    #[cfg_attr(feature = "std", error("invalid parameter: {message}"))]
    BadParameter { message: String },

    /// Index letter is contracted but also appears in the output.
    #[cfg_attr(
        feature = "std",
        error("index '{index}' cannot be contracted and appear in the output")
    )]
    ContractedIndexInOutput { index: char },

    /// Uncontracted index letter appears in both input tensors.
    #[cfg_attr(
        feature = "std",
        error("uncontracted index '{index}' appears in both input tensors")
    )]
    DuplicateUncontractedIndex { index: char },

    /// Output index letter appears in neither input tensor.
    #[cfg_attr(
        feature = "std",
        error("output index '{index}' not found in any input tensor")
    )]
    OutputIndexNotInInputs { index: char },

    /// Contracted index letter is missing from one of the input tensors.
    #[cfg_attr(
        feature = "std",
        error("contracted index '{index}' must appear in both input tensors")
    )]
    ContractedIndexMissing { index: char },

    /// Operation is structurally meaningless for this space.
    #[cfg_attr(feature = "std", error("not implemented: {message}"))]
    NotImplemented { message: String },

    /// Batch buffer is smaller than the truncated output extent.
    #[cfg_attr(
        feature = "std",
        error("batch buffer too small: need {needed} elements, got {got}")
    )]
    BatchTooSmall { needed: usize, got: usize },
}

impl BlockSparseError {
    pub fn out_of_bounds(message: impl Into<String>) -> Self {
        Self::OutOfBounds {
            message: message.into(),
        }
    }

    pub fn bad_parameter(message: impl Into<String>) -> Self {
        Self::BadParameter {
            message: message.into(),
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }
}

/// Result type for block-sparse operations.
pub type BlockSparseResult<T> = core::result::Result<T, BlockSparseError>;
