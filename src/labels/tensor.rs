//! The labeled-tensor interface supplied by the expression layer.

use super::LabelExpr;
use crate::space::SparseBispace;

/// A tensor as the contraction engine sees it: a sparse block-index space,
/// an ordered index-letter labeling, and optionally materialized data.
///
/// `data` returning `None` marks a direct tensor: its elements never exist in
/// persistent storage and are produced straight into the batch buffer the
/// caller supplies per [`get_batch`](crate::batch::BatchProvider::get_batch)
/// call.
pub trait LabeledTensor<T> {
    /// The tensor's sparse block-index space.
    fn bispace(&self) -> &SparseBispace;

    /// The tensor's index-letter labeling, one letter per subspace.
    fn labels(&self) -> &LabelExpr;

    /// The tensor's backing data in block-major layout, or `None` for a
    /// direct tensor.
    fn data(&self) -> Option<&[T]>;
}

/// A borrowed labeled-tensor view.
#[derive(Debug, Clone)]
pub struct LabeledView<'a, T> {
    bispace: SparseBispace,
    labels: LabelExpr,
    data: Option<&'a [T]>,
}

impl<'a, T> LabeledView<'a, T> {
    /// Creates a view over materialized data.
    pub fn new(bispace: SparseBispace, labels: LabelExpr, data: &'a [T]) -> Self {
        Self {
            bispace,
            labels,
            data: Some(data),
        }
    }

    /// Creates a direct view: the tensor exists only in batch buffers.
    pub fn direct(bispace: SparseBispace, labels: LabelExpr) -> Self {
        Self {
            bispace,
            labels,
            data: None,
        }
    }
}

impl<'a, T> LabeledTensor<T> for LabeledView<'a, T> {
    fn bispace(&self) -> &SparseBispace {
        &self.bispace
    }

    fn labels(&self) -> &LabelExpr {
        &self.labels
    }

    fn data(&self) -> Option<&[T]> {
        self.data
    }
}
