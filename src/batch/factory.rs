//! Building contraction batch providers from labeled tensors.

use alloc::vec::Vec;

use log::debug;

use super::config::ContractConfig;
use super::provider::Contract2BatchProvider;
use crate::element::Element;
use crate::error::{BlockSparseError, BlockSparseResult};
use crate::labels::{LabelExpr, LabeledTensor};
use crate::loops::BlockLoop;
use crate::space::SparseBispace;

/// Specifies the contraction of two labeled tensors summed over the letters
/// of `contracted`.
///
/// The factory captures the inputs; [`build`](Contract2Factory::build) binds
/// the output labeling and produces a batch provider.
pub fn contract<'a, T, A, B>(
    contracted: LabelExpr,
    a: &'a A,
    b: &'a B,
) -> Contract2Factory<'a, T>
where
    A: LabeledTensor<T>,
    B: LabeledTensor<T>,
{
    Contract2Factory {
        contracted,
        a_labels: a.labels().clone(),
        b_labels: b.labels().clone(),
        a_bispace: a.bispace().clone(),
        b_bispace: b.bispace().clone(),
        a_data: a.data(),
        b_data: b.data(),
        config: ContractConfig::default(),
    }
}

/// Factory turning a labeled contraction specification into a batch
/// provider.
pub struct Contract2Factory<'a, T> {
    contracted: LabelExpr,
    a_labels: LabelExpr,
    b_labels: LabelExpr,
    a_bispace: SparseBispace,
    b_bispace: SparseBispace,
    a_data: Option<&'a [T]>,
    b_data: Option<&'a [T]>,
    config: ContractConfig,
}

impl<'a, T: Element> Contract2Factory<'a, T> {
    /// Replaces the planning configuration.
    pub fn with_config(mut self, config: ContractConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the batch provider producing the labeled output `c`.
    ///
    /// One block loop is created per output letter (bound to the single
    /// input carrying it) and per contracted letter (bound to both inputs).
    /// Whichever group has the larger estimated dense iteration volume goes
    /// outermost, with writes penalized by the configured factor. The output
    /// is marked direct when it has no backing data.
    pub fn build(
        &self,
        c: &impl LabeledTensor<T>,
    ) -> BlockSparseResult<Contract2BatchProvider<'a, T>> {
        let c_labels = c.labels();
        let bispaces = alloc::vec![
            c.bispace().clone(),
            self.a_bispace.clone(),
            self.b_bispace.clone(),
        ];

        let mut uncontracted_loops = Vec::with_capacity(c_labels.len());
        for (i, letter) in c_labels.iter().enumerate() {
            if self.contracted.contains(letter) {
                return Err(BlockSparseError::ContractedIndexInOutput { index: letter });
            }
            if self.a_labels.contains(letter) && self.b_labels.contains(letter) {
                return Err(BlockSparseError::DuplicateUncontractedIndex { index: letter });
            }

            let mut lp = BlockLoop::new(bispaces.len());
            lp.set_subspace_looped(0, i)?;
            if let Some(pos) = self.a_labels.index_of(letter) {
                lp.set_subspace_looped(1, pos)?;
            } else if let Some(pos) = self.b_labels.index_of(letter) {
                lp.set_subspace_looped(2, pos)?;
            } else {
                return Err(BlockSparseError::OutputIndexNotInInputs { index: letter });
            }
            uncontracted_loops.push(lp);
        }

        let mut contracted_loops = Vec::with_capacity(self.contracted.len());
        for letter in self.contracted.iter() {
            let (Some(pos_a), Some(pos_b)) = (
                self.a_labels.index_of(letter),
                self.b_labels.index_of(letter),
            ) else {
                return Err(BlockSparseError::ContractedIndexMissing { index: letter });
            };
            let mut lp = BlockLoop::new(bispaces.len());
            lp.set_subspace_looped(1, pos_a)?;
            lp.set_subspace_looped(2, pos_b)?;
            contracted_loops.push(lp);
        }

        // Crude dense-volume estimate deciding which group goes outermost:
        // contracted-outer favors dot-product-like access and avoids
        // rewriting the output. Sparsity is intentionally ignored here.
        let uncontracted_dim = loop_volume(&uncontracted_loops, &bispaces)?;
        let contracted_dim = loop_volume(&contracted_loops, &bispaces)?;
        let contracted_outer =
            contracted_dim > uncontracted_dim.saturating_mul(self.config.write_penalty);
        debug!(
            "loop order: contracted volume {} vs uncontracted {} -> {} loops outermost",
            contracted_dim,
            uncontracted_dim,
            if contracted_outer {
                "contracted"
            } else {
                "uncontracted"
            }
        );

        let mut loops = Vec::with_capacity(uncontracted_loops.len() + contracted_loops.len());
        if contracted_outer {
            loops.extend(contracted_loops);
            loops.extend(uncontracted_loops);
        } else {
            loops.extend(uncontracted_loops);
            loops.extend(contracted_loops);
        }

        let mut direct_tensors = Vec::new();
        if c.data().is_none() {
            direct_tensors.push(0);
        }

        let a_data = self
            .a_data
            .ok_or_else(|| BlockSparseError::bad_parameter("input tensor A is not materialized"))?;
        let b_data = self
            .b_data
            .ok_or_else(|| BlockSparseError::bad_parameter("input tensor B is not materialized"))?;

        Contract2BatchProvider::new(loops, bispaces, direct_tensors, a_data, b_data)
    }
}

/// Product of the dense dims of every (tensor, subspace) pair the loops
/// advance.
fn loop_volume(loops: &[BlockLoop], bispaces: &[SparseBispace]) -> BlockSparseResult<u64> {
    let mut volume: u64 = 1;
    for lp in loops {
        for (t, bispace) in bispaces.iter().enumerate() {
            if let Some(s) = lp.subspace_looped(t) {
                volume = volume.saturating_mul(bispace.subspace(s)?.dim() as u64);
            }
        }
    }
    Ok(volume)
}
