//! Sparsity trees: the significant-tuple sets coupling index groups.

use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::{Permutation, Subspace};
use crate::error::{BlockSparseError, BlockSparseResult};

/// A block-index tuple addressing one entry of a coupled group.
pub type BlockKey = SmallVec<[usize; 8]>;

/// The set of significant (structurally nonzero) block-index tuples for a
/// group of two or more coupled subspaces.
///
/// Tuples are kept in lexicographic order. Each tuple carries its element
/// size (the product of its member block sizes) and its element offset within
/// the packed group storage; `nnz` totals the sizes. All derived state is
/// computed once at construction; the algebraic operations return fresh
/// trees.
#[derive(Debug, Clone)]
pub struct SparsityTree {
    order: usize,
    keys: Vec<BlockKey>,
    sizes: Vec<usize>,
    offsets: Vec<usize>,
    nnz: usize,
    positions: HashMap<BlockKey, usize>,
}

impl SparsityTree {
    /// Builds a tree over the given subspaces from its significant tuples.
    ///
    /// Duplicate tuples collapse. Each tuple must have one entry per
    /// subspace, and every entry must name an existing block.
    pub fn new(
        tuples: impl IntoIterator<Item = BlockKey>,
        subspaces: &[Subspace],
    ) -> BlockSparseResult<Self> {
        let order = subspaces.len();
        if order < 2 {
            return Err(BlockSparseError::bad_parameter(
                "a sparsity tree couples at least two subspaces",
            ));
        }

        let mut keys: Vec<BlockKey> = Vec::new();
        for key in tuples {
            if key.len() != order {
                return Err(BlockSparseError::bad_parameter(
                    "tuple length must match the number of coupled subspaces",
                ));
            }
            for (entry, subspace) in key.iter().zip(subspaces) {
                if *entry >= subspace.n_blocks() {
                    return Err(BlockSparseError::out_of_bounds(
                        "tuple entry exceeds the subspace block count",
                    ));
                }
            }
            keys.push(key);
        }
        keys.sort_unstable();
        keys.dedup();

        let mut tree = Self {
            order,
            keys,
            sizes: Vec::new(),
            offsets: Vec::new(),
            nnz: 0,
            positions: HashMap::new(),
        };
        tree.set_offsets_sizes_nnz(subspaces)?;
        Ok(tree)
    }

    /// Recomputes per-tuple sizes, packed offsets, total nnz, and the lookup
    /// table against the given subspaces.
    fn set_offsets_sizes_nnz(&mut self, subspaces: &[Subspace]) -> BlockSparseResult<()> {
        self.sizes.clear();
        self.offsets.clear();
        self.positions.clear();
        let mut offset = 0;
        for (position, key) in self.keys.iter().enumerate() {
            let mut size = 1;
            for (entry, subspace) in key.iter().zip(subspaces) {
                size *= subspace.block_size(*entry)?;
            }
            self.sizes.push(size);
            self.offsets.push(offset);
            offset += size;
            self.positions.insert(key.clone(), position);
        }
        self.nnz = offset;
        Ok(())
    }

    /// Returns the number of coupled subspaces.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Returns the number of significant tuples.
    #[inline]
    pub fn n_entries(&self) -> usize {
        self.keys.len()
    }

    /// Returns the total number of nonzero elements covered by the
    /// significant tuples.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Looks up a tuple, returning its rank among significant tuples and its
    /// element offset within the packed group.
    ///
    /// `None` means the block combination is structurally zero and must be
    /// skipped by callers.
    pub fn search(&self, key: &[usize]) -> Option<(usize, usize)> {
        if key.len() != self.order {
            return None;
        }
        let key: BlockKey = SmallVec::from_slice(key);
        self.positions
            .get(&key)
            .map(|&position| (position, self.offsets[position]))
    }

    /// Returns an iterator over the significant tuples in lexicographic
    /// order.
    pub fn keys(&self) -> impl Iterator<Item = &BlockKey> {
        self.keys.iter()
    }

    /// Eliminates the coupled index at `position`, folding tuples together.
    ///
    /// `remaining` names the surviving subspaces in order. An order-2 tree
    /// cannot contract: removing one partner leaves nothing coupled, and the
    /// owning bispace drops the tree instead.
    pub fn contract(
        &self,
        position: usize,
        remaining: &[Subspace],
    ) -> BlockSparseResult<SparsityTree> {
        if position >= self.order {
            return Err(BlockSparseError::bad_parameter(
                "contraction position exceeds the tree order",
            ));
        }
        if self.order == 2 {
            return Err(BlockSparseError::bad_parameter(
                "contracting an order-2 tree leaves no coupling",
            ));
        }
        if remaining.len() != self.order - 1 {
            return Err(BlockSparseError::bad_parameter(
                "contraction requires one subspace per surviving index",
            ));
        }
        let tuples: Vec<BlockKey> = self
            .keys
            .iter()
            .map(|key| {
                key.iter()
                    .enumerate()
                    .filter(|&(i, _)| i != position)
                    .map(|(_, &entry)| entry)
                    .collect()
            })
            .collect();
        Self::new(tuples, remaining)
    }

    /// Merges this tree with another sharing a boundary subspace.
    ///
    /// This tree's last coupled index and `other`'s first coupled index refer
    /// to the same subspace; only tuple pairs agreeing on that shared block
    /// survive, joined as `a ++ b[1..]`. `fused` names the subspaces of the
    /// merged group.
    pub fn fuse(&self, other: &SparsityTree, fused: &[Subspace]) -> BlockSparseResult<SparsityTree> {
        if fused.len() != self.order + other.order - 1 {
            return Err(BlockSparseError::bad_parameter(
                "fusion requires one subspace per merged index",
            ));
        }
        let mut by_first: HashMap<usize, Vec<&BlockKey>> = HashMap::new();
        for key in &other.keys {
            by_first.entry(key[0]).or_default().push(key);
        }
        let mut tuples: Vec<BlockKey> = Vec::new();
        for key in &self.keys {
            let boundary = key[self.order - 1];
            if let Some(matches) = by_first.get(&boundary) {
                for other_key in matches {
                    let mut fused_key: BlockKey = key.clone();
                    fused_key.extend(other_key.iter().skip(1).copied());
                    tuples.push(fused_key);
                }
            }
        }
        Self::new(tuples, fused)
    }

    /// Reorders the coupled indices: result tuple entry `i` takes source
    /// entry `perm[i]`. `permuted` names the subspaces in their new order.
    pub fn permute(
        &self,
        perm: &Permutation,
        permuted: &[Subspace],
    ) -> BlockSparseResult<SparsityTree> {
        if perm.len() != self.order || permuted.len() != self.order {
            return Err(BlockSparseError::bad_parameter(
                "permutation length must match the tree order",
            ));
        }
        let tuples: Vec<BlockKey> = self
            .keys
            .iter()
            .map(|key| perm.as_slice().iter().map(|&src| key[src]).collect())
            .collect();
        Self::new(tuples, permuted)
    }
}

impl PartialEq for SparsityTree {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.keys == other.keys
    }
}

impl Eq for SparsityTree {}
