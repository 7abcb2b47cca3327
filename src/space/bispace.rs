//! N-dimensional sparse block-index spaces.

use alloc::vec::Vec;
use core::ops::BitOr;

use smallvec::SmallVec;

use super::{BlockKey, Permutation, SparsityTree, Subspace};
use crate::error::{BlockSparseError, BlockSparseResult};

/// A sparse group: a contiguous run of subspaces governed by one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseGroup {
    offset: usize,
    tree: SparsityTree,
}

impl SparseGroup {
    /// Returns the subspace index at which this group starts.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the subspace index one past this group's last member.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.tree.order()
    }

    /// Returns the tree describing this group's nonzero pattern.
    #[inline]
    pub fn tree(&self) -> &SparsityTree {
        &self.tree
    }
}

/// An N-dimensional sparse block-index space.
///
/// An ordered composition of one-dimensional block spaces, some contiguous
/// runs of which are coupled by sparsity trees. The space knows its total
/// nonzero element count and can translate block-index tuples into
/// block-major (sparsity-aware) or canonical row-major offsets.
///
/// Every constructor path computes the derived per-slot dimensions and inner
/// sizes in one pass; instances are immutable afterwards and all structural
/// operations (`contract`, `fuse`, `permute`, concatenation) return fresh,
/// independently owned spaces.
#[derive(Debug, Clone)]
pub struct SparseBispace {
    subspaces: Vec<Subspace>,
    groups: Vec<SparseGroup>,
    /// Dimension per logical slot: the dense dim for uncoupled subspaces, the
    /// tree nnz for a sparse group (charged once at the group's first slot).
    dimensions: Vec<usize>,
    /// Product of the dimensions of all later slots, per slot.
    inner_sizes: Vec<usize>,
}

impl SparseBispace {
    /// Creates an order-1 dense space of `dim` elements (a single block).
    pub fn from_dim(dim: usize) -> Self {
        Self::from_subspace(Subspace::new(dim))
    }

    /// Creates an order-1 space from an existing subspace.
    pub fn from_subspace(subspace: Subspace) -> Self {
        Self::assemble(alloc::vec![subspace], Vec::new())
    }

    /// Creates a fully dense space from a list of subspaces.
    pub fn dense(subspaces: Vec<Subspace>) -> Self {
        Self::assemble(subspaces, Vec::new())
    }

    /// Computes the derived slot dimensions and inner sizes.
    ///
    /// Callers guarantee groups are sorted, disjoint, contiguous, and within
    /// range.
    fn assemble(subspaces: Vec<Subspace>, groups: Vec<SparseGroup>) -> Self {
        let mut dimensions = Vec::new();
        let mut subspace_idx = 0;
        let mut group_iter = groups.iter().peekable();
        while subspace_idx < subspaces.len() {
            match group_iter.peek() {
                Some(group) if group.offset == subspace_idx => {
                    dimensions.push(group.tree.nnz());
                    subspace_idx += group.tree.order();
                    group_iter.next();
                }
                _ => {
                    dimensions.push(subspaces[subspace_idx].dim());
                    subspace_idx += 1;
                }
            }
        }

        let mut inner_sizes = alloc::vec![1; dimensions.len()];
        for slot in (0..dimensions.len().saturating_sub(1)).rev() {
            inner_sizes[slot] = inner_sizes[slot + 1] * dimensions[slot + 1];
        }

        Self {
            subspaces,
            groups,
            dimensions,
            inner_sizes,
        }
    }

    /// Returns the number of subspaces.
    #[inline]
    pub fn order(&self) -> usize {
        self.subspaces.len()
    }

    /// Returns the number of nonzero elements in this space.
    pub fn nnz(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Returns the subspace at the given index.
    pub fn subspace(&self, idx: usize) -> BlockSparseResult<&Subspace> {
        self.subspaces.get(idx).ok_or_else(|| {
            BlockSparseError::out_of_bounds("subspace index exceeds the space order")
        })
    }

    /// Returns all subspaces in order.
    pub fn subspaces(&self) -> &[Subspace] {
        &self.subspaces
    }

    /// Returns the number of sparse index groups (0 for fully dense).
    #[inline]
    pub fn n_sparse_groups(&self) -> usize {
        self.groups.len()
    }

    /// Returns the sparse groups in order.
    pub fn sparse_groups(&self) -> &[SparseGroup] {
        &self.groups
    }

    /// Returns the tree governing sparse group `group_idx`.
    pub fn sparse_group_tree(&self, group_idx: usize) -> BlockSparseResult<&SparsityTree> {
        self.groups
            .get(group_idx)
            .map(SparseGroup::tree)
            .ok_or_else(|| BlockSparseError::bad_parameter("sparse group index too large"))
    }

    /// Returns the subspace index at which sparse group `group_idx` starts.
    pub fn sparse_group_offset(&self, group_idx: usize) -> BlockSparseResult<usize> {
        self.groups
            .get(group_idx)
            .map(SparseGroup::offset)
            .ok_or_else(|| BlockSparseError::bad_parameter("sparse group index too large"))
    }

    /// Removes the subspace at `contract_idx`, folding any sparsity that
    /// involved it.
    ///
    /// Groups after the removed index shift left. A group of order 2
    /// containing the index loses its coupling entirely; a larger group
    /// contracts its tree at the tree-relative position.
    pub fn contract(&self, contract_idx: usize) -> BlockSparseResult<SparseBispace> {
        if self.order() == 1 {
            return Err(BlockSparseError::bad_parameter(
                "cannot contract an order-1 space",
            ));
        }
        if contract_idx >= self.order() {
            return Err(BlockSparseError::bad_parameter(
                "contraction index too large",
            ));
        }

        let subspaces: Vec<Subspace> = self
            .subspaces
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != contract_idx)
            .map(|(_, s)| s.clone())
            .collect();

        let mut groups = Vec::new();
        for group in &self.groups {
            let offset = group.offset;
            let order = group.tree.order();
            let new_offset = if offset > contract_idx {
                offset - 1
            } else {
                offset
            };

            if offset <= contract_idx && contract_idx < offset + order {
                // Order-2 coupling degenerates: one partner survives, dense.
                if order == 2 {
                    continue;
                }
                let rel_idx = contract_idx - offset;
                let remaining = &subspaces[new_offset..new_offset + order - 1];
                let tree = group.tree.contract(rel_idx, remaining)?;
                groups.push(SparseGroup {
                    offset: new_offset,
                    tree,
                });
            } else {
                groups.push(SparseGroup {
                    offset: new_offset,
                    tree: group.tree.clone(),
                });
            }
        }

        Ok(Self::assemble(subspaces, groups))
    }

    /// Joins this space with `other` at a shared boundary subspace.
    ///
    /// The last subspace of `self` must equal the first subspace of `other`;
    /// the result has order `self.order() + other.order() - 1`. When sparse
    /// groups abut exactly at the seam on both sides, their trees merge;
    /// otherwise sparsity carries over unmodified.
    pub fn fuse(&self, other: &SparseBispace) -> BlockSparseResult<SparseBispace> {
        let n = self.order();
        if self.subspaces[n - 1] != other.subspaces[0] {
            return Err(BlockSparseError::bad_parameter("fuse point does not match"));
        }

        let mut subspaces = self.subspaces.clone();
        subspaces.extend(other.subspaces.iter().skip(1).cloned());

        let fuse_sparsity = match (self.groups.last(), other.groups.first()) {
            (Some(last), Some(first)) => last.end() == n && first.offset == 0,
            _ => false,
        };

        let mut groups = self.groups.clone();
        for group in &other.groups {
            groups.push(SparseGroup {
                offset: group.offset + n - 1,
                tree: group.tree.clone(),
            });
        }

        if fuse_sparsity {
            let last_idx = self.groups.len() - 1;
            let seam_idx = last_idx + 1;
            let start = groups[last_idx].offset;
            let fused_order =
                groups[last_idx].tree.order() + groups[seam_idx].tree.order() - 1;
            let tree = groups[last_idx]
                .tree
                .fuse(&groups[seam_idx].tree, &subspaces[start..start + fused_order])?;
            groups[last_idx] = SparseGroup {
                offset: start,
                tree,
            };
            groups.remove(seam_idx);
        }

        Ok(Self::assemble(subspaces, groups))
    }

    /// Returns a permuted copy: result subspace `i` is source subspace
    /// `perm[i]`.
    ///
    /// Fails if the permutation would move a sparsity-coupled subspace
    /// outside its group's footprint; group members may only reorder among
    /// themselves.
    pub fn permute(&self, perm: &Permutation) -> BlockSparseResult<SparseBispace> {
        if perm.len() != self.order() {
            return Err(BlockSparseError::bad_parameter(
                "permutation length must match the space order",
            ));
        }

        let subspaces: Vec<Subspace> = perm
            .as_slice()
            .iter()
            .map(|&src| self.subspaces[src].clone())
            .collect();

        let mut groups = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let offset = group.offset;
            let order = group.tree.order();
            let mut rel_entries = Vec::with_capacity(order);
            for order_idx in 0..order {
                let src = perm[offset + order_idx];
                if src < offset || src >= offset + order {
                    return Err(BlockSparseError::bad_parameter(
                        "permutation breaks up a sparsity-coupled group",
                    ));
                }
                rel_entries.push(src - offset);
            }
            let rel_perm = Permutation::new(rel_entries)?;
            let tree = if rel_perm.is_identity() {
                group.tree.clone()
            } else {
                group
                    .tree
                    .permute(&rel_perm, &subspaces[offset..offset + order])?
            };
            groups.push(SparseGroup { offset, tree });
        }

        Ok(Self::assemble(subspaces, groups))
    }

    /// Returns the block-major offset of the block-tuple `block_indices`,
    /// honoring sparsity.
    ///
    /// For a sparse group the tuple must be significant; requesting an absent
    /// tuple is an error rather than a silently wrong offset.
    pub fn block_offset(&self, block_indices: &[usize]) -> BlockSparseResult<usize> {
        if block_indices.len() != self.order() {
            return Err(BlockSparseError::out_of_bounds(
                "block index list length must match the space order",
            ));
        }

        let mut offset = 0;
        let mut outer_size = 1;
        let mut subspace_idx = 0;
        let mut slot = 0;
        let mut group_iter = self.groups.iter().peekable();
        while subspace_idx < self.order() {
            let abs_index;
            let outer_scale;
            match group_iter.peek() {
                Some(group) if group.offset == subspace_idx => {
                    let order = group.tree.order();
                    let key = &block_indices[subspace_idx..subspace_idx + order];
                    let mut scale = 1;
                    for (entry, subspace) in
                        key.iter().zip(&self.subspaces[subspace_idx..])
                    {
                        scale *= subspace.block_size(*entry)?;
                    }
                    let (_, tuple_offset) = group.tree.search(key).ok_or_else(|| {
                        BlockSparseError::bad_parameter(
                            "block tuple is structurally zero in its sparse group",
                        )
                    })?;
                    abs_index = tuple_offset;
                    outer_scale = scale;
                    subspace_idx += order;
                    group_iter.next();
                }
                _ => {
                    let block_idx = block_indices[subspace_idx];
                    let subspace = &self.subspaces[subspace_idx];
                    abs_index = subspace.block_abs_index(block_idx)?;
                    outer_scale = subspace.block_size(block_idx)?;
                    subspace_idx += 1;
                }
            }
            offset += outer_size * abs_index * self.inner_sizes[slot];
            outer_size *= outer_scale;
            slot += 1;
        }
        Ok(offset)
    }

    /// Returns the row-major offset of the first element of the block-tuple
    /// `block_indices`, ignoring sparsity entirely.
    pub fn block_offset_canonical(&self, block_indices: &[usize]) -> BlockSparseResult<usize> {
        if block_indices.len() != self.order() {
            return Err(BlockSparseError::out_of_bounds(
                "block index list length must match the space order",
            ));
        }
        let mut offset = 0;
        for (i, &block_idx) in block_indices.iter().enumerate() {
            let inner_size: usize = self.subspaces[i + 1..].iter().map(Subspace::dim).product();
            offset += self.subspaces[i].block_abs_index(block_idx)? * inner_size;
        }
        Ok(offset)
    }

    /// Returns a copy where subspace `idx` is restricted to the inclusive
    /// block range `lo..=hi`.
    ///
    /// Used for batched execution. Truncating a sparsity-coupled subspace is
    /// not supported.
    pub fn truncate_subspace(
        &self,
        idx: usize,
        range: (usize, usize),
    ) -> BlockSparseResult<SparseBispace> {
        if idx >= self.order() {
            return Err(BlockSparseError::out_of_bounds(
                "subspace index exceeds the space order",
            ));
        }
        if self
            .groups
            .iter()
            .any(|group| group.offset <= idx && idx < group.end())
        {
            return Err(BlockSparseError::not_implemented(
                "cannot truncate a sparsity-coupled subspace",
            ));
        }
        let (lo, hi) = range;
        let subspace = &self.subspaces[idx];
        if lo > hi || hi >= subspace.n_blocks() {
            return Err(BlockSparseError::out_of_bounds(
                "truncation range is not a valid block range",
            ));
        }

        let mut dim = 0;
        let mut points = Vec::new();
        for block_idx in lo..=hi {
            if block_idx > lo {
                points.push(dim);
            }
            dim += subspace.block_size(block_idx)?;
        }
        let truncated = if points.is_empty() {
            Subspace::new(dim)
        } else {
            Subspace::with_split(dim, &points)?
        };

        let mut subspaces = self.subspaces.clone();
        subspaces[idx] = truncated;
        Ok(Self::assemble(subspaces, self.groups.clone()))
    }
}

impl PartialEq for SparseBispace {
    fn eq(&self, other: &Self) -> bool {
        self.subspaces == other.subspaces && self.groups == other.groups
    }
}

impl Eq for SparseBispace {}

impl core::ops::Index<usize> for SparseBispace {
    type Output = Subspace;

    fn index(&self, idx: usize) -> &Subspace {
        &self.subspaces[idx]
    }
}

/// Concatenation: the subspace lists join and the right operand's sparse
/// groups shift by the left operand's order. Sparsity never spans the seam;
/// coupling across it requires [`SparseBispace::fuse`].
impl BitOr for SparseBispace {
    type Output = SparseBispace;

    fn bitor(self, rhs: SparseBispace) -> SparseBispace {
        let shift = self.subspaces.len();
        let mut subspaces = self.subspaces;
        subspaces.extend(rhs.subspaces);
        let mut groups = self.groups;
        for group in rhs.groups {
            groups.push(SparseGroup {
                offset: group.offset + shift,
                tree: group.tree,
            });
        }
        SparseBispace::assemble(subspaces, groups)
    }
}

impl From<Subspace> for SparseBispace {
    fn from(subspace: Subspace) -> Self {
        Self::from_subspace(subspace)
    }
}

/// Builder for spaces with sparse groups.
///
/// Subspaces are pushed in order; [`couple`](BispaceBuilder::couple) attaches
/// a sparsity pattern to a contiguous run of them. All structural validation
/// and derived-state computation happens in [`build`](BispaceBuilder::build).
#[derive(Debug, Default)]
pub struct BispaceBuilder {
    subspaces: Vec<Subspace>,
    couplings: Vec<(usize, usize, Vec<BlockKey>)>,
}

impl BispaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subspace.
    pub fn subspace(mut self, subspace: Subspace) -> Self {
        self.subspaces.push(subspace);
        self
    }

    /// Appends several subspaces.
    pub fn subspaces(mut self, subspaces: impl IntoIterator<Item = Subspace>) -> Self {
        self.subspaces.extend(subspaces);
        self
    }

    /// Couples `members` adjacent subspaces starting at `start` with the
    /// given significant block tuples.
    pub fn couple(
        mut self,
        start: usize,
        members: usize,
        tuples: impl IntoIterator<Item = impl IntoIterator<Item = usize>>,
    ) -> Self {
        let tuples = tuples
            .into_iter()
            .map(|tuple| tuple.into_iter().collect::<SmallVec<_>>())
            .collect();
        self.couplings.push((start, members, tuples));
        self
    }

    /// Validates the structure and assembles the space.
    pub fn build(mut self) -> BlockSparseResult<SparseBispace> {
        self.couplings.sort_by_key(|&(start, _, _)| start);
        let order = self.subspaces.len();
        let mut groups = Vec::with_capacity(self.couplings.len());
        let mut prev_end = 0;
        for (start, members, tuples) in self.couplings {
            if members < 2 {
                return Err(BlockSparseError::bad_parameter(
                    "a sparse group couples at least two subspaces",
                ));
            }
            if start + members > order {
                return Err(BlockSparseError::bad_parameter(
                    "sparse group extends past the last subspace",
                ));
            }
            if start < prev_end {
                return Err(BlockSparseError::bad_parameter(
                    "sparse groups must be disjoint",
                ));
            }
            prev_end = start + members;
            let tree = SparsityTree::new(tuples, &self.subspaces[start..start + members])?;
            groups.push(SparseGroup {
                offset: start,
                tree,
            });
        }
        Ok(SparseBispace::assemble(self.subspaces, groups))
    }
}
