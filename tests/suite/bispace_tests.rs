//! Sparse bispace structural tests.

use blocksparse::{BispaceBuilder, Permutation, SparseBispace, SparsityTree, Subspace};
use pretty_assertions::assert_eq;

fn split(dim: usize, points: &[usize]) -> Subspace {
    Subspace::with_split(dim, points).unwrap()
}

#[test]
fn test_canonical_offset_round_trip() {
    // Independently computed row-major block starts for a 3-D space.
    let subspaces = [split(6, &[2]), split(5, &[1, 3]), split(4, &[2])];
    let space = SparseBispace::dense(subspaces.to_vec());

    for b0 in 0..subspaces[0].n_blocks() {
        for b1 in 0..subspaces[1].n_blocks() {
            for b2 in 0..subspaces[2].n_blocks() {
                let expected = subspaces[0].block_abs_index(b0).unwrap() * 5 * 4
                    + subspaces[1].block_abs_index(b1).unwrap() * 4
                    + subspaces[2].block_abs_index(b2).unwrap();
                assert_eq!(
                    space.block_offset_canonical(&[b0, b1, b2]).unwrap(),
                    expected
                );
            }
        }
    }
}

#[test]
fn test_block_major_offsets_cover_space_exactly() {
    // Dense block-major offsets tile the space: sorted offsets advance by
    // each block's element count and end at nnz.
    let subspaces = [split(6, &[2]), split(5, &[1, 3])];
    let space = SparseBispace::dense(subspaces.to_vec());

    let mut blocks = Vec::new();
    for b0 in 0..subspaces[0].n_blocks() {
        for b1 in 0..subspaces[1].n_blocks() {
            let len = subspaces[0].block_size(b0).unwrap() * subspaces[1].block_size(b1).unwrap();
            blocks.push((space.block_offset(&[b0, b1]).unwrap(), len));
        }
    }
    blocks.sort_unstable();
    let mut cursor = 0;
    for (offset, len) in blocks {
        assert_eq!(offset, cursor);
        cursor += len;
    }
    assert_eq!(cursor, space.nnz());
}

#[test]
fn test_composition_concatenates() {
    let row = SparseBispace::from_subspace(split(6, &[2]));
    let col = SparseBispace::from_subspace(split(4, &[2]));
    let space = row | col;
    assert_eq!(space.order(), 2);
    assert_eq!(space.nnz(), 24);
    assert_eq!(space[0], split(6, &[2]));
    assert_eq!(space[1], split(4, &[2]));
}

#[test]
fn test_permutation_rejection_and_group_equality() {
    let a = split(4, &[2]);
    let b = split(6, &[3]);
    let c = split(8, &[4]);
    let space = BispaceBuilder::new()
        .subspaces(vec![a.clone(), b.clone(), c.clone()])
        .couple(1, 2, vec![vec![0, 1], vec![1, 0]])
        .build()
        .unwrap();

    // Separating the coupled pair fails.
    let splitting = Permutation::new(vec![1, 0, 2]).unwrap();
    assert!(space.permute(&splitting).is_err());

    // Reordering within the group footprint succeeds and matches the
    // manually permuted tree.
    let within = Permutation::new(vec![0, 2, 1]).unwrap();
    let permuted = space.permute(&within).unwrap();
    let manual_tree = SparsityTree::new(
        vec![
            blocksparse::BlockKey::from_slice(&[1, 0]),
            blocksparse::BlockKey::from_slice(&[0, 1]),
        ],
        &[c.clone(), b.clone()],
    )
    .unwrap();
    assert_eq!(permuted.sparse_group_tree(0).unwrap(), &manual_tree);
    assert_eq!(permuted[1], c);
    assert_eq!(permuted[2], b);
}

#[test]
fn test_fuse_contract_reproduces_dense_composition_count() {
    // A ends in X, B starts with X, no sparsity across the seam. Fusing and
    // contracting the seam index matches composing A-without-X with
    // B-without-X.
    let x = split(4, &[2]);
    let a = BispaceBuilder::new()
        .subspaces(vec![split(6, &[2]), split(5, &[1]), x.clone()])
        .build()
        .unwrap();
    let b = BispaceBuilder::new()
        .subspaces(vec![x.clone(), split(7, &[3])])
        .build()
        .unwrap();

    let fused = a.fuse(&b).unwrap();
    assert_eq!(fused.order(), 4);
    let contracted = fused.contract(2).unwrap();

    let composed = SparseBispace::dense(vec![split(6, &[2]), split(5, &[1])])
        | SparseBispace::from_subspace(split(7, &[3]));
    assert_eq!(contracted.nnz(), composed.nnz());
    assert_eq!(contracted, composed);
}

#[test]
fn test_sparse_offsets_pack_significant_tuples() {
    let space = BispaceBuilder::new()
        .subspaces(vec![split(4, &[2]), split(6, &[3]), split(5, &[2])])
        .couple(0, 2, vec![vec![0, 0], vec![0, 1], vec![1, 1]])
        .build()
        .unwrap();

    // Tuple sizes: (0,0) -> 6, (0,1) -> 6, (1,1) -> 6; dense tail dim 5.
    assert_eq!(space.nnz(), 18 * 5);
    assert_eq!(space.block_offset(&[0, 0, 0]).unwrap(), 0);
    assert_eq!(space.block_offset(&[0, 1, 0]).unwrap(), 30);
    assert_eq!(space.block_offset(&[1, 1, 0]).unwrap(), 60);
    // Within one tuple, the dense tail advances by the coupled block area.
    assert_eq!(space.block_offset(&[0, 1, 1]).unwrap(), 30 + 6 * 2);
    assert!(space.block_offset(&[1, 0, 0]).is_err());
}

#[test]
fn test_truncation_scales_nnz() {
    let space = SparseBispace::dense(vec![split(10, &[3, 7]), split(4, &[2])]);
    assert_eq!(space.nnz(), 40);
    let truncated = space.truncate_subspace(0, (0, 0)).unwrap();
    assert_eq!(truncated.nnz(), 12);
    let truncated = space.truncate_subspace(0, (1, 2)).unwrap();
    assert_eq!(truncated.nnz(), 28);
}
