//! One-dimensional block-space tests.

use blocksparse::Subspace;

#[test]
fn test_dim_10_split_at_3_7() {
    let space = Subspace::with_split(10, &[3, 7]).unwrap();
    assert_eq!(space.n_blocks(), 3);
    assert_eq!(space.block_size(0).unwrap(), 3);
    assert_eq!(space.block_size(1).unwrap(), 4);
    assert_eq!(space.block_size(2).unwrap(), 3);
    assert_eq!(space.block_abs_index(1).unwrap(), 3);
}

#[test]
fn test_split_invariant_across_boundary_lists() {
    let cases: &[(usize, &[usize])] = &[
        (10, &[1]),
        (10, &[9]),
        (10, &[1, 2, 3, 4, 5, 6, 7, 8, 9]),
        (64, &[16, 32, 48]),
        (7, &[2, 3, 6]),
    ];
    for &(dim, points) in cases {
        let space = Subspace::with_split(dim, points).unwrap();
        assert_eq!(space.n_blocks(), points.len() + 1);
        let total: usize = (0..space.n_blocks())
            .map(|i| space.block_size(i).unwrap())
            .sum();
        assert_eq!(total, dim);
        for (block, &point) in points.iter().enumerate() {
            assert_eq!(space.block_abs_index(block + 1).unwrap(), point);
        }
    }
}

#[test]
fn test_split_rejections() {
    assert!(Subspace::with_split(10, &[]).is_err());
    assert!(Subspace::with_split(10, &[0]).is_err());
    assert!(Subspace::with_split(10, &[10]).is_err());
    assert!(Subspace::with_split(10, &[5, 5]).is_err());
    assert!(Subspace::with_split(3, &[1, 2, 3]).is_err());
}
