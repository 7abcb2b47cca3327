//! End-to-end contraction tests through the factory and batch provider.

use blocksparse::{
    BatchMap, BatchProvider, BispaceBuilder, LabelExpr, LabeledView, SparseBispace, Subspace,
    contract,
};

fn split(dim: usize, points: &[usize]) -> Subspace {
    Subspace::with_split(dim, points).unwrap()
}

fn labels(s: &str) -> LabelExpr {
    s.parse().unwrap()
}

/// Expands a block-major buffer of a 2-D bispace into a dense row-major
/// matrix. Structurally zero blocks stay zero.
fn to_dense_2d(buf: &[f64], space: &SparseBispace) -> Vec<Vec<f64>> {
    let rows = space[0].dim();
    let cols = space[1].dim();
    let mut dense = vec![vec![0.0; cols]; rows];
    for bi in 0..space[0].n_blocks() {
        for bj in 0..space[1].n_blocks() {
            let Ok(offset) = space.block_offset(&[bi, bj]) else {
                continue;
            };
            let size_i = space[0].block_size(bi).unwrap();
            let size_j = space[1].block_size(bj).unwrap();
            let abs_i = space[0].block_abs_index(bi).unwrap();
            let abs_j = space[1].block_abs_index(bj).unwrap();
            for r in 0..size_i {
                for c in 0..size_j {
                    dense[abs_i + r][abs_j + c] = buf[offset + r * size_j + c];
                }
            }
        }
    }
    dense
}

/// Fills a block-major buffer of a 2-D bispace from a dense matrix, skipping
/// structurally zero blocks.
fn from_dense_2d(dense: &[Vec<f64>], space: &SparseBispace) -> Vec<f64> {
    let mut buf = vec![0.0; space.nnz()];
    for bi in 0..space[0].n_blocks() {
        for bj in 0..space[1].n_blocks() {
            let Ok(offset) = space.block_offset(&[bi, bj]) else {
                continue;
            };
            let size_i = space[0].block_size(bi).unwrap();
            let size_j = space[1].block_size(bj).unwrap();
            let abs_i = space[0].block_abs_index(bi).unwrap();
            let abs_j = space[1].block_abs_index(bj).unwrap();
            for r in 0..size_i {
                for c in 0..size_j {
                    buf[offset + r * size_j + c] = dense[abs_i + r][abs_j + c];
                }
            }
        }
    }
    buf
}

fn naive_matmul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let (m, k, n) = (a.len(), b.len(), b[0].len());
    let mut c = vec![vec![0.0; n]; m];
    for i in 0..m {
        for kk in 0..k {
            for j in 0..n {
                c[i][j] += a[i][kk] * b[kk][j];
            }
        }
    }
    c
}

#[test]
fn test_dense_matmul_output_size() {
    // Contracting A(i,k) with B(k,j) over k: the output space has order 2
    // and nnz == dim(i) * dim(j).
    let a_space = SparseBispace::dense(vec![split(6, &[2]), split(4, &[2])]);
    let b_space = SparseBispace::dense(vec![split(4, &[2]), split(5, &[1])]);
    let c_space = SparseBispace::dense(vec![split(6, &[2]), split(5, &[1])]);

    let a_data = vec![0.0; a_space.nnz()];
    let b_data = vec![0.0; b_space.nnz()];
    let a = LabeledView::new(a_space, labels("ik"), &a_data);
    let b = LabeledView::new(b_space, labels("kj"), &b_data);
    let c = LabeledView::direct(c_space.clone(), labels("ij"));

    let provider = contract(labels("k"), &a, &b).build(&c).unwrap();
    assert_eq!(c_space.order(), 2);
    assert_eq!(c_space.nnz(), 30);
    assert_eq!(provider.batch_len(&BatchMap::new()).unwrap(), 30);
}

#[test]
fn test_dense_matmul_values() {
    let a_space = SparseBispace::dense(vec![split(4, &[2]), split(3, &[1])]);
    let b_space = SparseBispace::dense(vec![split(3, &[1]), split(5, &[2])]);
    let c_space = SparseBispace::dense(vec![split(4, &[2]), split(5, &[2])]);

    let a_dense: Vec<Vec<f64>> = (0..4)
        .map(|i| (0..3).map(|k| (3 * i + k + 1) as f64).collect())
        .collect();
    let b_dense: Vec<Vec<f64>> = (0..3)
        .map(|k| (0..5).map(|j| (5 * k + j + 1) as f64).collect())
        .collect();

    let a_data = from_dense_2d(&a_dense, &a_space);
    let b_data = from_dense_2d(&b_dense, &b_space);
    let a = LabeledView::new(a_space, labels("ik"), &a_data);
    let b = LabeledView::new(b_space, labels("kj"), &b_data);
    let c = LabeledView::direct(c_space.clone(), labels("ij"));

    let mut provider = contract(labels("k"), &a, &b).build(&c).unwrap();
    let mut batch = vec![0.0; c_space.nnz()];
    provider.get_batch(&mut batch, &BatchMap::new()).unwrap();

    assert_eq!(to_dense_2d(&batch, &c_space), naive_matmul(&a_dense, &b_dense));
}

#[test]
fn test_block_sparse_matmul_matches_dense_reference() {
    // A is block-diagonal via a sparsity tree over (i,k); the contraction
    // must match the dense reference computed from the expanded matrix.
    let a_space = BispaceBuilder::new()
        .subspaces(vec![split(6, &[3]), split(6, &[3])])
        .couple(0, 2, vec![vec![0, 0], vec![1, 1]])
        .build()
        .unwrap();
    let b_space = SparseBispace::dense(vec![split(6, &[3]), split(4, &[2])]);
    let c_space = SparseBispace::dense(vec![split(6, &[3]), split(4, &[2])]);

    let mut a_dense = vec![vec![0.0; 6]; 6];
    for i in 0..6 {
        for k in 0..6 {
            // Diagonal blocks only; off-diagonal blocks are structural zeros.
            if (i < 3) == (k < 3) {
                a_dense[i][k] = (i * 6 + k + 1) as f64;
            }
        }
    }
    let b_dense: Vec<Vec<f64>> = (0..6)
        .map(|k| (0..4).map(|j| (4 * k + j + 1) as f64).collect())
        .collect();

    let a_data = from_dense_2d(&a_dense, &a_space);
    assert_eq!(a_data.len(), 18); // two 3x3 blocks, packed
    let b_data = from_dense_2d(&b_dense, &b_space);

    let a = LabeledView::new(a_space, labels("ik"), &a_data);
    let b = LabeledView::new(b_space, labels("kj"), &b_data);
    let c = LabeledView::direct(c_space.clone(), labels("ij"));

    let mut provider = contract(labels("k"), &a, &b).build(&c).unwrap();
    let mut batch = vec![0.0; c_space.nnz()];
    provider.get_batch(&mut batch, &BatchMap::new()).unwrap();

    assert_eq!(to_dense_2d(&batch, &c_space), naive_matmul(&a_dense, &b_dense));
}

#[test]
fn test_batch_truncation_scales_and_zero_fills_exactly() {
    let a_space = SparseBispace::dense(vec![split(10, &[3, 7]), split(4, &[2])]);
    let b_space = SparseBispace::dense(vec![split(4, &[2]), split(5, &[2])]);
    let c_space = SparseBispace::dense(vec![split(10, &[3, 7]), split(5, &[2])]);

    let a_dense: Vec<Vec<f64>> = (0..10)
        .map(|i| (0..4).map(|k| (4 * i + k + 1) as f64).collect())
        .collect();
    let b_dense: Vec<Vec<f64>> = (0..4)
        .map(|k| (0..5).map(|j| (5 * k + j + 1) as f64).collect())
        .collect();
    let a_data = from_dense_2d(&a_dense, &a_space);
    let b_data = from_dense_2d(&b_dense, &b_space);

    let a = LabeledView::new(a_space, labels("ik"), &a_data);
    let b = LabeledView::new(b_space, labels("kj"), &b_data);
    let c = LabeledView::direct(c_space.clone(), labels("ij"));
    let mut provider = contract(labels("k"), &a, &b).build(&c).unwrap();

    // Restrict the output's first subspace to its middle block (4 rows).
    let mut batches = BatchMap::new();
    batches.insert((0, 0), (1, 1));
    let batch_len = provider.batch_len(&batches).unwrap();
    assert_eq!(batch_len, 4 * 5);
    assert_eq!(provider.batch_len(&BatchMap::new()).unwrap(), 50);

    // The zero-fill covers exactly the truncated extent: sentinels beyond it
    // survive.
    let mut batch = vec![-7.5; 50];
    provider.get_batch(&mut batch, &batches).unwrap();
    assert!(batch[batch_len..].iter().all(|&v| v == -7.5));

    // The batch holds rows 3..7 of the full result.
    let reference = naive_matmul(&a_dense, &b_dense);
    let truncated_space = c_space.truncate_subspace(0, (1, 1)).unwrap();
    let dense_batch = to_dense_2d(&batch[..batch_len], &truncated_space);
    for r in 0..4 {
        assert_eq!(dense_batch[r], reference[3 + r]);
    }
}

#[test]
fn test_batches_assemble_full_result() {
    let a_space = SparseBispace::dense(vec![split(10, &[3, 7]), split(4, &[2])]);
    let b_space = SparseBispace::dense(vec![split(4, &[2]), split(5, &[2])]);
    let c_space = SparseBispace::dense(vec![split(10, &[3, 7]), split(5, &[2])]);

    let a_dense: Vec<Vec<f64>> = (0..10)
        .map(|i| (0..4).map(|k| ((7 * i + k) % 5) as f64).collect())
        .collect();
    let b_dense: Vec<Vec<f64>> = (0..4)
        .map(|k| (0..5).map(|j| ((3 * k + 2 * j) % 7) as f64).collect())
        .collect();
    let a_data = from_dense_2d(&a_dense, &a_space);
    let b_data = from_dense_2d(&b_dense, &b_space);

    let a = LabeledView::new(a_space, labels("ik"), &a_data);
    let b = LabeledView::new(b_space, labels("kj"), &b_data);
    let c = LabeledView::direct(c_space.clone(), labels("ij"));
    let mut provider = contract(labels("k"), &a, &b).build(&c).unwrap();

    let reference = naive_matmul(&a_dense, &b_dense);
    let mut assembled = vec![vec![0.0; 5]; 10];
    for block_row in 0..3 {
        let mut batches = BatchMap::new();
        batches.insert((0, 0), (block_row, block_row));
        let batch_len = provider.batch_len(&batches).unwrap();
        let mut batch = vec![0.0; batch_len];
        provider.get_batch(&mut batch, &batches).unwrap();

        let truncated = c_space.truncate_subspace(0, (block_row, block_row)).unwrap();
        let rows = to_dense_2d(&batch, &truncated);
        let abs_row = c_space[0].block_abs_index(block_row).unwrap();
        for (r, row) in rows.iter().enumerate() {
            assembled[abs_row + r] = row.clone();
        }
    }
    assert_eq!(assembled, reference);
}

#[test]
fn test_batch_buffer_too_small_is_rejected() {
    let a_space = SparseBispace::dense(vec![split(4, &[2]), split(4, &[2])]);
    let b_space = SparseBispace::dense(vec![split(4, &[2]), split(4, &[2])]);
    let c_space = SparseBispace::dense(vec![split(4, &[2]), split(4, &[2])]);

    let a_data = vec![0.0; 16];
    let b_data = vec![0.0; 16];
    let a = LabeledView::new(a_space, labels("ik"), &a_data);
    let b = LabeledView::new(b_space, labels("kj"), &b_data);
    let c = LabeledView::direct(c_space, labels("ij"));

    let mut provider = contract(labels("k"), &a, &b).build(&c).unwrap();
    let mut batch = vec![0.0; 8];
    assert!(provider.get_batch(&mut batch, &BatchMap::new()).is_err());
}

#[test]
fn test_two_index_contraction() {
    // C(i,j) = sum_{k,l} A(i,k,l) * B(k,l,j), all dims 2, single blocks.
    let a_space = SparseBispace::dense(vec![
        Subspace::new(2),
        Subspace::new(2),
        Subspace::new(2),
    ]);
    let b_space = SparseBispace::dense(vec![
        Subspace::new(2),
        Subspace::new(2),
        Subspace::new(2),
    ]);
    let c_space = SparseBispace::dense(vec![Subspace::new(2), Subspace::new(2)]);

    let a_data: Vec<f64> = (1..=8).map(|v| v as f64).collect();
    let b_data: Vec<f64> = (1..=8).map(|v| v as f64).collect();
    let a = LabeledView::new(a_space, labels("ikl"), &a_data);
    let b = LabeledView::new(b_space, labels("klj"), &b_data);
    let c = LabeledView::direct(c_space.clone(), labels("ij"));

    let mut provider = contract(labels("kl"), &a, &b).build(&c).unwrap();
    let mut batch = vec![0.0; 4];
    provider.get_batch(&mut batch, &BatchMap::new()).unwrap();

    // Reference: C[i][j] = sum over k,l of A[i][k][l] * B[k][l][j].
    let mut reference = [0.0; 4];
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                for l in 0..2 {
                    reference[i * 2 + j] +=
                        a_data[i * 4 + k * 2 + l] * b_data[k * 4 + l * 2 + j];
                }
            }
        }
    }
    assert_eq!(batch.as_slice(), reference.as_slice());
}
