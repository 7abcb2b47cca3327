//! Loop-list execution tests against observable data movement.

use blocksparse::{
    BispaceBuilder, BlockCopyKernel, BlockLoop, SparseBispace, SparseLoopList, Subspace,
};
use hashbrown::HashMap;

fn split(dim: usize, points: &[usize]) -> Subspace {
    Subspace::with_split(dim, points).unwrap()
}

fn copy_loops() -> Vec<BlockLoop> {
    let mut row = BlockLoop::new(2);
    row.set_subspace_looped(0, 0).unwrap();
    row.set_subspace_looped(1, 0).unwrap();
    let mut col = BlockLoop::new(2);
    col.set_subspace_looped(0, 1).unwrap();
    col.set_subspace_looped(1, 1).unwrap();
    vec![row, col]
}

#[test]
fn test_copy_round_trips_dense_tensor() {
    let space = SparseBispace::dense(vec![split(6, &[2]), split(4, &[2])]);
    let list = SparseLoopList::new(copy_loops(), vec![space.clone(), space.clone()], vec![])
        .unwrap();

    let input: Vec<f64> = (0..24).map(|v| v as f64).collect();
    let mut output = vec![0.0; 24];
    let mut kernel = BlockCopyKernel;
    list.run(&mut kernel, &mut output, &[&input], &HashMap::new())
        .unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_sparse_input_blocks_never_reach_kernel() {
    // Output dense, input sparse with only the diagonal blocks present. The
    // copy kernel writes every block it sees; off-diagonal output blocks must
    // stay untouched.
    let dense = SparseBispace::dense(vec![split(4, &[2]), split(4, &[2])]);
    let sparse = BispaceBuilder::new()
        .subspaces(vec![split(4, &[2]), split(4, &[2])])
        .couple(0, 2, vec![vec![0, 0], vec![1, 1]])
        .build()
        .unwrap();

    let list =
        SparseLoopList::new(copy_loops(), vec![dense.clone(), sparse.clone()], vec![]).unwrap();

    let input = vec![1.0; sparse.nnz()];
    let mut output = vec![-3.0; dense.nnz()];
    let mut kernel = BlockCopyKernel;
    list.run(&mut kernel, &mut output, &[&input], &HashMap::new())
        .unwrap();

    // Diagonal blocks copied, off-diagonal sentinels untouched.
    let copied = output.iter().filter(|&&v| v == 1.0).count();
    let skipped = output.iter().filter(|&&v| v == -3.0).count();
    assert_eq!(copied, 8);
    assert_eq!(skipped, 8);

    // The diagonal blocks land at the dense output's block offsets.
    for &block in &[[0, 0], [1, 1]] {
        let offset = dense.block_offset(&block).unwrap();
        assert!(output[offset..offset + 4].iter().all(|&v| v == 1.0));
    }
    for &block in &[[0, 1], [1, 0]] {
        let offset = dense.block_offset(&block).unwrap();
        assert!(output[offset..offset + 4].iter().all(|&v| v == -3.0));
    }
}

#[test]
fn test_batched_copies_assemble_the_full_tensor() {
    let space = SparseBispace::dense(vec![split(10, &[3, 7]), split(4, &[2])]);
    let list = SparseLoopList::new(
        copy_loops(),
        vec![space.clone(), space.clone()],
        vec![0],
    )
    .unwrap();

    let input: Vec<f64> = (0..40).map(|v| v as f64).collect();
    let mut assembled = vec![0.0; 40];
    let mut cursor = 0;
    for block_row in 0..3 {
        let rows = space[0].block_size(block_row).unwrap();
        let batch_len = rows * 4;
        let mut batch = vec![0.0; batch_len];
        let mut batches = HashMap::new();
        batches.insert(0, (block_row, block_row));
        let mut kernel = BlockCopyKernel;
        list.run(&mut kernel, &mut batch, &[&input], &batches)
            .unwrap();
        assembled[cursor..cursor + batch_len].copy_from_slice(&batch);
        cursor += batch_len;
    }
    assert_eq!(assembled, input);
}

#[test]
fn test_run_rejects_wrong_input_count() {
    let space = SparseBispace::dense(vec![split(4, &[2]), split(4, &[2])]);
    let list =
        SparseLoopList::new(copy_loops(), vec![space.clone(), space.clone()], vec![]).unwrap();
    let mut output = vec![0.0; 16];
    let mut kernel = BlockCopyKernel;
    assert!(
        list.run(&mut kernel, &mut output, &[], &HashMap::new())
            .is_err()
    );
}
