//! Integration suite for the block-sparse contraction engine.

mod bispace_tests;
mod contract_tests;
mod loop_tests;
mod subspace_tests;
