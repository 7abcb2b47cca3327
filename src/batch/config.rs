//! Configuration for contraction planning.

/// Tuning knobs for the contraction factory.
#[derive(Debug, Clone)]
pub struct ContractConfig {
    /// Outer-loop placement heuristic: contracted loops go outermost when
    /// their dense iteration volume exceeds `write_penalty` times the
    /// uncontracted volume. Output writes cost more than input reads, so
    /// dot-product-like shapes favor contracted-outer ordering.
    pub write_penalty: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self { write_penalty: 2 }
    }
}

impl ContractConfig {
    /// Creates a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write-penalty factor of the loop-order heuristic.
    pub fn with_write_penalty(mut self, write_penalty: u64) -> Self {
        self.write_penalty = write_penalty;
        self
    }
}
