//! World configuration.

/// Tunables applied when a world is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldConfig {
    /// Spare node wrappers pre-populated in each container's pool (the
    /// world's entity list and every activated system's `$nodes`).
    pub pool_warmup: usize,
}

impl WorldConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-container pool warmup.
    #[must_use]
    pub fn with_pool_warmup(mut self, nodes: usize) -> Self {
        self.pool_warmup = nodes;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self { pool_warmup: 32 }
    }
}
