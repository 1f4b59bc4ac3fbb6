//! Router configuration

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::engine::GuardedRouter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// The hash value seeded into the `HashSource` before the first
    /// navigation, so a freshly-opened page has something in its location
    /// bar. Seeding this does *not* count as a committed navigation: the
    /// engine's internal `current_hash` stays `Unset` until the first real
    /// `parse` call commits, so that first call is never deduped away even
    /// if it happens to match `initial_hash`.
    pub initial_hash: Option<String>,

    /// Install structured `tracing` output for every guard invocation and
    /// pipeline state transition. Disable in embeddings that configure
    /// their own subscriber and find the guard pipeline's logging too
    /// chatty for their target level.
    pub trace_pipeline: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            initial_hash: None,
            trace_pipeline: true,
        }
    }
}

impl RouterConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial hash seeded into the `HashSource`.
    pub fn with_initial_hash(mut self, hash: impl Into<String>) -> Self {
        self.initial_hash = Some(hash.into());
        self
    }

    /// Enables or disables pipeline tracing.
    pub fn with_trace_pipeline(mut self, enabled: bool) -> Self {
        self.trace_pipeline = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert!(config.initial_hash.is_none());
        assert!(config.trace_pipeline);
    }

    #[test]
    fn test_builder() {
        let config = RouterConfig::new()
            .with_initial_hash("/home")
            .with_trace_pipeline(false);

        assert_eq!(config.initial_hash, Some("/home".to_string()));
        assert!(!config.trace_pipeline);
    }
}
