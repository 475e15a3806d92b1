//! Provider options.

use agentkv_engine::EngineConfig;

/// Settings applied when a [`Provider`](crate::Provider) is built.
///
/// ```
/// use agentkv::ProviderOptions;
///
/// let options = ProviderOptions::default().with_db_prefix("agent1");
/// assert_eq!(options.db_prefix(), Some("agent1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    db_prefix: Option<String>,
    engine: EngineConfig,
}

impl ProviderOptions {
    /// Prefix every store name with `"<prefix>_"`.
    pub fn with_db_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.db_prefix = Some(prefix.into());
        self
    }

    /// Engine settings used by `file://` endpoints.
    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine = config;
        self
    }

    pub fn db_prefix(&self) -> Option<&str> {
        self.db_prefix.as_deref()
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }
}
