//! Configuration management for the engine
//!
//! Provides durability presets and the limits enforced on every write.

use crate::error::{EngineError, EngineResult};
use crate::format::{MAX_KEY_SIZE, MAX_NAMESPACE_SIZE, MAX_VALUE_SIZE};

/// How a write reaches persistent storage before it is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Every WAL append is followed by a durable sync.
    Durable,
    /// Appends land in the OS page cache; the WAL is synced on
    /// [`Engine::sync`](crate::Engine::sync) and on close.
    Relaxed,
}

/// Engine configuration with durability presets
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// When WAL appends are made durable
    pub sync_mode: SyncMode,
    /// WAL file rotation threshold (bytes)
    pub wal_rotation_size_bytes: u64,
    /// Maximum key size in bytes
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
}

impl EngineConfig {
    /// Every acknowledged write survives power loss.
    pub fn durable() -> Self {
        Self {
            sync_mode: SyncMode::Durable,
            wal_rotation_size_bytes: 64 * 1024 * 1024,
            max_key_size: 512,
            max_value_size: 16 * 1024 * 1024,
        }
    }

    /// Writes survive a process crash but not necessarily power loss
    /// until the next sync. Intended for tests and scratch agents.
    pub fn relaxed() -> Self {
        Self {
            sync_mode: SyncMode::Relaxed,
            wal_rotation_size_bytes: 16 * 1024 * 1024,
            max_key_size: 512,
            max_value_size: 16 * 1024 * 1024,
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> EngineResult<()> {
        if self.wal_rotation_size_bytes < 1024 * 1024 {
            return Err(EngineError::InvalidConfig("wal_rotation_size_bytes must be >= 1MB".into()));
        }
        if self.max_key_size == 0 || self.max_key_size > MAX_KEY_SIZE {
            return Err(EngineError::InvalidConfig(format!(
                "max_key_size must be in [1, {}]",
                MAX_KEY_SIZE
            )));
        }
        if self.max_value_size == 0 || self.max_value_size > MAX_VALUE_SIZE {
            return Err(EngineError::InvalidConfig(format!(
                "max_value_size must be in [1, {}]",
                MAX_VALUE_SIZE
            )));
        }
        Ok(())
    }

    /// Check an entry against the configured limits before it touches the WAL.
    pub(crate) fn check_entry(&self, namespace: &str, key: &[u8], value: &[u8]) -> EngineResult<()> {
        if namespace.len() > MAX_NAMESPACE_SIZE {
            return Err(EngineError::OversizedEntry {
                entry_size: namespace.len() as u64,
                max_size: MAX_NAMESPACE_SIZE as u64,
                component: "namespace",
            });
        }
        if key.len() > self.max_key_size {
            return Err(EngineError::OversizedEntry {
                entry_size: key.len() as u64,
                max_size: self.max_key_size as u64,
                component: "key",
            });
        }
        if value.len() > self.max_value_size {
            return Err(EngineError::OversizedEntry {
                entry_size: value.len() as u64,
                max_size: self.max_value_size as u64,
                component: "value",
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self { Self::durable() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_valid() {
        assert!(EngineConfig::durable().validate().is_ok());
        assert!(EngineConfig::relaxed().validate().is_ok());
    }

    #[test]
    fn test_rejects_small_rotation() {
        let mut config = EngineConfig::default();
        config.wal_rotation_size_bytes = 4096;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_key_limit_above_format_limit() {
        let mut config = EngineConfig::default();
        config.max_key_size = MAX_KEY_SIZE + 1;
        assert!(config.validate().is_err());
        config.max_key_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_entry_limits() {
        let config = EngineConfig::default();
        assert!(config.check_entry("ns", b"k", b"v").is_ok());

        let key = vec![b'k'; config.max_key_size + 1];
        assert!(matches!(
            config.check_entry("ns", &key, b"v"),
            Err(EngineError::OversizedEntry { component: "key", .. })
        ));

        let ns = "n".repeat(MAX_NAMESPACE_SIZE + 1);
        assert!(matches!(
            config.check_entry(&ns, b"k", b"v"),
            Err(EngineError::OversizedEntry { component: "namespace", .. })
        ));
    }
}
