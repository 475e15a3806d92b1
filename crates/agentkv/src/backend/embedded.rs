use std::path::{Path, PathBuf};

use agentkv_engine::{Engine, EngineConfig};
use tracing::info;

use super::Backend;
use crate::error::{Error, Result};

/// Backend over the embedded WAL engine.
///
/// Keys are stored as their UTF-8 bytes, so the engine's byte ordering is
/// the store's string ordering.
pub struct EmbeddedBackend {
    engine: Engine,
    root: PathBuf,
}

impl EmbeddedBackend {
    /// Open (or create) the engine rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P, config: EngineConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let engine = Engine::open(&root, config)?;
        info!(root = %root.display(), namespaces = engine.namespace_names().len(), "opened embedded backend");
        Ok(Self { engine, root })
    }

}

impl std::fmt::Debug for EmbeddedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedBackend")
            .field("root", &self.root)
            .field("entries", &self.engine.len())
            .finish()
    }
}

impl Backend for EmbeddedBackend {
    fn kind(&self) -> &'static str {
        "embedded"
    }

    fn ping(&self) -> Result<()> {
        Ok(self.engine.ping()?)
    }

    fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        Ok(self.engine.namespace_exists(namespace))
    }

    fn create_namespace(&self, namespace: &str) -> Result<()> {
        self.engine.create_namespace(namespace)?;
        Ok(())
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        Ok(self.engine.put(namespace, key.as_bytes(), value)?)
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.engine.get(namespace, key.as_bytes())?)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        Ok(self.engine.delete(namespace, key.as_bytes())?)
    }

    fn range_query(&self, namespace: &str, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>> {
        self.engine
            .range(namespace, start.as_bytes(), end.as_bytes())?
            .into_iter()
            .map(|(key, value)| {
                String::from_utf8(key)
                    .map(|key| (key, value))
                    .map_err(|e| Error::Backend(format!("stored key is not valid UTF-8: {}", e)))
            })
            .collect()
    }

    /// Checkpoint the engine, which also syncs everything written so far.
    fn flush(&self) -> Result<()> {
        Ok(self.engine.checkpoint()?)
    }
}
