use std::collections::BTreeMap;
use std::ops::Bound;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::Backend;
use crate::error::{Error, Result};

type Table = BTreeMap<String, Vec<u8>>;

/// Ordered maps in process memory. Nothing survives the backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    label: String,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryBackend {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tables: RwLock::new(HashMap::new()),
        }
    }
}

fn missing(namespace: &str) -> Error {
    Error::Backend(format!("namespace '{}' does not exist", namespace))
}

impl Backend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        Ok(self.tables.read().contains_key(namespace))
    }

    fn create_namespace(&self, namespace: &str) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.contains_key(namespace) {
            tables.insert(namespace.to_string(), Table::new());
            debug!(label = %self.label, namespace, "created in-memory namespace");
        }
        Ok(())
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(namespace).ok_or_else(|| missing(namespace))?;
        table.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let tables = self.tables.read();
        let table = tables.get(namespace).ok_or_else(|| missing(namespace))?;
        Ok(table.get(key).cloned())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables.get_mut(namespace).ok_or_else(|| missing(namespace))?;
        table.remove(key);
        Ok(())
    }

    fn range_query(&self, namespace: &str, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let tables = self.tables.read();
        let table = tables.get(namespace).ok_or_else(|| missing(namespace))?;
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(table
            .range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
