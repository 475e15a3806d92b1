//! Core storage engine.
//!
//! `Engine` keeps one ordered RAM table per namespace and a WAL that can
//! rebuild every table on open.
//!
//! **Read path**: RAM only, behind a `RwLock`
//! **Write path**: WAL append (synced per [`SyncMode`]), then RAM
//! **Checkpoint**: live state rewritten into a fresh WAL file, older files removed
//!
//! One engine per directory: `<path>/LOCK` is held exclusively for the
//! engine's lifetime.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, SyncMode};
use crate::error::{EngineError, EngineResult};
use crate::format::Operation;
use crate::platform_durability::lock_exclusive;
use crate::wal::{WalReader, WalWriter};

/// Sorted key/value table for one namespace.
type Table = BTreeMap<Vec<u8>, Vec<u8>>;

const LOCK_FILE: &str = "LOCK";

/// Namespaced RAM tables + WAL.
///
/// All public methods take `&self`. Readers share the table lock; writers
/// serialize on the WAL mutex and hold it while they update RAM so the
/// replay order always matches the order readers observed.
pub struct Engine {
    tables: RwLock<HashMap<String, Table>>,
    wal: Mutex<WalWriter>,
    path: PathBuf,
    config: EngineConfig,
    /// Held, never read: dropping it releases the directory lock.
    _lock: File,
}

impl Engine {
    /// Open or create an engine rooted at `path`.
    ///
    /// Creates `<path>/wal` if needed and replays it to rebuild the tables.
    /// Fails with [`EngineError::Locked`] while another engine has `path` open.
    pub fn open<P: AsRef<Path>>(path: P, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let path = path.as_ref().to_path_buf();
        let wal_dir = path.join("wal");
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| EngineError::io(&wal_dir, "failed to create WAL directory", e))?;

        let lock = Self::lock_dir(&path)?;

        let mut tables: HashMap<String, Table> = HashMap::new();
        let entries = WalReader::new(&wal_dir).recover_entries()?;
        let replayed = entries.len();

        for entry in entries {
            let table = tables.entry(entry.namespace).or_default();
            match entry.operation {
                Operation::CreateNamespace => {}
                Operation::Put => {
                    table.insert(entry.key, entry.value);
                }
                Operation::Delete => {
                    table.remove(&entry.key);
                }
            }
        }

        if replayed > 0 {
            info!(
                path = %wal_dir.display(),
                entries = replayed,
                namespaces = tables.len(),
                "recovered engine state from WAL"
            );
        }

        let wal = WalWriter::new(&wal_dir, config.wal_rotation_size_bytes)?;

        Ok(Self {
            tables: RwLock::new(tables),
            wal: Mutex::new(wal),
            path,
            config,
            _lock: lock,
        })
    }

    fn lock_dir(path: &Path) -> EngineResult<File> {
        let lock_path = path.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| EngineError::io(&lock_path, "failed to open lock file", e))?;

        match lock_exclusive(&file) {
            Ok(()) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(EngineError::Locked { path: path.to_path_buf() }),
            Err(e) => Err(EngineError::io(&lock_path, "failed to lock engine directory", e)),
        }
    }

    /// Cheap liveness check: the WAL file is still reachable.
    pub fn ping(&self) -> EngineResult<()> {
        self.wal.lock().check()
    }

    pub fn namespace_exists(&self, namespace: &str) -> bool {
        self.tables.read().contains_key(namespace)
    }

    /// Create `namespace` if absent. Returns `true` when it was created.
    pub fn create_namespace(&self, namespace: &str) -> EngineResult<bool> {
        self.config.check_entry(namespace, &[], &[])?;

        let mut wal = self.wal.lock();
        if self.tables.read().contains_key(namespace) {
            return Ok(false);
        }
        wal.append(namespace, &[], &[], Operation::CreateNamespace, self.config.sync_mode)?;
        self.tables.write().insert(namespace.to_string(), Table::new());

        debug!(namespace, "created namespace");
        Ok(true)
    }

    /// Names of every namespace, sorted.
    pub fn namespace_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, namespace: &str, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let tables = self.tables.read();
        let table = tables
            .get(namespace)
            .ok_or_else(|| EngineError::NamespaceNotFound(namespace.to_string()))?;
        Ok(table.get(key).cloned())
    }

    /// Insert or replace `key` in `namespace`.
    ///
    /// If the WAL append fails, RAM is never modified.
    pub fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.config.check_entry(namespace, key, value)?;

        let mut wal = self.wal.lock();
        self.require_namespace(namespace)?;
        wal.append(namespace, key, value, Operation::Put, self.config.sync_mode)?;

        let mut tables = self.tables.write();
        if let Some(table) = tables.get_mut(namespace) {
            table.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    /// Remove `key` from `namespace`. Absent keys are not logged.
    pub fn delete(&self, namespace: &str, key: &[u8]) -> EngineResult<()> {
        let mut wal = self.wal.lock();
        {
            let tables = self.tables.read();
            let table = tables
                .get(namespace)
                .ok_or_else(|| EngineError::NamespaceNotFound(namespace.to_string()))?;
            if !table.contains_key(key) {
                return Ok(());
            }
        }
        wal.append(namespace, key, &[], Operation::Delete, self.config.sync_mode)?;

        let mut tables = self.tables.write();
        if let Some(table) = tables.get_mut(namespace) {
            table.remove(key);
        }
        Ok(())
    }

    /// All pairs with `start <= key < end`, ascending by key.
    ///
    /// An empty or inverted interval yields nothing.
    pub fn range(&self, namespace: &str, start: &[u8], end: &[u8]) -> EngineResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let tables = self.tables.read();
        let table = tables
            .get(namespace)
            .ok_or_else(|| EngineError::NamespaceNotFound(namespace.to_string()))?;

        if start >= end {
            return Ok(Vec::new());
        }

        Ok(table
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Number of keys in `namespace` (0 when it does not exist).
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.tables.read().get(namespace).map_or(0, |t| t.len())
    }

    /// Total keys across all namespaces.
    pub fn len(&self) -> usize {
        self.tables.read().values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().values().all(|t| t.is_empty())
    }

    /// Make every append so far durable. Needed in `SyncMode::Relaxed`.
    pub fn sync(&self) -> EngineResult<()> {
        self.wal.lock().sync()
    }

    /// Rewrite the live state into a fresh WAL file and delete the older
    /// files, so overwritten and deleted records stop costing disk and
    /// replay time.
    ///
    /// Writers wait for the duration; readers do not.
    pub fn checkpoint(&self) -> EngineResult<()> {
        let mut wal = self.wal.lock();
        let tables = self.tables.read();

        let keep_from = wal.begin_checkpoint()?;
        let mut records = 0usize;
        for (namespace, table) in tables.iter() {
            wal.append(namespace, &[], &[], Operation::CreateNamespace, SyncMode::Relaxed)?;
            for (key, value) in table {
                wal.append(namespace, key, value, Operation::Put, SyncMode::Relaxed)?;
                records += 1;
            }
        }
        wal.sync()?;
        let removed = wal.remove_before(keep_from)?;

        info!(
            path = %self.path.display(),
            namespaces = tables.len(),
            records,
            removed_files = removed,
            "checkpointed WAL"
        );
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn require_namespace(&self, namespace: &str) -> EngineResult<()> {
        if self.tables.read().contains_key(namespace) {
            Ok(())
        } else {
            Err(EngineError::NamespaceNotFound(namespace.to_string()))
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.wal.get_mut().sync() {
            warn!(path = %self.path.display(), error = %e, "final WAL sync failed");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("path", &self.path)
            .field("namespaces", &self.tables.read().len())
            .field("sync_mode", &self.config.sync_mode)
            .finish()
    }
}
