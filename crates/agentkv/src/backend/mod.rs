//! Physical backends behind a [`Provider`](crate::Provider).
//!
//! A backend owns the actual data. It knows about namespaces (one per
//! canonical store name) and answers point reads/writes plus ordered range
//! queries. Validation of keys and values happens above it, in
//! [`Store`](crate::Store); backends may assume non-empty keys.

mod embedded;
mod memory;

pub use embedded::EmbeddedBackend;
pub use memory::MemoryBackend;

use crate::error::Result;

/// Storage collaborator used by the provider and its stores.
///
/// Implementations must be safe to call from many threads at once.
pub trait Backend: Send + Sync {
    /// Short name used in logs and `Debug` output.
    fn kind(&self) -> &'static str;

    /// Verify the backend is reachable.
    fn ping(&self) -> Result<()>;

    fn namespace_exists(&self, namespace: &str) -> Result<bool>;

    /// Create `namespace` if it does not exist yet. Must be idempotent.
    fn create_namespace(&self, namespace: &str) -> Result<()>;

    /// Insert or fully replace the value for `key`.
    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()>;

    /// Current value for `key`, or `None`.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, namespace: &str, key: &str) -> Result<()>;

    /// Every pair with `start <= key < end`, ascending by key.
    ///
    /// Must return an empty vector for `start >= end`.
    fn range_query(&self, namespace: &str, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Persist anything buffered. Called when the provider closes.
    fn flush(&self) -> Result<()>;
}
