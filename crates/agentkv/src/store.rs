//! Namespaced key-value stores.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::backend::Backend;
use crate::error::{Error, Result, KEY_MANDATORY, VALUE_MANDATORY};
use crate::iterator::StoreIterator;
use crate::key_range::{KeyRange, END_KEY_SUFFIX};

struct StoreInner {
    name: String,
    backend: Arc<dyn Backend>,
}

/// Handle to one namespace of a provider's backend.
///
/// Cloning is cheap and every clone, as well as every handle returned by
/// reopening the same name, shares the same underlying store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub(crate) fn new(name: String, backend: Arc<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(StoreInner { name, backend }),
        }
    }

    /// Canonical name of this store.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether both handles refer to the same store object.
    pub fn same_namespace(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Store `value` under `key`, replacing any previous value.
    #[instrument(level = "trace", skip(self, value), fields(store = %self.inner.name, len = value.len()))]
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        check_key(key)?;
        if key.contains(END_KEY_SUFFIX) {
            return Err(Error::validation("key must not contain the reserved end-key suffix"));
        }
        if value.is_empty() {
            return Err(Error::validation(VALUE_MANDATORY));
        }
        self.inner.backend.put(&self.inner.name, key, value)
    }

    /// Current value of `key`, or [`Error::NotFound`].
    #[instrument(level = "trace", skip(self), fields(store = %self.inner.name))]
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        check_key(key)?;
        self.inner
            .backend
            .get(&self.inner.name, key)?
            .ok_or(Error::NotFound)
    }

    /// Remove `key`. Succeeds whether or not it existed.
    #[instrument(level = "trace", skip(self), fields(store = %self.inner.name))]
    pub fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.inner.backend.delete(&self.inner.name, key)
    }

    /// Cursor over `[start_key, end_key)`.
    ///
    /// Never fails: an empty or inverted range yields no records, and a
    /// backend failure is reported by [`StoreIterator::error`].
    pub fn iterator(&self, start_key: &str, end_key: &str) -> StoreIterator {
        self.range_iterator(&KeyRange::new(start_key, end_key))
    }

    /// Cursor over every key that starts with `prefix`.
    pub fn prefix_iterator(&self, prefix: &str) -> StoreIterator {
        self.range_iterator(&KeyRange::prefix(prefix))
    }

    fn range_iterator(&self, range: &KeyRange) -> StoreIterator {
        if range.is_empty() {
            debug!(store = %self.inner.name, start = range.start(), "empty key range");
            return StoreIterator::from_records(Vec::new());
        }
        match self
            .inner
            .backend
            .range_query(&self.inner.name, range.start(), range.end())
        {
            Ok(records) => {
                debug!(store = %self.inner.name, count = records.len(), "range query");
                StoreIterator::from_records(records)
            }
            Err(err) => {
                debug!(store = %self.inner.name, error = %err, "range query failed");
                StoreIterator::failed(err)
            }
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::validation(KEY_MANDATORY));
    }
    Ok(())
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("backend", &self.inner.backend.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn test_store(name: &str) -> Store {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new("test"));
        backend.create_namespace(name).unwrap();
        Store::new(name.to_string(), backend)
    }

    #[test]
    fn test_put_get_overwrite() {
        let store = test_store("s");
        store.put("did:example:123", b"value").unwrap();
        assert_eq!(store.get("did:example:123").unwrap(), b"value");

        store.put("did:example:123", br#"{"key1":"value1"}"#).unwrap();
        assert_eq!(store.get("did:example:123").unwrap(), br#"{"key1":"value1"}"#);
    }

    #[test]
    fn test_empty_key_and_value_rejected() {
        let store = test_store("s");
        assert_eq!(store.put("", b"v"), Err(Error::Validation(KEY_MANDATORY.into())));
        assert_eq!(store.put("k", b""), Err(Error::Validation(VALUE_MANDATORY.into())));
        assert_eq!(store.get(""), Err(Error::Validation(KEY_MANDATORY.into())));
        assert_eq!(store.delete("").unwrap_err().to_string(), "key is mandatory");
    }

    #[test]
    fn test_sentinel_key_rejected() {
        let store = test_store("s");
        let key = format!("abc{}", END_KEY_SUFFIX);
        assert!(matches!(store.put(&key, b"v"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = test_store("s");
        assert_eq!(store.get("did:example:789"), Err(Error::NotFound));
    }

    #[test]
    fn test_failed_operation_leaves_store_usable() {
        let store = test_store("s");
        assert!(store.put("", b"v").is_err());
        store.put("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), b"v");
    }

    #[test]
    fn test_clones_share_namespace() {
        let store = test_store("s");
        let alias = store.clone();
        alias.put("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), b"v");
        assert!(store.same_namespace(&alias));
    }

    #[test]
    fn test_iterator_over_missing_namespace_reports_error() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new("test"));
        let store = Store::new("never_created".into(), backend);
        let mut itr = store.iterator("a", "z");
        assert!(!itr.next());
        assert!(matches!(itr.error(), Err(Error::Backend(_))));
    }

    #[test]
    fn test_prefix_iterator() {
        let store = test_store("s");
        for key in ["abc_1", "abc_2", "abd_1"] {
            store.put(key, b"v").unwrap();
        }
        let mut itr = store.prefix_iterator("abc_");
        let mut keys = Vec::new();
        while itr.next() {
            keys.push(itr.key().to_string());
        }
        assert_eq!(keys, vec!["abc_1", "abc_2"]);
    }
}
