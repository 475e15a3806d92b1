//! Forward-only cursor over a key range.
//!
//! The cursor owns the records returned by one backend range query and
//! walks them in the order the backend produced (ascending by key).
//! States: ready, advancing, released. Release is terminal.

use std::vec::IntoIter;

use crate::error::{Error, Result};

/// One-shot, single-owner cursor returned by [`Store::iterator`](crate::Store::iterator).
///
/// ```
/// use agentkv::{Provider, ProviderOptions};
///
/// let provider = Provider::new("mem://doc", ProviderOptions::default()).unwrap();
/// let store = provider.open_store("docs").unwrap();
/// store.put("abc_1", b"one").unwrap();
///
/// let mut itr = store.prefix_iterator("abc_");
/// while itr.next() {
///     assert_eq!(itr.key(), "abc_1");
///     assert_eq!(itr.value(), b"one");
/// }
/// itr.release();
/// assert!(itr.error().is_err());
/// ```
#[derive(Debug)]
pub struct StoreIterator {
    records: IntoIter<(String, Vec<u8>)>,
    current: Option<(String, Vec<u8>)>,
    released: bool,
    failure: Option<Error>,
}

impl StoreIterator {
    pub(crate) fn from_records(records: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            records: records.into_iter(),
            current: None,
            released: false,
            failure: None,
        }
    }

    pub(crate) fn failed(err: Error) -> Self {
        Self {
            failure: Some(err),
            ..Self::from_records(Vec::new())
        }
    }

    /// Move to the next record. Returns `false` at the end of the range and
    /// always after [`release`](Self::release).
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.current = self.records.next();
        self.current.is_some()
    }

    /// Key of the current record; empty when there is none.
    pub fn key(&self) -> &str {
        self.current.as_ref().map_or("", |(key, _)| key.as_str())
    }

    /// Value of the current record; empty when there is none.
    pub fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, value)| value.as_slice()).unwrap_or_default()
    }

    /// Drop the remaining records. Safe to call more than once.
    pub fn release(&mut self) {
        self.released = true;
        self.current = None;
        self.records = Vec::new().into_iter();
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// `Ok(())` while the cursor is usable or exhausted normally,
    /// [`Error::IteratorClosed`] once released, or the range query failure.
    pub fn error(&self) -> Result<()> {
        if self.released {
            return Err(Error::IteratorClosed);
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
