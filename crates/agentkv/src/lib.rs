//! agentkv: one key-value contract over pluggable backends
//!
//! Agent code persists opaque byte records through three types and never
//! learns which backend holds them:
//!
//! - [`Provider`]: owns the backend connection and the registry of open stores
//! - [`Store`]: a namespaced map with put/get/delete and range iteration
//! - [`StoreIterator`]: a forward-only, releasable cursor over `[start, end)`
//!
//! # Backends
//!
//! The endpoint passed to [`Provider::new`] picks the backend:
//! `mem://<label>` for ordered in-memory maps, `file://<path>` for the
//! embedded WAL engine from `agentkv-engine`. Anything else can plug in
//! through [`Backend`] and [`Provider::with_backend`].
//!
//! # Prefix scans
//!
//! There is no separate prefix operation. `[P, P + END_KEY_SUFFIX)` selects
//! every key starting with `P`; [`Store::prefix_iterator`] builds that range.
//!
//! ```
//! use agentkv::{Error, Provider, ProviderOptions, END_KEY_SUFFIX};
//!
//! let provider = Provider::new("mem://example", ProviderOptions::default().with_db_prefix("agent")).unwrap();
//! let store = provider.open_store("dids").unwrap();
//!
//! store.put("did:example:1", b"{}").unwrap();
//! assert_eq!(store.get("did:example:1").unwrap(), b"{}");
//! assert_eq!(store.get("did:example:2"), Err(Error::NotFound));
//!
//! let end = format!("did:{}", END_KEY_SUFFIX);
//! let mut itr = store.iterator("did:", &end);
//! assert!(itr.next());
//! assert!(!itr.next());
//!
//! provider.close().unwrap();
//! ```

pub mod backend;
pub mod endpoint;
pub mod error;
pub mod iterator;
pub mod key_range;
pub mod naming;
pub mod options;
pub mod provider;
pub mod store;

pub use backend::{Backend, EmbeddedBackend, MemoryBackend};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use iterator::StoreIterator;
pub use key_range::{KeyRange, END_KEY_SUFFIX};
pub use options::ProviderOptions;
pub use provider::Provider;
pub use store::Store;

pub use agentkv_engine::{EngineConfig, SyncMode};
