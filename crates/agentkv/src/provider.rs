//! Backend connection plus registry of open stores.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::backend::{Backend, EmbeddedBackend, MemoryBackend};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::naming::canonical_store_name;
use crate::options::ProviderOptions;
use crate::store::Store;

/// Owns a backend and hands out [`Store`]s by name.
///
/// At most one store object exists per canonical name: `open_store` on a
/// name that is already open returns a handle to the same store. The
/// registry belongs to this provider; two providers never share it.
pub struct Provider {
    endpoint: String,
    options: ProviderOptions,
    backend: Arc<dyn Backend>,
    stores: Mutex<HashMap<String, Store>>,
}

impl Provider {
    /// Connect to the backend selected by `endpoint`.
    ///
    /// Fails with [`Error::Configuration`] for a blank endpoint and with
    /// [`Error::Connection`] when the endpoint is malformed or the backend
    /// cannot be opened or pinged.
    #[instrument(level = "debug", skip(options))]
    pub fn new(endpoint: &str, options: ProviderOptions) -> Result<Self> {
        let backend: Arc<dyn Backend> = match Endpoint::parse(endpoint)? {
            Endpoint::Memory { label } => Arc::new(MemoryBackend::new(label)),
            Endpoint::File { root } => {
                match EmbeddedBackend::open(&root, options.engine_config().clone()) {
                    Ok(backend) => Arc::new(backend),
                    Err(err @ Error::Configuration(_)) => return Err(err),
                    Err(err) => return Err(Error::connection(endpoint, err)),
                }
            }
        };
        Self::connect(endpoint.trim().to_string(), backend, options)
    }

    /// Build a provider over a caller-supplied backend.
    pub fn with_backend(backend: Arc<dyn Backend>, options: ProviderOptions) -> Result<Self> {
        let endpoint = format!("{}://custom", backend.kind());
        Self::connect(endpoint, backend, options)
    }

    fn connect(endpoint: String, backend: Arc<dyn Backend>, options: ProviderOptions) -> Result<Self> {
        backend.ping().map_err(|err| Error::connection(&endpoint, err))?;
        info!(%endpoint, backend = backend.kind(), prefix = ?options.db_prefix(), "provider connected");
        Ok(Self {
            endpoint,
            options,
            backend,
            stores: Mutex::new(HashMap::new()),
        })
    }

    /// Open (creating if needed) the store called `name`.
    #[instrument(level = "debug", skip(self))]
    pub fn open_store(&self, name: &str) -> Result<Store> {
        let canonical = canonical_store_name(self.options.db_prefix(), name)?;

        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(&canonical) {
            return Ok(store.clone());
        }

        if !self.backend.namespace_exists(&canonical)? {
            self.backend.create_namespace(&canonical)?;
            info!(store = %canonical, "created store");
        }

        let store = Store::new(canonical.clone(), Arc::clone(&self.backend));
        stores.insert(canonical, store.clone());
        Ok(store)
    }

    /// Close the store called `name`. Not being open is not an error.
    ///
    /// The store's records stay in the backend; opening the name again
    /// sees them.
    #[instrument(level = "debug", skip(self))]
    pub fn close_store(&self, name: &str) -> Result<()> {
        let Ok(canonical) = canonical_store_name(self.options.db_prefix(), name) else {
            return Ok(());
        };
        if self.stores.lock().remove(&canonical).is_some() {
            debug!(store = %canonical, "closed store");
        }
        Ok(())
    }

    /// Close every open store and flush the backend. Safe to repeat.
    #[instrument(level = "debug", skip(self))]
    pub fn close(&self) -> Result<()> {
        let closed = {
            let mut stores = self.stores.lock();
            let count = stores.len();
            stores.clear();
            count
        };
        self.backend.flush()?;
        if closed > 0 {
            info!(endpoint = %self.endpoint, closed, "provider closed");
        }
        Ok(())
    }

    pub fn open_store_count(&self) -> usize {
        self.stores.lock().len()
    }

    /// Canonical names of the open stores, sorted.
    pub fn open_store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn db_prefix(&self) -> Option<&str> {
        self.options.db_prefix()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("endpoint", &self.endpoint)
            .field("backend", &self.backend.kind())
            .field("open_stores", &self.open_store_count())
            .finish()
    }
}
