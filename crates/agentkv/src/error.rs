//! Errors returned by providers, stores and iterators.

use agentkv_engine::EngineError;
use thiserror::Error;

/// Message used whenever an operation is given an empty key.
pub const KEY_MANDATORY: &str = "key is mandatory";

/// Message used when `put` is given an empty value.
pub const VALUE_MANDATORY: &str = "value is mandatory";

/// Everything the store contract can fail with.
///
/// Errors are plain values (`Clone + Eq`) so callers can compare against
/// [`Error::NotFound`] directly instead of matching on messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The endpoint or options passed at construction are unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The backend could not be reached or the endpoint is malformed.
    #[error("failed to connect to backend '{endpoint}': {reason}")]
    Connection { endpoint: String, reason: String },

    /// A key, value or store name was rejected before reaching the backend.
    #[error("{0}")]
    Validation(String),

    /// No record exists for the requested key.
    #[error("data not found")]
    NotFound,

    /// The iterator was released.
    #[error("Iterator is closed")]
    IteratorClosed,

    /// Any other backend failure, message preserved.
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn connection(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        Error::Connection {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::OversizedEntry { .. } => Error::Validation(err.to_string()),
            EngineError::InvalidConfig(msg) => Error::Configuration(msg),
            other => Error::Backend(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
