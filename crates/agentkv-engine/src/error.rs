//! Error types for engine operations
//!
//! Every failure the engine can report is a variant of [`EngineError`],
//! carrying enough context (file, offset, sizes) to diagnose WAL damage.

use std::path::PathBuf;

use thiserror::Error;

/// Engine error types with detailed context
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O operation failed
    #[error("I/O error in {}: {message}", .path.display())]
    Io {
        /// The file or directory where the error occurred
        path: PathBuf,
        /// Human-readable description of the failed step
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// WAL content is structurally invalid
    #[error("WAL corrupted at offset {offset}: {reason}")]
    WalCorrupted {
        /// Byte offset where corruption was detected
        offset: u64,
        /// Description of the corruption
        reason: String,
    },

    /// Checksum verification failed
    #[error("checksum mismatch at offset {offset}: expected 0x{expected:08x}, got 0x{actual:08x}")]
    ChecksumMismatch {
        expected: u32,
        actual: u32,
        offset: u64,
    },

    /// Partial write at the end of a WAL file
    #[error("torn write at offset {offset}: expected {expected_size} bytes, only {available_bytes} available")]
    TornWrite {
        expected_size: u32,
        available_bytes: u64,
        offset: u64,
    },

    /// Namespace, key or value exceeds the configured limit
    #[error("entry {component} too large: {entry_size} bytes exceeds limit of {max_size} bytes")]
    OversizedEntry {
        entry_size: u64,
        max_size: u64,
        /// Which part of the entry is oversized ("namespace", "key" or "value")
        component: &'static str,
    },

    /// Magic bytes not found at expected location
    #[error("magic bytes not found at offset {offset}: found {found_bytes:02x?}")]
    NoMagicFound {
        offset: u64,
        found_bytes: [u8; 4],
    },

    /// Operation addressed a namespace that was never created
    #[error("namespace '{0}' does not exist")]
    NamespaceNotFound(String),

    /// Engine configuration failed validation
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Another engine already holds the directory lock
    #[error("engine directory {} is already open elsewhere", .path.display())]
    Locked { path: PathBuf },
}

impl EngineError {
    /// Wrap an I/O error with the path and step it belongs to.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            message: message.into(),
            source,
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
