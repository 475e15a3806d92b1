//! agentkv engine: embedded namespaced key-value storage
//!
//! A RAM-first engine where every namespace is an ordered in-memory table
//! and a write-ahead log provides crash safety.
//!
//! # Architecture
//!
//! - **Read path**: served from per-namespace `BTreeMap`s, so range scans come back sorted
//! - **Write path**: WAL-first (CRC32C-checked entries), then RAM
//! - **Recovery**: WAL replay on open rebuilds namespaces and their contents
//! - **Checkpoint**: [`Engine::checkpoint`] rewrites the live state into a fresh
//!   WAL file and removes the older ones. Without it the WAL keeps every
//!   overwrite and delete, and replay time grows with the history.
//!
//! An engine takes an exclusive lock on `<path>/LOCK`, so a directory is
//! served by at most one engine at a time.
//!
//! The engine knows nothing about stores, providers or iterators; the
//! `agentkv` crate adapts it to that contract.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod platform_durability;
pub mod wal;

pub use config::{EngineConfig, SyncMode};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use format::Operation;
pub use wal::{WalReader, WalWriter};
