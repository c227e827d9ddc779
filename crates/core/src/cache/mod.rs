//! SQLite-backed store of named response caches.
//!
//! This module provides durable, versioned caches of request→response pairs
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named caches kept in creation order (lookups across caches honor it)
//! - Request keys hashed with SHA-256 over method and canonical URL
//! - All-or-nothing batch writes for manifest installs
//! - Cascading deletes when a stale cache is pruned
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod names;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedEntry, EntrySummary};
pub use hash::compute_request_key;
pub use names::CacheInfo;
