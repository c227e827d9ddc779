//! Cache-related MCP tools.
//!
//! Read-only views of the named caches.

pub mod lookup;

pub use lookup::{CacheMatchParams, match_impl};
