//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - The named cache store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheInfo, CachedEntry, EntrySummary, compute_request_key};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
