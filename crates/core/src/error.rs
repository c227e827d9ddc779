//! Unified error types for shellcache.
//!
//! Every variant renders with a stable code prefix so that log lines and
//! tool errors can be grepped by category.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL, unknown mode).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unsupported URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cached entry for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// The network answered with a non-success status where one was required.
    #[error("HTTP_STATUS: {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The primary manifest could not be cached; the version is discarded.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// A lifecycle transition was requested from the wrong phase.
    #[error("INVALID_TRANSITION: cannot {action} while {phase}")]
    InvalidTransition { action: &'static str, phase: String },

    /// An operation needs an active controller and there is none.
    #[error("NOT_ACTIVE: {0}")]
    NotActive(String),

    /// Neither cache nor network could satisfy the request.
    #[error("OFFLINE: {0}")]
    Offline(String),

    /// A spawned batch task panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    Task(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl Error {
    /// True for failures that came from the network rather than the cache.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::HttpStatus { .. })
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::CacheMiss(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => -32002,
            Error::Network(_) => -32004,
            Error::HttpStatus { .. } => -32008,
            Error::InstallFailed(_) => -32020,
            Error::InvalidTransition { .. } => -32021,
            Error::NotActive(_) => -32022,
            Error::Offline(_) => -32023,
            Error::Task(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
