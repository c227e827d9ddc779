//! Structured errors for the shellcache server.
//!
//! Tool parameter problems that never reach the cache manager. Everything
//! else surfaces as `shellcache_core::Error`.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid tool parameters (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A tool result could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(String),
}

impl From<ServerError> for McpError {
    fn from(err: ServerError) -> Self {
        let code = match &err {
            ServerError::InvalidInput(_) => -32602,
            ServerError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
