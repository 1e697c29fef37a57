//! SBI Error Types
//!
//! Failures where no HTTP response was obtained. A peer answering with an
//! error status is not an `SbiError`; callers inspect `SbiResponse::status`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SbiError {
    /// TCP connect or HTTP/2 handshake failed
    #[error("HTTP/2 connection error: {0}")]
    Connection(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request could not be built, sent or its response read
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server error: {0}")]
    Server(String),

    /// Scheme not served by this client
    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),
}

pub type SbiResult<T> = Result<T, SbiError>;
