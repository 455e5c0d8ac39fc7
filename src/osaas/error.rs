//! Error types for the Open Source Cloud client.

use crate::client::DecodeError;
use crate::config::ConfigError;
use thiserror::Error;

/// Errors raised by [`super::OsaasClient`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OsaasError {
    /// Raised when the client configuration is incomplete or unusable.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a request could not be sent or its body not read.
    #[error("{operation} request failed: {message}")]
    Transport {
        /// Operation being performed, for example `create instance`.
        operation: String,
        /// Message returned by the HTTP client.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("{operation} returned status {status}: {body}")]
    Status {
        /// Operation being performed.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Sanitised, truncated response body.
        body: String,
    },
    /// Raised when a response body does not match the expected shape.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<ConfigError> for OsaasError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
