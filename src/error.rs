//! Error types for stego-client
//!
//! This module provides the error taxonomy for the library:
//! - [`Rejection`] - client-side validation failures raised before any network call
//! - [`TransferError`] - terminal failures of a transfer attempt (timeout, server error, ...)
//! - [`Error`] - the crate-level error wrapping both plus configuration and I/O issues
//!
//! Every error exposes a stable, machine-readable code via `error_code()`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::Operation;

/// Result type alias for stego-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stego-client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_url")
        key: Option<String>,
    },

    /// A selected file failed the media validation policy
    #[error("validation rejected: {0}")]
    Rejected(#[from] Rejection),

    /// A transfer reached a terminal failure
    #[error("{0}")]
    Transfer(#[from] TransferError),

    /// A submission was attempted while the same operation is still in flight
    #[error("{0} already in progress")]
    Busy(Operation),

    /// A required input (carrier or payload) has not been selected
    #[error("missing input: {0}")]
    MissingInput(String),

    /// The request could not be assembled (payload does not match the mode, bad MIME type)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No previous artifact is available for the requested operation
    #[error("no artifact available for {0}")]
    NoArtifact(Operation),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write a downloaded artifact to disk
    #[error("failed to save artifact to {path}: {reason}")]
    SaveFailed {
        /// The path that could not be written
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Rejected(r) => r.error_code(),
            Error::Transfer(e) => e.error_code(),
            Error::Busy(_) => "busy",
            Error::MissingInput(_) => "missing_input",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NoArtifact(_) => "no_artifact",
            Error::Io(_) => "io_error",
            Error::SaveFailed { .. } => "save_failed",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Create a configuration error for a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Client-side validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// MIME type does not satisfy the media kind's policy
    #[error("unsupported media type {actual:?}: expected {expected}")]
    UnsupportedType {
        /// Description of the accepted types (e.g., "image/png", "audio/*")
        expected: &'static str,
        /// The MIME type of the rejected file
        actual: String,
    },

    /// File exceeds the media kind's size ceiling
    #[error("file size {actual} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// The size ceiling in bytes
        limit: u64,
        /// The size of the rejected file in bytes
        actual: u64,
    },
}

impl Rejection {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Rejection::UnsupportedType { .. } => "unsupported_type",
            Rejection::TooLarge { .. } => "too_large",
        }
    }
}

/// Terminal failure of a transfer
///
/// None of these are retried automatically, except that a storage-upload
/// [`TransferError::Server`] on an encode is routed to the direct endpoint once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The attempt exceeded its budget and the network call was cancelled
    #[error("request timed out after {}s; the file may be too large or the server is busy", budget.as_secs())]
    Timeout {
        /// The budget that was exceeded
        budget: Duration,
    },

    /// Non-success status with a structured `detail`
    #[error("server returned status {status}: {detail}")]
    Server {
        /// HTTP status code
        status: u16,
        /// The `detail` text from the error body
        detail: String,
    },

    /// Non-success status with a JSON body that carries no `detail`
    #[error("server returned status {status}")]
    ServerStatus {
        /// HTTP status code
        status: u16,
    },

    /// Non-success status with a body that is not JSON
    #[error("server returned status {status}\nresponse: {excerpt}")]
    ServerRaw {
        /// HTTP status code
        status: u16,
        /// First 100 characters of the body, with "..." appended if truncated
        excerpt: String,
    },

    /// Success status but the body does not have the expected shape
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    /// Decode succeeded but the carrier held no message
    #[error("no hidden message found in the carrier")]
    NoMessageFound,

    /// The direct-endpoint attempt also failed
    #[error("encoding failed after direct fallback: {reason}")]
    FallbackFailed {
        /// Why the fallback attempt failed
        reason: String,
    },

    /// Transport-level failure (connection refused, reset, ...)
    #[error("network error: {0}")]
    Network(String),

    /// The attempt was cancelled because its session was closed
    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            TransferError::Timeout { .. } => "timeout",
            TransferError::Server { .. }
            | TransferError::ServerStatus { .. }
            | TransferError::ServerRaw { .. } => "server_error",
            TransferError::InvalidResponse(_) => "invalid_response",
            TransferError::NoMessageFound => "no_message_found",
            TransferError::FallbackFailed { .. } => "fallback_failed",
            TransferError::Network(_) => "network_error",
            TransferError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        TransferError::Network(e.to_string())
    }
}
