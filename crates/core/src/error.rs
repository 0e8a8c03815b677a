//! Unified error types for cours-offline.
//!
//! Each variant carries a stable code prefix so that failures reported over
//! the tool surface can be matched on by the embedding application.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure, no response was received.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded.
    #[error("STORAGE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Pre-warming the static generation failed.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Control message with a missing or unknown `type`.
    #[error("MALFORMED_CONTROL_MESSAGE: {0}")]
    MalformedControlMessage(String),

    /// Push payload that is not JSON or lacks a title.
    #[error("MALFORMED_PUSH_PAYLOAD: {0}")]
    MalformedPushPayload(String),

    /// Network, cache and placeholder all failed for a request.
    #[error("NO_RESPONSE: {0}")]
    NoResponse(String),
}

impl Error {
    /// True for transport failures, which trigger the strategy fallback chain.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Error::NetworkFailure(_))
    }

    /// True for any failure of the cache backend.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_))
    }
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

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::NetworkFailure(msg) => (-32008, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
            Error::InstallFailed(msg) => (-32013, msg.clone()),
            Error::MalformedControlMessage(msg) => (-32014, msg.clone()),
            Error::MalformedPushPayload(msg) => (-32015, msg.clone()),
            Error::NoResponse(msg) => (-32016, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
