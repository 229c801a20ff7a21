//! Error types for catalog requests.

use thiserror::Error;

/// Reasons a catalog or detail request can fail. None of these reach the
/// hosting page as a fault: the store turns them into an empty snapshot plus a
/// `Failed` state, and the app shows the message in its footer.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The request never produced a response (connection refused, DNS, timeout).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    /// The body could not be interpreted as a catalog.
    #[error("malformed catalog payload: {message}")]
    Payload { message: String },

    /// Detail lookup for a code the server does not know.
    #[error("code {code} not found")]
    NotFound { code: String },
}

impl LoadError {
    pub(crate) fn payload(message: impl Into<String>) -> Self {
        LoadError::Payload {
            message: message.into(),
        }
    }
}

/// Why a single catalog entry was left out of the snapshot. These are logged
/// and counted, never returned from a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("entry {index} is not an object")]
    NotAnObject { index: usize },

    #[error("entry {index} has no usable `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("entry {index} repeats code {code}")]
    DuplicateCode { index: usize, code: String },
}
