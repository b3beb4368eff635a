//! Error types for the Consul KV client.
//!
//! # Design
//! Four categories, matching the stage that failed. `Validation` is raised
//! before any network traffic, `Transport` when the HTTP exchange itself
//! breaks, `Protocol` when Consul answers with a non-2xx status, and `Decode`
//! when a 2xx READ body cannot be turned into a value. Hosts that only need
//! the category can match on [`ErrorKind`].

use thiserror::Error;

/// Errors returned by every stage of a KV operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// The request could not be built: empty url, missing payload, zero
    /// timeout, unresolved token placeholder, bad key or URL syntax.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Connection, DNS, timeout or I/O failure during the HTTP exchange.
    #[error("consul request failed: {0}")]
    Transport(String),

    /// Consul answered with a status outside `[200, 300)`.
    #[error("unexpected response status {status}: {body}")]
    Protocol { status: u16, body: String },

    /// A READ body was not a Consul KV array or its value was not Base64/UTF-8.
    #[error("could not decode consul response: {0}")]
    Decode(String),
}

/// Coarse category of a [`KvError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Protocol,
    Decode,
}

impl KvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvError::Validation(_) => ErrorKind::Validation,
            KvError::Transport(_) => ErrorKind::Transport,
            KvError::Protocol { .. } => ErrorKind::Protocol,
            KvError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        KvError::Validation(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        KvError::Decode(msg.into())
    }
}
