//! Error types for tile fetching.
//!
//! Failures split along one axis that callers actually branch on: whether
//! the tile server itself reported a failure (an HTTP status outside 2xx),
//! or the byte transfer broke before a complete body arrived. Everything in
//! the second group carries enough detail to log, but none of it is
//! actionable beyond retrying.

use thiserror::Error;

/// Errors that can occur while fetching a tile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a status outside the 2xx range.
    #[error("Tile server returned HTTP {status}")]
    Server { status: u16 },

    /// The transfer failed before a complete body was received.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// Why a byte transfer failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (DNS, TLS, refused, timeout).
    #[error("Request failed: {0}")]
    Connect(String),

    /// The response did not declare a Content-Length.
    ///
    /// Tile bodies are reassembled up to the declared length, so a missing
    /// header means the transfer cannot be validated as complete.
    #[error("Response did not declare a Content-Length")]
    MissingContentLength,

    /// The body stream failed partway through.
    #[error("Body read failed: {0}")]
    Read(String),

    /// The stream ended with a different byte count than the server declared.
    #[error("Body length mismatch: expected {expected} bytes, received {received}")]
    LengthMismatch { expected: u64, received: u64 },
}
