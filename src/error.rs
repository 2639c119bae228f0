//! Error types for the poloniex-book crate.
//!
//! This module defines the error types that can occur while bootstrapping,
//! decoding the push feed, and keeping a book in sync, including the
//! network errors raised by the snapshot and streaming collaborators.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// A wire line could not be decoded into a tick
    ///
    /// Raised for a whole line when its sequence token is missing or
    /// invalid. Individual bad event tokens are skipped by the decoder and
    /// only counted.
    #[error("Malformed tick: {0}")]
    MalformedTick(String),

    /// The snapshot collaborator failed or returned data of the wrong shape
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    /// Feed sequence gap detected (missed updates)
    #[error("Sequence gap: expected {expected}, got {got}")]
    SequenceGap {
        /// Expected sequence number
        expected: u64,
        /// Actual sequence number received
        got: u64,
    },

    /// The streaming connection failed or ended unexpectedly
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (subprocess pipes, files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The exchange answered with an error body
    #[error("API error: {0}")]
    Api(String),

    /// Invalid configuration (missing fields, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the coordinator's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A transport handshake did not finish within its connect timeout
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// Check if the ingestion pipeline can recover from this error locally
    /// (by skipping input, re-bootstrapping, or reconnecting).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedTick(_) | Error::SequenceGap { .. } | Error::Transport(_)
        )
    }

    /// Wrap any displayable failure from a snapshot collaborator as a
    /// bootstrap error.
    pub(crate) fn bootstrap(err: impl std::fmt::Display) -> Self {
        Error::Bootstrap(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}
