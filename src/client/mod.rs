//! Collaborators the coordinator talks to.
//!
//! This module contains:
//!
//! - [`rest`] - [`SnapshotSource`] and the HTTP [`RestClient`] used to bootstrap
//! - [`transport`] - [`LineTransport`] and the subprocess [`ProcessTransport`]
//! - [`websocket`] - [`WebSocketTransport`] for feeds served over WebSocket

pub mod rest;
pub mod transport;
pub mod websocket;

pub use rest::{RestClient, SnapshotSource};
pub use transport::{LineTransport, ProcessTransport};
pub use websocket::WebSocketTransport;
