//! # poloniex-book
//!
//! Live limit order book and trade history for [Poloniex](https://poloniex.com)
//! currency pairs, rebuilt from a REST snapshot and kept in sync with the
//! push feed.
//!
//! ## Features
//!
//! - **Bounded-depth ladders** - `BTreeMap` price levels with eviction at the
//!   tracked window's edge and an always-exact aggregate volume
//! - **Trade ring** - the last N trades with O(1) lookup by trade id
//! - **Sequence checking** - gaps trigger a full re-bootstrap instead of
//!   applying updates to an incomplete book
//! - **Concurrent reads** - one writer task per pair, readers behind a
//!   `parking_lot::RwLock`
//! - **Pluggable transports** - subprocess streamer or WebSocket
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use poloniex_book::client::{RestClient, WebSocketTransport};
//! use poloniex_book::{BookCoordinator, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), poloniex_book::Error> {
//!     let config = Config::new("BTC_ETH").with_book_depth(20);
//!     let source = Arc::new(RestClient::new(&config)?);
//!
//!     let coordinator = BookCoordinator::bootstrapped(config, source).await?;
//!     coordinator
//!         .start(WebSocketTransport::new("wss://feed.example.com/BTC_ETH"))
//!         .await?;
//!
//!     println!("spread: {:?}", coordinator.spread());
//!     coordinator.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Format
//!
//! Each feed line is a `*`-joined run of literal tokens: an ignored
//! timestamp, a `{'seq': N}` header, then one token per event
//! (`orderBookModify`, `orderBookRemove`, `newTrade`). See [`feed`].
//!
//! ## Architecture
//!
//! - [`client`] - snapshot source and streaming transports
//! - [`feed`] - wire-line decoding
//! - [`orderbook`] - ladders, trade ring, book state and coordinator
//! - [`types`] - prices, levels, events and API response types
//! - [`config`] - coordinator configuration
//! - [`error`] - error types for the crate

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod orderbook;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::{Config, ReconnectConfig};
pub use error::Error;
pub use orderbook::{BookCoordinator, BookSnapshot, CoordinatorState};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
