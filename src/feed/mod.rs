//! Push-feed decoding.
//!
//! Lines arrive from a [`LineTransport`](crate::client::LineTransport) as
//! `*`-joined literal tokens. [`literal`] turns one token into a JSON value
//! and [`decoder`] turns a whole line into a [`Tick`](crate::types::Tick).
//!
//! # Example
//!
//! ```rust
//! use poloniex_book::feed::decode_line;
//! use poloniex_book::types::BookEvent;
//!
//! let line = "1234567890*{'seq':5}*{'type':'orderBookRemove','data':{'type':'bid','rate':'100.0'}}";
//! let decoded = decode_line(line).unwrap();
//!
//! assert_eq!(decoded.tick.sequence, 5);
//! assert!(matches!(decoded.tick.bids[0], BookEvent::Remove { .. }));
//! ```

pub mod decoder;
pub mod literal;

pub use decoder::{decode_line, decode_line_at, DecodedTick};
