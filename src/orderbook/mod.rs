//! Order book and trade history for one pair.
//!
//! This module provides:
//!
//! - [`PriceLadder`] - one side of the book, bounded to a fixed depth
//! - [`TradeRing`] - the most recent trades with lookup by id
//! - [`BookState`] - both ladders, the ring and the feed sequence
//! - [`BookCoordinator`] - bootstrap, ingestion and concurrent reads
//!
//! # Example
//!
//! ```rust
//! use poloniex_book::orderbook::PriceLadder;
//! use poloniex_book::types::{PriceLevel, Side};
//! use rust_decimal_macros::dec;
//!
//! let levels = [(dec!(100), dec!(1)), (dec!(99), dec!(2)), (dec!(98), dec!(3))]
//!     .map(PriceLevel::from);
//! let mut bids = PriceLadder::bootstrap(Side::Bid, levels, 3).unwrap();
//!
//! // Full ladder: a better price evicts the worst level
//! bids.apply_upsert(dec!(101), dec!(0.5));
//! assert_eq!(bids.best(), Some(PriceLevel::new(dec!(101), dec!(0.5))));
//! assert_eq!(bids.aggregate_volume(), dec!(3.5));
//! ```

pub mod book;
pub mod coordinator;
pub mod ladder;
pub mod stats;
pub mod trades;

pub use book::{BookSnapshot, BookState, TickOutcome};
pub use coordinator::{BookCoordinator, CoordinatorState, MIN_SNAPSHOT_PERIOD};
pub use ladder::{LadderChange, PriceLadder};
pub use stats::{IngestStats, IngestStatsSnapshot};
pub use trades::TradeRing;
