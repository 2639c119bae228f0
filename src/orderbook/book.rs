//! Book state for a single pair: two ladders, a trade ring and the feed
//! sequence they are synced to.
//!
//! [`BookState`] is the unit the coordinator locks. Applying a [`Tick`]
//! checks sequencing first and only then mutates, so a rejected tick never
//! leaves a partial update behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ladder::{LadderChange, PriceLadder};
use super::trades::TradeRing;
use crate::error::Error;
use crate::types::{
    Amount, OrderBookSnapshot, Price, PriceLevel, Side, Tick, TradeId, TradeRecord,
};

/// Result of applying one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick was applied
    Applied {
        /// Book events that changed a ladder
        levels_changed: usize,
        /// Book events that fell outside the tracked window or missed
        levels_ignored: usize,
        /// Book events dropped because they would overflow a side's volume
        levels_rejected: usize,
        /// Trades recorded
        trades: usize,
    },
    /// The tick's sequence was already covered; nothing changed
    Stale,
}

/// Full book state for one pair.
///
/// # Thread Safety
///
/// Not internally synchronized. The coordinator keeps it behind a
/// `parking_lot::RwLock` and takes the write lock once per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookState {
    /// Currency pair
    pair: String,

    /// Bid ladder (best = highest)
    bids: PriceLadder,

    /// Ask ladder (best = lowest)
    asks: PriceLadder,

    /// Recent trades
    trades: TradeRing,

    /// Last applied feed sequence; `None` until a baseline is known
    sequence: Option<u64>,

    /// When the state last changed
    updated_at: DateTime<Utc>,
}

impl BookState {
    /// Create an empty book
    #[must_use]
    pub fn new(pair: impl Into<String>, book_depth: usize, trade_depth: usize) -> Self {
        Self {
            pair: pair.into(),
            bids: PriceLadder::new(Side::Bid, book_depth),
            asks: PriceLadder::new(Side::Ask, book_depth),
            trades: TradeRing::new(trade_depth),
            sequence: None,
            updated_at: Utc::now(),
        }
    }

    /// Build a book from snapshot data
    ///
    /// `trades` must be newest-first. The sequence baseline is taken from the
    /// snapshot when it reports one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bootstrap`] if either side of the snapshot has an
    /// invalid level.
    pub fn from_snapshot(
        pair: impl Into<String>,
        snapshot: OrderBookSnapshot,
        trades: Vec<TradeRecord>,
        book_depth: usize,
        trade_depth: usize,
    ) -> Result<Self, Error> {
        Ok(Self {
            pair: pair.into(),
            bids: PriceLadder::bootstrap(Side::Bid, snapshot.bids, book_depth)?,
            asks: PriceLadder::bootstrap(Side::Ask, snapshot.asks, book_depth)?,
            trades: TradeRing::bootstrap(trades, trade_depth),
            sequence: snapshot.seq,
            updated_at: Utc::now(),
        })
    }

    /// Get the currency pair
    #[must_use]
    pub fn pair(&self) -> &str {
        &self.pair
    }

    /// Get the last applied sequence number
    #[must_use]
    pub const fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// When the book last changed
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Ladder for `side`
    #[must_use]
    pub fn ladder(&self, side: Side) -> &PriceLadder {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Bid ladder
    #[must_use]
    pub fn bids(&self) -> &PriceLadder {
        &self.bids
    }

    /// Ask ladder
    #[must_use]
    pub fn asks(&self) -> &PriceLadder {
        &self.asks
    }

    /// Trade ring
    #[must_use]
    pub fn trades(&self) -> &TradeRing {
        &self.trades
    }

    /// Apply one decoded tick
    ///
    /// A tick at or below the current sequence is stale and skipped. A tick
    /// that skips ahead is rejected with [`Error::SequenceGap`] before
    /// anything is touched; the caller must re-bootstrap.
    pub fn apply_tick(&mut self, tick: &Tick) -> Result<TickOutcome, Error> {
        if let Some(last) = self.sequence {
            if tick.sequence <= last {
                return Ok(TickOutcome::Stale);
            }
            let expected = last + 1;
            if tick.sequence != expected {
                return Err(Error::SequenceGap {
                    expected,
                    got: tick.sequence,
                });
            }
        }

        let mut levels_changed = 0;
        let mut levels_ignored = 0;
        let mut levels_rejected = 0;
        let sides = [(&mut self.bids, &tick.bids), (&mut self.asks, &tick.asks)];
        for (ladder, events) in sides {
            for event in events {
                match ladder.apply(event) {
                    LadderChange::Ignored => levels_ignored += 1,
                    LadderChange::Rejected => levels_rejected += 1,
                    _ => levels_changed += 1,
                }
            }
        }

        for trade in &tick.trades {
            self.trades.record(trade.into_record(tick.received_at));
        }

        self.sequence = Some(tick.sequence);
        self.updated_at = tick.received_at;

        Ok(TickOutcome::Applied {
            levels_changed,
            levels_ignored,
            levels_rejected,
            trades: tick.trades.len(),
        })
    }

    /// Get the best bid
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.best()
    }

    /// Get the best ask
    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.best()
    }

    /// Amount resting at `price` on `side`
    #[must_use]
    pub fn amount_at(&self, side: Side, price: Price) -> Option<Amount> {
        self.ladder(side).amount_at(price)
    }

    /// Look up a recent trade
    #[must_use]
    pub fn trade(&self, trade_id: TradeId) -> Option<&TradeRecord> {
        self.trades.get(trade_id)
    }

    /// Get the mid price
    ///
    /// Returns the average of best bid and best ask, or `None` if either is
    /// missing or their sum does not fit in a [`Price`].
    #[must_use]
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid
                .price
                .checked_add(ask.price)
                .map(|sum| sum / Price::TWO),
            _ => None,
        }
    }

    /// Get the spread (best ask - best bid)
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// This shouldn't happen in a healthy feed but is useful for validation.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Verify the invariants of both ladders and the ring
    pub fn check_invariants(&self) -> Result<(), String> {
        self.bids.check_invariants().map_err(|e| format!("bids: {e}"))?;
        self.asks.check_invariants().map_err(|e| format!("asks: {e}"))?;
        self.trades.check_invariants().map_err(|e| format!("trades: {e}"))
    }

    /// Copy the current state into a serializable snapshot
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            pair: self.pair.clone(),
            taken_at: Utc::now(),
            sequence: self.sequence,
            bids: self.bids.levels().collect(),
            asks: self.asks.levels().collect(),
            bid_volume: self.bids.aggregate_volume(),
            ask_volume: self.asks.aggregate_volume(),
            trades: self.trades.iter().cloned().collect(),
        }
    }
}

/// Point-in-time copy of a pair's book, for persistence and for readers that
/// want a consistent view without holding a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Currency pair
    pub pair: String,
    /// When the copy was taken
    pub taken_at: DateTime<Utc>,
    /// Sequence the book was synced to
    pub sequence: Option<u64>,
    /// Bid levels, best first
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first
    pub asks: Vec<PriceLevel>,
    /// Sum of bid amounts
    pub bid_volume: Amount,
    /// Sum of ask amounts
    pub ask_volume: Amount,
    /// Recent trades, oldest first
    pub trades: Vec<TradeRecord>,
}
