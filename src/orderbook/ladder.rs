//! Bounded-depth price ladder for one side of a book.
//!
//! This implementation uses `BTreeMap` for sorted price levels, providing:
//!
//! - O(log n) insertion, deletion, and lookup
//! - O(log n) access to the best level and the eviction boundary
//!   (via `first_key_value` / `last_key_value`)
//! - Ordered iteration for depth-of-book queries
//!
//! The ladder only tracks the best `max_depth` levels. Updates for prices
//! beyond that window are dropped silently, since the feed keeps sending
//! them.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::types::{Amount, BookEvent, Price, PriceLevel, Side};

/// What an update did to the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderChange {
    /// A new level was added
    Inserted,
    /// An existing level's amount was replaced
    Updated {
        /// Amount before the update
        previous: Amount,
    },
    /// The ladder was full; the boundary level was evicted for a better one
    Replaced {
        /// The evicted boundary level
        evicted: PriceLevel,
    },
    /// A level was deleted
    Removed {
        /// The deleted level
        removed: PriceLevel,
    },
    /// Nothing changed (level outside the window, or not present)
    Ignored,
    /// Nothing changed: the amount would overflow the side's aggregate volume
    Rejected,
}

/// One side of an order book, capped at `max_depth` levels.
///
/// # Invariants
///
/// After every operation:
///
/// - `depth() == ` number of stored levels, and `depth() <= max_depth()`
/// - `aggregate_volume()` equals the sum of all stored amounts
/// - no stored level has a zero amount
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The book
/// coordinator keeps it behind a `parking_lot::RwLock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLadder {
    /// Which side this ladder holds
    side: Side,

    /// price -> amount, sorted ascending
    /// (best bid = last, best ask = first)
    levels: BTreeMap<Price, Amount>,

    /// Maximum number of levels kept
    max_depth: usize,

    /// Sum of all amounts in `levels`
    aggregate_volume: Amount,
}

impl PriceLadder {
    /// Create an empty ladder
    #[must_use]
    pub fn new(side: Side, max_depth: usize) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            max_depth,
            aggregate_volume: Amount::ZERO,
        }
    }

    /// Build a ladder from snapshot levels
    ///
    /// Levels are taken in the order supplied (the snapshot is already ranked
    /// best-first) and only the first `max_depth` non-empty ones are kept.
    /// Zero-amount levels are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bootstrap`] for a non-positive price, a negative
    /// amount, the same price listed twice, or amounts whose sum overflows.
    pub fn bootstrap<I>(side: Side, levels: I, max_depth: usize) -> Result<Self, Error>
    where
        I: IntoIterator<Item = PriceLevel>,
    {
        let mut ladder = Self::new(side, max_depth);

        for level in levels {
            if ladder.depth() == max_depth {
                break;
            }
            if level.price <= Price::ZERO {
                return Err(Error::Bootstrap(format!(
                    "{side} level has non-positive price {}",
                    level.price
                )));
            }
            if level.amount < Amount::ZERO {
                return Err(Error::Bootstrap(format!(
                    "{side} level {} has negative amount {}",
                    level.price, level.amount
                )));
            }
            if level.amount.is_zero() {
                continue;
            }
            let Some(volume) = ladder.aggregate_volume.checked_add(level.amount) else {
                return Err(Error::Bootstrap(format!(
                    "{side} volume overflows at level {}",
                    level.price
                )));
            };
            if ladder.levels.insert(level.price, level.amount).is_some() {
                return Err(Error::Bootstrap(format!(
                    "{side} level {} listed twice",
                    level.price
                )));
            }
            ladder.aggregate_volume = volume;
        }

        Ok(ladder)
    }

    /// Side held by this ladder
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Maximum number of levels kept
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of levels currently tracked
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Sum of amounts across all tracked levels
    #[must_use]
    pub const fn aggregate_volume(&self) -> Amount {
        self.aggregate_volume
    }

    /// Check if no levels are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Check if the ladder holds `max_depth` levels
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.levels.len() >= self.max_depth
    }

    /// Best level: highest bid or lowest ask
    #[must_use]
    pub fn best(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            Side::Bid => self.levels.last_key_value(),
            Side::Ask => self.levels.first_key_value(),
        };
        entry.map(|(&p, &a)| PriceLevel::new(p, a))
    }

    /// Worst tracked level, the first candidate for eviction
    #[must_use]
    pub fn boundary(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            Side::Bid => self.levels.first_key_value(),
            Side::Ask => self.levels.last_key_value(),
        };
        entry.map(|(&p, &a)| PriceLevel::new(p, a))
    }

    /// Amount resting at `price`, if the level is tracked
    #[must_use]
    pub fn amount_at(&self, price: Price) -> Option<Amount> {
        self.levels.get(&price).copied()
    }

    /// Check if a level exists at `price`
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        self.levels.contains_key(&price)
    }

    /// All levels, best first
    pub fn levels(&self) -> Box<dyn Iterator<Item = PriceLevel> + '_> {
        let iter = self.levels.iter().map(|(&p, &a)| PriceLevel::new(p, a));
        match self.side {
            Side::Bid => Box::new(iter.rev()),
            Side::Ask => Box::new(iter),
        }
    }

    /// The top `n` levels, best first
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<PriceLevel> {
        self.levels().take(n).collect()
    }

    /// Set the absolute amount at `price`
    ///
    /// A zero amount removes the level. When the ladder is full, a new price
    /// replaces the boundary level only if it is strictly better; otherwise
    /// the update falls outside the tracked window and is ignored. An amount
    /// that would overflow the aggregate volume is rejected and leaves the
    /// ladder untouched.
    pub fn apply_upsert(&mut self, price: Price, amount: Amount) -> LadderChange {
        if amount <= Amount::ZERO {
            return self.apply_remove(price);
        }

        if let Some(&previous) = self.levels.get(&price) {
            let Some(volume) = self.volume_after(previous, amount) else {
                return LadderChange::Rejected;
            };
            self.levels.insert(price, amount);
            self.aggregate_volume = volume;
            return LadderChange::Updated { previous };
        }

        if !self.is_full() {
            let Some(volume) = self.volume_after(Amount::ZERO, amount) else {
                return LadderChange::Rejected;
            };
            self.levels.insert(price, amount);
            self.aggregate_volume = volume;
            return LadderChange::Inserted;
        }

        let Some(boundary) = self.boundary() else {
            // max_depth == 0: nothing is ever tracked
            return LadderChange::Ignored;
        };
        if !self.side.is_better(price, boundary.price) {
            return LadderChange::Ignored;
        }

        let Some(volume) = self.volume_after(boundary.amount, amount) else {
            return LadderChange::Rejected;
        };
        self.levels.remove(&boundary.price);
        self.levels.insert(price, amount);
        self.aggregate_volume = volume;
        LadderChange::Replaced { evicted: boundary }
    }

    /// Aggregate volume with `removed` taken out and `added` put in, or
    /// `None` on overflow
    fn volume_after(&self, removed: Amount, added: Amount) -> Option<Amount> {
        self.aggregate_volume.checked_sub(removed)?.checked_add(added)
    }

    /// Delete the level at `price`, if tracked
    pub fn apply_remove(&mut self, price: Price) -> LadderChange {
        match self.levels.remove(&price) {
            Some(amount) => {
                // stored amounts are part of the volume, so this cannot underflow
                self.aggregate_volume -= amount;
                LadderChange::Removed {
                    removed: PriceLevel::new(price, amount),
                }
            }
            None => LadderChange::Ignored,
        }
    }

    /// Apply a decoded book event
    pub fn apply(&mut self, event: &BookEvent) -> LadderChange {
        match *event {
            BookEvent::Upsert { price, amount } => self.apply_upsert(price, amount),
            BookEvent::Remove { price } => self.apply_remove(price),
        }
    }

    /// Verify the ladder's invariants, returning a description of the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.levels.len() > self.max_depth {
            return Err(format!(
                "depth {} exceeds max_depth {}",
                self.levels.len(),
                self.max_depth
            ));
        }
        if let Some((price, _)) = self.levels.iter().find(|(_, a)| **a <= Amount::ZERO) {
            return Err(format!("non-positive amount stored at {price}"));
        }
        let sum: Amount = self.levels.values().copied().sum();
        if sum != self.aggregate_volume {
            return Err(format!(
                "aggregate_volume {} != sum of amounts {}",
                self.aggregate_volume, sum
            ));
        }
        Ok(())
    }
}
