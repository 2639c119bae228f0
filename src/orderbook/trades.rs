//! Fixed-size ring of the most recent trades.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::types::{TradeId, TradeRecord};

/// Index entry: absolute position of the newest record carrying an id and
/// how many ring positions currently carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    newest: u64,
    occurrences: u32,
}

/// Bounded FIFO of recent trades with O(1) lookup by trade id.
///
/// `order` holds records oldest to newest; `index` maps each id in `order` to
/// the absolute position of its newest copy (`evicted` positions have left
/// the front). The feed should never repeat an id, but if it does each repeat
/// is kept as its own record and `index` counts occurrences, so both
/// structures always agree on membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRing {
    max_depth: usize,
    order: VecDeque<TradeRecord>,
    index: FxHashMap<TradeId, Slot>,
    evicted: u64,
}

impl TradeRing {
    /// Create an empty ring
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            order: VecDeque::with_capacity(max_depth),
            index: FxHashMap::default(),
            evicted: 0,
        }
    }

    /// Build a ring from trade history
    ///
    /// `trades` is newest-first, as the history endpoint returns it. The
    /// newest `max_depth` are kept and stored oldest-first.
    #[must_use]
    pub fn bootstrap<I>(trades: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = TradeRecord>,
    {
        let mut newest_first: Vec<TradeRecord> = trades.into_iter().take(max_depth).collect();
        newest_first.reverse();

        let mut ring = Self::new(max_depth);
        for trade in newest_first {
            ring.record(trade);
        }
        ring
    }

    /// Append a trade, evicting the oldest one when the ring is full
    pub fn record(&mut self, trade: TradeRecord) {
        if self.max_depth == 0 {
            return;
        }
        if self.order.len() == self.max_depth {
            self.evict_oldest();
        }

        let position = self.evicted + self.order.len() as u64;
        let slot = self.index.entry(trade.trade_id).or_insert(Slot {
            newest: position,
            occurrences: 0,
        });
        slot.newest = position;
        slot.occurrences += 1;
        self.order.push_back(trade);
    }

    fn evict_oldest(&mut self) -> Option<TradeRecord> {
        let oldest = self.order.pop_front()?;
        self.evicted += 1;
        if let Some(slot) = self.index.get_mut(&oldest.trade_id) {
            slot.occurrences -= 1;
            if slot.occurrences == 0 {
                self.index.remove(&oldest.trade_id);
            }
        }
        Some(oldest)
    }

    /// Look up a trade by id, returning the newest copy if the id repeats
    #[must_use]
    pub fn get(&self, trade_id: TradeId) -> Option<&TradeRecord> {
        let slot = self.index.get(&trade_id)?;
        let offset = slot.newest.checked_sub(self.evicted)?;
        self.order.get(usize::try_from(offset).ok()?)
    }

    /// Check if a trade id is in the ring
    #[must_use]
    pub fn contains(&self, trade_id: TradeId) -> bool {
        self.index.contains_key(&trade_id)
    }

    /// Number of trades held
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the ring is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of trades held
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Most recent trade
    #[must_use]
    pub fn newest(&self) -> Option<&TradeRecord> {
        self.order.back()
    }

    /// Oldest trade still held
    #[must_use]
    pub fn oldest(&self) -> Option<&TradeRecord> {
        self.order.front()
    }

    /// Trades oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &TradeRecord> + '_ {
        self.order.iter()
    }

    /// The last `n` trades, newest first
    #[must_use]
    pub fn latest(&self, n: usize) -> Vec<TradeRecord> {
        self.order.iter().rev().take(n).cloned().collect()
    }

    /// Verify that the order and the index agree
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.order.len() > self.max_depth {
            return Err(format!(
                "ring holds {} trades, max_depth is {}",
                self.order.len(),
                self.max_depth
            ));
        }
        let counted: usize = self.index.values().map(|s| s.occurrences as usize).sum();
        if counted != self.order.len() {
            return Err(format!(
                "index counts {} positions, order holds {}",
                counted,
                self.order.len()
            ));
        }
        if let Some(trade) = self.order.iter().find(|t| !self.index.contains_key(&t.trade_id)) {
            return Err(format!("trade {} in order but not indexed", trade.trade_id));
        }
        if let Some(id) = self
            .index
            .keys()
            .find(|id| self.get(**id).map(|t| t.trade_id) != Some(**id))
        {
            return Err(format!("index entry for trade {id} points at the wrong record"));
        }
        Ok(())
    }
}
