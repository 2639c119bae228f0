//! Push-feed message types.
//!
//! This module contains the typed events a wire line decodes into, the
//! [`Tick`] that groups them, and the serde shapes used to validate each
//! wire token before it becomes an event.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{deserialize_decimal, deserialize_u64, Amount, Price, Side, TradeId, TradeRecord, TradeSide};

/// A mutation of one side of the book
///
/// Amounts are absolute: `Upsert` carries the new total at the price, not a
/// delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookEvent {
    /// Set the amount resting at `price`
    Upsert {
        /// Level price
        price: Price,
        /// New absolute amount
        amount: Amount,
    },
    /// The level at `price` no longer exists
    Remove {
        /// Level price
        price: Price,
    },
}

impl BookEvent {
    /// Price the event applies to
    pub fn price(&self) -> Price {
        match self {
            BookEvent::Upsert { price, .. } | BookEvent::Remove { price } => *price,
        }
    }
}

/// A trade printed on the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeEvent {
    /// Exchange trade id
    pub trade_id: TradeId,
    /// Trade rate
    pub price: Price,
    /// Amount traded
    pub amount: Amount,
    /// Total in the first currency
    pub total: Amount,
    /// Aggressor side, taken from the event's explicit `type` field
    pub side: TradeSide,
}

impl TradeEvent {
    /// Stamp the event with its receipt time
    pub fn into_record(self, received_at: DateTime<Utc>) -> TradeRecord {
        TradeRecord::new(
            self.trade_id,
            received_at,
            self.price,
            self.amount,
            self.total,
            self.side,
        )
    }
}

/// One decoded wire line
///
/// Events keep their token order within each list. A tick is transient: the
/// coordinator applies it and drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Feed sequence number (consecutive per pair; gaps mean missed lines)
    pub sequence: u64,
    /// Local receipt time
    pub received_at: DateTime<Utc>,
    /// Bid-side events
    pub bids: Vec<BookEvent>,
    /// Ask-side events
    pub asks: Vec<BookEvent>,
    /// New trades
    pub trades: Vec<TradeEvent>,
}

impl Tick {
    /// Create an empty tick
    pub fn new(sequence: u64, received_at: DateTime<Utc>) -> Self {
        Self {
            sequence,
            received_at,
            bids: Vec::new(),
            asks: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Append a book event to the list for `side`
    pub fn push_book_event(&mut self, side: Side, event: BookEvent) {
        match side {
            Side::Bid => self.bids.push(event),
            Side::Ask => self.asks.push(event),
        }
    }

    /// Total number of events carried
    pub fn event_count(&self) -> usize {
        self.bids.len() + self.asks.len() + self.trades.len()
    }

    /// Whether the tick carries no events (heartbeat)
    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }
}

/// The sequence header carried by the second token of every line
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SequenceHeader {
    /// Sequence number
    #[serde(deserialize_with = "deserialize_u64")]
    pub seq: u64,
}

/// A single event token as sent by the exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    /// A level was created or its amount changed
    #[serde(rename = "orderBookModify")]
    OrderBookModify(LevelModify),
    /// A level disappeared
    #[serde(rename = "orderBookRemove")]
    OrderBookRemove(LevelRemove),
    /// A trade executed
    #[serde(rename = "newTrade")]
    NewTrade(NewTradeData),
}

/// Payload of `orderBookModify`
#[derive(Debug, Clone, Deserialize)]
pub struct LevelModify {
    /// `bid` or `ask`
    #[serde(rename = "type")]
    pub side: Side,
    /// Level price
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Price,
    /// New absolute amount
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: Amount,
}

/// Payload of `orderBookRemove` (any amount sent is ignored)
#[derive(Debug, Clone, Deserialize)]
pub struct LevelRemove {
    /// `bid` or `ask`
    #[serde(rename = "type")]
    pub side: Side,
    /// Level price
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Price,
}

/// Payload of `newTrade`
#[derive(Debug, Clone, Deserialize)]
pub struct NewTradeData {
    /// Trade id
    #[serde(rename = "tradeID", deserialize_with = "deserialize_u64")]
    pub trade_id: TradeId,
    /// Trade rate
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Price,
    /// Amount traded
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: Amount,
    /// Total in the first currency
    #[serde(deserialize_with = "deserialize_decimal")]
    pub total: Amount,
    /// `buy` or `sell`
    #[serde(rename = "type")]
    pub side: TradeSide,
}

impl From<NewTradeData> for TradeEvent {
    fn from(data: NewTradeData) -> Self {
        Self {
            trade_id: data.trade_id,
            price: data.rate,
            amount: data.amount,
            total: data.total,
            side: data.side,
        }
    }
}
