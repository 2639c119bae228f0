//! Domain types shared by the book, the feed decoder and the clients.
//!
//! - [`market`] - Snapshot-API response types (order book, trade history)
//! - [`messages`] - Push-feed event types and the decoded [`Tick`]
//! - [`trade`] - [`TradeRecord`], the immutable unit stored in the trade ring

pub mod market;
pub mod messages;
pub mod trade;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use market::{OrderBookSnapshot, RawTrade};
pub use messages::{BookEvent, Tick, TradeEvent};
pub use trade::TradeRecord;

/// Price (rate) of a level or trade
///
/// Poloniex quotes rates as decimal strings such as `"0.03125010"`. Storing
/// them as [`rust_decimal::Decimal`] keeps comparisons and sums exact, which
/// the ladder's volume bookkeeping depends on.
pub type Price = rust_decimal::Decimal;

/// Amount of the pair's second currency at a level or in a trade
pub type Amount = rust_decimal::Decimal;

/// Exchange-assigned trade identifier
pub type TradeId = u64;

/// Book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy orders; best = highest price
    Bid,
    /// Sell orders; best = lowest price
    Ask,
}

impl Side {
    /// Whether `price` ranks strictly ahead of `other` on this side
    pub fn is_better(self, price: Price, other: Price) -> bool {
        match self {
            Side::Bid => price > other,
            Side::Ask => price < other,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("bid"),
            Side::Ask => f.write_str("ask"),
        }
    }
}

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// Taker bought
    Buy,
    /// Taker sold
    Sell,
}

/// One price level: `(price, amount)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price
    pub price: Price,
    /// Total amount resting at the price
    pub amount: Amount,
}

impl PriceLevel {
    /// Create a level
    pub fn new(price: Price, amount: Amount) -> Self {
        Self { price, amount }
    }
}

impl From<(Price, Amount)> for PriceLevel {
    fn from((price, amount): (Price, Amount)) -> Self {
        Self { price, amount }
    }
}

/// Parse a decimal written either plainly (`"0.0123"`) or in scientific
/// notation (`"1.5e-7"`), which is how small floats come back from the feed.
pub(crate) fn parse_decimal(text: &str) -> Option<rust_decimal::Decimal> {
    let text = text.trim();
    rust_decimal::Decimal::from_str(text)
        .or_else(|_| rust_decimal::Decimal::from_scientific(text))
        .ok()
}

/// Deserialize helper accepting a decimal as either a string or a number
pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<rust_decimal::Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    };
    parse_decimal(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal: {text:?}")))
}

/// Deserialize helper accepting an unsigned id as either a string or a number
pub(crate) fn deserialize_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid integer: {s:?}"))),
    }
}
