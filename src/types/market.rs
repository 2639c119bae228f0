//! Snapshot-API response types.
//!
//! These types mirror the public `returnOrderBook` and `returnTradeHistory`
//! responses used to bootstrap a book before the push feed takes over.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use super::{
    deserialize_decimal, deserialize_u64, Amount, Price, PriceLevel, TradeId, TradeRecord, TradeSide,
};
use crate::error::Error;

/// Date format used by the trade history endpoint (always UTC)
const TRADE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
struct RawLevel(
    #[serde(deserialize_with = "deserialize_decimal")] Price,
    #[serde(deserialize_with = "deserialize_decimal")] Amount,
);

/// Deserialize `[[rate, amount], ...]` pairs into price levels
fn deserialize_levels<'de, D>(deserializer: D) -> Result<Vec<PriceLevel>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<RawLevel> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|RawLevel(price, amount)| PriceLevel::new(price, amount))
        .collect())
}

/// Order book snapshot for one pair
///
/// Levels arrive best-first on each side. Rates are strings and amounts are
/// numbers on the wire; both are accepted in either form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels, highest price first
    #[serde(deserialize_with = "deserialize_levels")]
    pub bids: Vec<PriceLevel>,
    /// Ask levels, lowest price first
    #[serde(deserialize_with = "deserialize_levels")]
    pub asks: Vec<PriceLevel>,
    /// Push-feed sequence number the snapshot corresponds to, if reported
    #[serde(default)]
    pub seq: Option<u64>,
}

/// One trade from the trade history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawTrade {
    /// Per-pair trade id
    #[serde(rename = "tradeID", deserialize_with = "deserialize_u64")]
    pub trade_id: TradeId,
    /// Execution time, `YYYY-MM-DD HH:MM:SS` in UTC
    pub date: String,
    /// Trade rate
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Price,
    /// Amount of the second currency
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: Amount,
    /// Total in the first currency
    #[serde(deserialize_with = "deserialize_decimal")]
    pub total: Amount,
    /// Aggressor side
    #[serde(rename = "type")]
    pub side: TradeSide,
}

impl RawTrade {
    /// Parse the trade date
    pub fn executed_at(&self) -> Result<DateTime<Utc>, Error> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&self.date, TRADE_DATE_FORMAT) {
            return Ok(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(&self.date)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| {
                Error::Bootstrap(format!(
                    "trade {} has an invalid date: {:?}",
                    self.trade_id, self.date
                ))
            })
    }

    /// Validate the trade and convert it into a [`TradeRecord`]
    pub fn into_record(self) -> Result<TradeRecord, Error> {
        if self.rate <= Price::ZERO || self.amount < Amount::ZERO || self.total < Amount::ZERO {
            return Err(Error::Bootstrap(format!(
                "trade {} has a non-positive rate or negative amount",
                self.trade_id
            )));
        }
        let executed_at = self.executed_at()?;
        Ok(TradeRecord::new(
            self.trade_id,
            executed_at,
            self.rate,
            self.amount,
            self.total,
            self.side,
        ))
    }
}
