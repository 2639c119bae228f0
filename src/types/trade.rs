//! Trade records kept in the trade ring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, Price, TradeId, TradeSide};

/// A completed trade on the pair
///
/// Records are immutable once created. `received_at` is the local receipt
/// time for streamed trades and the exchange's trade date for trades loaded
/// from history at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Exchange trade id
    pub trade_id: TradeId,
    /// When the trade was received (or executed, for history)
    pub received_at: DateTime<Utc>,
    /// Trade rate
    pub price: Price,
    /// Amount of the second currency traded
    pub amount: Amount,
    /// `price * amount` in the first currency, as reported by the exchange
    pub total: Amount,
    /// Aggressor side
    pub side: TradeSide,
}

impl TradeRecord {
    /// Create a new trade record
    pub fn new(
        trade_id: TradeId,
        received_at: DateTime<Utc>,
        price: Price,
        amount: Amount,
        total: Amount,
        side: TradeSide,
    ) -> Self {
        Self {
            trade_id,
            received_at,
            price,
            amount,
            total,
            side,
        }
    }
}
