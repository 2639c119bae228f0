//! Decoder for push-feed lines.
//!
//! A line is a run of literal tokens joined by `*`:
//!
//! ```text
//! <timestamp>*{'seq': 5}*{'type': 'orderBookModify', 'data': {...}}*...
//! ```
//!
//! Token 0 is the exchange's coarse timestamp and is ignored; local receipt
//! time is used instead. Token 1 carries the sequence number and must be
//! valid, or the whole line is rejected. Every later token is one event; a
//! bad event token is skipped and counted without affecting the rest of the
//! line.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::literal;
use crate::error::Error;
use crate::types::messages::{FeedEvent, SequenceHeader};
use crate::types::{BookEvent, Tick, TradeEvent};

/// Separator between tokens on a wire line
pub const TOKEN_DELIMITER: char = '*';

/// A decoded line plus the number of event tokens that had to be skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTick {
    /// The decoded tick
    pub tick: Tick,
    /// Event tokens that could not be decoded
    pub malformed_tokens: usize,
}

/// Decode a line, stamping it with the current time
pub fn decode_line(line: &str) -> Result<DecodedTick, Error> {
    decode_line_at(line, Utc::now())
}

/// Decode a line received at `received_at`
///
/// # Errors
///
/// Returns [`Error::MalformedTick`] if the line has no sequence token or the
/// token has no integer `seq`.
pub fn decode_line_at(line: &str, received_at: DateTime<Utc>) -> Result<DecodedTick, Error> {
    let line = line.trim();
    let mut tokens = line.split(TOKEN_DELIMITER);

    // token 0: exchange timestamp
    tokens.next();

    let header = tokens
        .next()
        .ok_or_else(|| Error::MalformedTick(format!("no sequence token in {line:?}")))?;
    let sequence = decode_sequence(header)?;

    let mut tick = Tick::new(sequence, received_at);
    let mut malformed_tokens = 0;

    for (position, token) in tokens.enumerate() {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match decode_event(token) {
            Ok(event) => route(&mut tick, event),
            Err(reason) => {
                malformed_tokens += 1;
                debug!(sequence, token_index = position + 2, %reason, "skipping malformed event token");
            }
        }
    }

    Ok(DecodedTick {
        tick,
        malformed_tokens,
    })
}

fn decode_sequence(token: &str) -> Result<u64, Error> {
    let value = literal::parse(token.trim())
        .map_err(|e| Error::MalformedTick(format!("sequence token {token:?}: {e}")))?;
    let header: SequenceHeader = serde_json::from_value(value)
        .map_err(|e| Error::MalformedTick(format!("sequence token {token:?}: {e}")))?;
    Ok(header.seq)
}

fn decode_event(token: &str) -> Result<FeedEvent, String> {
    let value = literal::parse(token).map_err(|e| e.to_string())?;
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn route(tick: &mut Tick, event: FeedEvent) {
    match event {
        FeedEvent::OrderBookModify(level) => {
            let event = if level.amount.is_zero() {
                BookEvent::Remove { price: level.rate }
            } else {
                BookEvent::Upsert {
                    price: level.rate,
                    amount: level.amount,
                }
            };
            tick.push_book_event(level.side, event);
        }
        FeedEvent::OrderBookRemove(level) => {
            tick.push_book_event(level.side, BookEvent::Remove { price: level.rate });
        }
        FeedEvent::NewTrade(trade) => tick.trades.push(TradeEvent::from(trade)),
    }
}
