//! HTTP client for the public snapshot API.
//!
//! This module provides the [`SnapshotSource`] seam the coordinator
//! bootstraps from, and [`RestClient`], its implementation against the
//! Poloniex public endpoints.
//!
//! # Example
//!
//! ```rust,no_run
//! use poloniex_book::client::{RestClient, SnapshotSource};
//! use poloniex_book::Config;
//!
//! # async fn example() -> poloniex_book::Result<()> {
//! let config = Config::new("BTC_ETH");
//! let rest = RestClient::new(&config)?;
//!
//! let book = rest.order_book("BTC_ETH", 10).await?;
//! let trades = rest.trade_history("BTC_ETH").await?;
//! println!("{} bids, {} asks, {} trades", book.bids.len(), book.asks.len(), trades.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::types::{OrderBookSnapshot, RawTrade};

/// Source of bootstrap data for a pair
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the top `depth` levels of each side
    async fn order_book(&self, pair: &str, depth: usize) -> Result<OrderBookSnapshot, Error>;

    /// Fetch recent trades, newest first
    async fn trade_history(&self, pair: &str) -> Result<Vec<RawTrade>, Error>;
}

/// HTTP client for the public API
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Create a new REST client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.rest_base_url().to_string(),
        })
    }

    /// Run a public API command
    ///
    /// `params` are appended to the query string after `command`.
    pub async fn command<T>(&self, command: &str, params: &[(&str, String)]) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let mut query: Vec<(&str, &str)> = vec![("command", command)];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        debug!(command, base_url = %self.base_url, "public api request");
        let response = self.client.get(&self.base_url).query(&query).send().await?;

        self.handle_response(response).await
    }

    /// Handle the HTTP response, checking for errors
    async fn handle_response<T>(&self, response: reqwest::Response) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api(format!("HTTP {}: {}", status.as_u16(), api_message(&body))));
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
            return Err(Error::Api(message.to_string()));
        }
        serde_json::from_value(value).map_err(Error::from)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Pull the `error` message out of an error body, or fall back to the body
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl SnapshotSource for RestClient {
    async fn order_book(&self, pair: &str, depth: usize) -> Result<OrderBookSnapshot, Error> {
        self.command(
            "returnOrderBook",
            &[("currencyPair", pair.to_string()), ("depth", depth.to_string())],
        )
        .await
    }

    async fn trade_history(&self, pair: &str) -> Result<Vec<RawTrade>, Error> {
        self.command("returnTradeHistory", &[("currencyPair", pair.to_string())])
            .await
    }
}
