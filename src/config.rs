//! Configuration for book coordinators.
//!
//! This module provides the [`Config`] struct describing which pair to track
//! and how deep, and [`ReconnectConfig`] for the backoff applied when the
//! streaming connection or a re-bootstrap fails.

use std::time::Duration;

use crate::error::Error;

/// Default Poloniex public API endpoint
pub const DEFAULT_REST_BASE_URL: &str = "https://poloniex.com/public";

/// Configuration for a single pair's book coordinator
///
/// # Example
///
/// ```rust
/// use poloniex_book::Config;
///
/// let config = Config::new("BTC_ETH");
///
/// // Track 50 levels per side and the last 200 trades
/// let config = Config::new("BTC_ETH")
///     .with_book_depth(50)
///     .with_trade_depth(200);
///
/// // Custom timeout
/// let config = Config::new("BTC_ETH")
///     .with_timeout(std::time::Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Currency pair, e.g. `BTC_ETH`
    pair: String,

    /// Maximum price levels tracked per side
    book_depth: usize,

    /// Maximum trades kept in the ring (defaults to `book_depth`)
    trade_depth: Option<usize>,

    /// Base URL of the public snapshot API
    rest_base_url: String,

    /// HTTP request timeout
    timeout: Duration,

    /// How long `stop` waits for the ingestion task before aborting it
    stop_timeout: Duration,

    /// Backoff for reconnects and re-bootstraps
    reconnect: ReconnectConfig,
}

impl Config {
    /// Create a new configuration for the given pair with default depths
    pub fn new(pair: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            book_depth: 10,
            trade_depth: None,
            rest_base_url: DEFAULT_REST_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            stop_timeout: Duration::from_secs(5),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Set the maximum number of price levels tracked per side
    #[must_use]
    pub fn with_book_depth(mut self, depth: usize) -> Self {
        self.book_depth = depth;
        self
    }

    /// Set the maximum number of trades kept
    #[must_use]
    pub fn with_trade_depth(mut self, depth: usize) -> Self {
        self.trade_depth = Some(depth);
        self
    }

    /// Set the public API base URL
    #[must_use]
    pub fn with_rest_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into();
        self
    }

    /// Set the HTTP request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the bounded wait used when stopping the ingestion task
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the reconnect/backoff policy
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Get the currency pair
    pub fn pair(&self) -> &str {
        &self.pair
    }

    /// Get the per-side book depth
    pub fn book_depth(&self) -> usize {
        self.book_depth
    }

    /// Get the trade ring depth
    pub fn trade_depth(&self) -> usize {
        self.trade_depth.unwrap_or(self.book_depth)
    }

    /// Get the public API base URL
    pub fn rest_base_url(&self) -> &str {
        &self.rest_base_url
    }

    /// Get the HTTP timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the stop timeout
    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Get the reconnect policy
    pub fn reconnect(&self) -> &ReconnectConfig {
        &self.reconnect
    }

    /// Reject configurations that cannot produce a usable book
    pub fn validate(&self) -> Result<(), Error> {
        if self.pair.trim().is_empty() {
            return Err(Error::Config("pair must not be empty".into()));
        }
        if self.book_depth == 0 {
            return Err(Error::Config("book_depth must be at least 1".into()));
        }
        if url::Url::parse(&self.rest_base_url).is_err() {
            return Err(Error::Config(format!(
                "invalid rest_base_url: {}",
                self.rest_base_url
            )));
        }
        Ok(())
    }
}

/// Configuration for reconnection behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts (0 = infinite)
    pub max_retries: u32,
    /// Initial delay between reconnection attempts
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum retries (0 = infinite)
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set initial delay in milliseconds
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set maximum delay in milliseconds
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set backoff multiplier
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Whether another attempt is allowed after `attempt` failed ones
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.max_retries == 0 || attempt < self.max_retries
    }

    /// Calculate delay for a given retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new("BTC_ETH");
        assert_eq!(config.pair(), "BTC_ETH");
        assert_eq!(config.book_depth(), 10);
        assert_eq!(config.trade_depth(), 10);
        assert_eq!(config.rest_base_url(), DEFAULT_REST_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new("BTC_ETC")
            .with_book_depth(25)
            .with_trade_depth(100)
            .with_timeout(Duration::from_secs(30))
            .with_stop_timeout(Duration::from_millis(250));

        assert_eq!(config.book_depth(), 25);
        assert_eq!(config.trade_depth(), 100);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.stop_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::new("").validate().is_err());
        assert!(Config::new("BTC_ETH").with_book_depth(0).validate().is_err());
        assert!(Config::new("BTC_ETH")
            .with_rest_base_url("not a url")
            .validate()
            .is_err());
    }

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.initial_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_allows_attempt() {
        let bounded = ReconnectConfig::new().max_retries(2);
        assert!(bounded.allows_attempt(0));
        assert!(bounded.allows_attempt(1));
        assert!(!bounded.allows_attempt(2));

        let unbounded = ReconnectConfig::new().max_retries(0);
        assert!(unbounded.allows_attempt(1_000));
    }

    #[test]
    fn test_delay_calculation() {
        let config = ReconnectConfig::new()
            .initial_delay_ms(100)
            .backoff_multiplier(2.0)
            .max_delay_ms(1000);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
        // Should cap at max_delay_ms
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(1000));
    }
}
