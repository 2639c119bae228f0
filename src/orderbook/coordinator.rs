//! Book coordinator: bootstraps a pair's book and keeps it in sync with the
//! push feed.
//!
//! This module provides [`BookCoordinator`], which owns one [`BookState`]
//! and the ingestion task that feeds it.
//!
//! # Design
//!
//! The book lives behind a `parking_lot::RwLock`. Only the ingestion task
//! takes the write lock, once per tick, so readers always see a tick either
//! fully applied or not at all. Reads take the read lock for a single
//! operation or clone a [`BookSnapshot`].
//!
//! # Sequence Tracking
//!
//! Every tick carries a sequence number. A tick that skips ahead means
//! updates were missed; the coordinator stops applying ticks, re-fetches
//! the book from the [`SnapshotSource`] and swaps it in wholesale before
//! reading the next line. Transport failures go through the same
//! re-bootstrap after a reconnect with exponential backoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::book::{BookSnapshot, BookState, TickOutcome};
use super::stats::{IngestStats, IngestStatsSnapshot};
use crate::client::{LineTransport, SnapshotSource};
use crate::config::Config;
use crate::error::Error;
use crate::feed::decode_line;
use crate::types::{Amount, Price, PriceLevel, RawTrade, Side, TradeId, TradeRecord};

/// Shortest period accepted by [`BookCoordinator::snapshot_stream`]
pub const MIN_SNAPSHOT_PERIOD: Duration = Duration::from_millis(1);

/// Lifecycle of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No book has been loaded yet
    Uninitialized,
    /// A book is loaded (or being reloaded) but ticks are not being applied
    Bootstrapping,
    /// The ingestion task is applying ticks
    Live,
    /// Ingestion has ended; the last book stays readable
    Stopped,
}

/// State shared between the coordinator handle and its ingestion task
struct Shared {
    config: Config,
    source: Arc<dyn SnapshotSource>,
    book: RwLock<BookState>,
    state: RwLock<CoordinatorState>,
    stats: IngestStats,
    last_error: Mutex<Option<Error>>,
}

/// Keeps one pair's book in sync with the push feed.
///
/// # Thread Safety
///
/// The coordinator is safe to share across tasks via `Arc<BookCoordinator>`.
/// All read methods take `&self` and never block on the network.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use poloniex_book::client::{ProcessTransport, RestClient};
/// use poloniex_book::{BookCoordinator, Config};
///
/// # async fn example() -> poloniex_book::Result<()> {
/// let config = Config::new("BTC_ETH").with_book_depth(20);
/// let source = Arc::new(RestClient::new(&config)?);
///
/// let coordinator = BookCoordinator::new(config, source)?;
/// coordinator.bootstrap().await?;
/// coordinator
///     .start(ProcessTransport::new("python").arg("streamer.py").arg("BTC_ETH"))
///     .await?;
///
/// if let Some(bid) = coordinator.best_bid() {
///     println!("Best bid: {} @ {}", bid.amount, bid.price);
/// }
///
/// coordinator.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct BookCoordinator {
    shared: Arc<Shared>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for BookCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookCoordinator")
            .field("pair", &self.shared.config.pair())
            .field("state", &self.state())
            .field("sequence", &self.last_sequence())
            .finish()
    }
}

impl BookCoordinator {
    /// Create a coordinator with an empty book
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: Config, source: Arc<dyn SnapshotSource>) -> Result<Self, Error> {
        config.validate()?;

        let book = BookState::new(config.pair(), config.book_depth(), config.trade_depth());
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                source,
                book: RwLock::new(book),
                state: RwLock::new(CoordinatorState::Uninitialized),
                stats: IngestStats::new(),
                last_error: Mutex::new(None),
            }),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
            shutdown,
        })
    }

    /// Load the book from the snapshot source
    ///
    /// May be called again before [`start`](Self::start) to refresh the
    /// book. On failure the previous book is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bootstrap`] if a collaborator call fails or returns
    /// invalid levels or trades, and [`Error::InvalidState`] once ingestion
    /// has started.
    pub async fn bootstrap(&self) -> Result<(), Error> {
        if self.started.load(Ordering::SeqCst) {
            return Err(Error::InvalidState(
                "cannot bootstrap after ingestion has started".into(),
            ));
        }

        let previous = self.shared.set_state(CoordinatorState::Bootstrapping);
        match self.shared.reload().await {
            Ok(()) => Ok(()),
            Err(e) => {
                if previous == CoordinatorState::Uninitialized {
                    self.shared.set_state(CoordinatorState::Uninitialized);
                }
                Err(e)
            }
        }
    }

    /// Create a coordinator and load its book in one step
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new) and [`bootstrap`](Self::bootstrap). No
    /// coordinator is returned if either fails.
    pub async fn bootstrapped(
        config: Config,
        source: Arc<dyn SnapshotSource>,
    ) -> Result<Self, Error> {
        let coordinator = Self::new(config, source)?;
        coordinator.bootstrap().await?;
        Ok(coordinator)
    }

    /// Start the transport and spawn the ingestion task
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the book has not been bootstrapped
    /// or ingestion was already started, or the transport's error if it
    /// fails to start (in which case `start` may be retried).
    pub async fn start<T>(&self, mut transport: T) -> Result<(), Error>
    where
        T: LineTransport + 'static,
    {
        let state = self.state();
        if state != CoordinatorState::Bootstrapping {
            return Err(Error::InvalidState(format!("cannot start from {state:?}")));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidState("ingestion already started".into()));
        }

        if let Err(e) = transport.start().await {
            self.started.store(false, Ordering::SeqCst);
            return Err(e);
        }

        self.shared.set_state(CoordinatorState::Live);
        info!(pair = %self.pair(), sequence = ?self.last_sequence(), "book live");

        let shared = Arc::clone(&self.shared);
        let shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(run_ingestion(shared, transport, shutdown));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Stop ingestion and close the transport
    ///
    /// Waits up to [`Config::stop_timeout`] for the ingestion task before
    /// aborting it. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns the error that ended ingestion, if it ended on its own
    /// because reconnects were exhausted. The error is returned once.
    pub async fn stop(&self) -> Result<(), Error> {
        self.shutdown.send_replace(true);

        let handle = self.task.lock().take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout(self.shared.config.stop_timeout(), &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(pair = %self.pair(), error = %e, "ingestion task failed"),
                Err(_) => {
                    warn!(pair = %self.pair(), "ingestion task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        if self.shared.set_state(CoordinatorState::Stopped) != CoordinatorState::Stopped {
            info!(pair = %self.pair(), "coordinator stopped");
        }

        match self.shared.last_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Send a [`BookSnapshot`] every `every` while the book is live
    ///
    /// The stream ends when the coordinator stops or the receiver is dropped.
    /// Snapshots are skipped while a re-bootstrap is in progress. Periods
    /// shorter than [`MIN_SNAPSHOT_PERIOD`] are raised to it.
    pub fn snapshot_stream(&self, every: Duration) -> mpsc::Receiver<BookSnapshot> {
        let every = every.max(MIN_SNAPSHOT_PERIOD);
        let (tx, rx) = mpsc::channel(16);
        let shared = Arc::clone(&self.shared);
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.changed() => break,
                }
                match shared.state() {
                    CoordinatorState::Live => {
                        let snapshot = shared.book.read().snapshot();
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    CoordinatorState::Stopped => break,
                    _ => {}
                }
            }
            debug!(pair = %shared.config.pair(), "snapshot stream ended");
        });

        rx
    }

    /// Get the currency pair
    pub fn pair(&self) -> &str {
        self.shared.config.pair()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Get the lifecycle state
    pub fn state(&self) -> CoordinatorState {
        self.shared.state()
    }

    /// Read the ingestion counters
    pub fn stats(&self) -> IngestStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Message of the error that ended ingestion, if any
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().as_ref().map(ToString::to_string)
    }

    /// Get the best bid
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.shared.book.read().best_bid()
    }

    /// Get the best ask
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.shared.book.read().best_ask()
    }

    /// Amount resting at `price` on `side`
    pub fn amount_at(&self, side: Side, price: Price) -> Option<Amount> {
        self.shared.book.read().amount_at(side, price)
    }

    /// Number of levels held on `side`
    pub fn depth(&self, side: Side) -> usize {
        self.shared.book.read().ladder(side).depth()
    }

    /// Sum of the amounts held on `side`
    pub fn aggregate_volume(&self, side: Side) -> Amount {
        self.shared.book.read().ladder(side).aggregate_volume()
    }

    /// The last `n` trades, newest first
    pub fn recent_trades(&self, n: usize) -> Vec<TradeRecord> {
        self.shared.book.read().trades().latest(n)
    }

    /// Look up a recent trade
    pub fn trade(&self, trade_id: TradeId) -> Option<TradeRecord> {
        self.shared.book.read().trade(trade_id).cloned()
    }

    /// Last applied feed sequence
    pub fn last_sequence(&self) -> Option<u64> {
        self.shared.book.read().sequence()
    }

    /// Get the spread (best ask - best bid)
    pub fn spread(&self) -> Option<Price> {
        self.shared.book.read().spread()
    }

    /// Get the mid price
    pub fn mid_price(&self) -> Option<Price> {
        self.shared.book.read().mid_price()
    }

    /// Copy the whole book
    pub fn snapshot(&self) -> BookSnapshot {
        self.shared.book.read().snapshot()
    }

    /// Run `f` against the book under a single read lock
    ///
    /// Keep `f` short: the ingestion task waits for the lock.
    pub fn with_book<R>(&self, f: impl FnOnce(&BookState) -> R) -> R {
        f(&self.shared.book.read())
    }
}

impl Drop for BookCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

impl Shared {
    fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    /// Set the state, returning the previous one
    fn set_state(&self, state: CoordinatorState) -> CoordinatorState {
        std::mem::replace(&mut *self.state.write(), state)
    }

    /// Fetch a fresh book and swap it in
    async fn reload(&self) -> Result<(), Error> {
        let book = load_book(&self.config, self.source.as_ref()).await?;
        info!(
            pair = %self.config.pair(),
            sequence = ?book.sequence(),
            bids = book.bids().depth(),
            asks = book.asks().depth(),
            trades = book.trades().len(),
            "book bootstrapped"
        );
        if book.is_crossed() {
            warn!(
                pair = %self.config.pair(),
                best_bid = ?book.best_bid().map(|l| l.price),
                best_ask = ?book.best_ask().map(|l| l.price),
                "bootstrapped book is crossed"
            );
        }
        *self.book.write() = book;
        Ok(())
    }

    /// Decode and apply one line
    ///
    /// Returns `Err` only for a sequence gap; undecodable lines are counted
    /// and skipped.
    fn handle_line(&self, line: &str) -> Result<(), Error> {
        self.stats.inc_lines();
        let pair = self.config.pair();

        let decoded = match decode_line(line) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.stats.inc_malformed_line();
                warn!(%pair, error = %e, "skipping undecodable line");
                return Ok(());
            }
        };
        if decoded.malformed_tokens > 0 {
            self.stats.add_malformed_tokens(decoded.malformed_tokens);
            warn!(
                %pair,
                sequence = decoded.tick.sequence,
                skipped = decoded.malformed_tokens,
                "skipped malformed event tokens"
            );
        }

        let outcome = self.book.write().apply_tick(&decoded.tick);
        match outcome {
            Ok(TickOutcome::Applied {
                levels_changed,
                levels_ignored,
                levels_rejected,
                trades,
            }) => {
                self.stats.inc_applied();
                if levels_rejected > 0 {
                    self.stats.add_rejected_levels(levels_rejected);
                    warn!(
                        %pair,
                        sequence = decoded.tick.sequence,
                        rejected = levels_rejected,
                        "dropped levels that would overflow book volume"
                    );
                }
                trace!(
                    %pair,
                    sequence = decoded.tick.sequence,
                    levels_changed,
                    levels_ignored,
                    trades,
                    "tick applied"
                );
                Ok(())
            }
            Ok(TickOutcome::Stale) => {
                self.stats.inc_stale();
                debug!(%pair, sequence = decoded.tick.sequence, "skipping stale tick");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Fetch the order book and trade history and build a [`BookState`]
async fn load_book(config: &Config, source: &dyn SnapshotSource) -> Result<BookState, Error> {
    let pair = config.pair();
    let snapshot = source
        .order_book(pair, config.book_depth())
        .await
        .map_err(Error::bootstrap)?;
    let history = source.trade_history(pair).await.map_err(Error::bootstrap)?;

    let trades = history
        .into_iter()
        .take(config.trade_depth())
        .map(RawTrade::into_record)
        .collect::<Result<Vec<_>, _>>()?;

    BookState::from_snapshot(
        pair,
        snapshot,
        trades,
        config.book_depth(),
        config.trade_depth(),
    )
}

/// Body of the ingestion task
async fn run_ingestion<T>(shared: Arc<Shared>, mut transport: T, mut shutdown: watch::Receiver<bool>)
where
    T: LineTransport,
{
    let result = ingest(&shared, &mut transport, &mut shutdown).await;

    if let Err(e) = transport.stop().await {
        warn!(pair = %shared.config.pair(), error = %e, "transport stop failed");
    }

    if let Err(e) = result {
        error!(pair = %shared.config.pair(), error = %e, "ingestion ended");
        *shared.last_error.lock() = Some(e);
    }
    shared.set_state(CoordinatorState::Stopped);
}

/// Read and apply lines until shutdown or an unrecoverable failure
async fn ingest<T>(
    shared: &Shared,
    transport: &mut T,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), Error>
where
    T: LineTransport,
{
    let pair = shared.config.pair();
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        let line = tokio::select! {
            biased;
            _ = shutdown.changed() => return Ok(()),
            line = transport.next_line() => line,
        };

        let failure = match line {
            Ok(Some(line)) => {
                attempt = 0;
                match shared.handle_line(&line) {
                    Ok(()) => continue,
                    Err(gap @ Error::SequenceGap { .. }) => {
                        shared.stats.inc_gap();
                        warn!(%pair, error = %gap, "sequence gap, re-bootstrapping");
                        Recovery::Rebootstrap(gap)
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(None) => {
                shared.stats.inc_transport_error();
                error!(%pair, "feed stream ended");
                Recovery::Reconnect(Error::Transport("feed stream ended".into()))
            }
            Err(e) => {
                shared.stats.inc_transport_error();
                error!(%pair, error = %e, "feed read failed");
                Recovery::Reconnect(Error::Transport(e.to_string()))
            }
        };

        if !recover(shared, transport, shutdown, failure, &mut attempt).await? {
            return Ok(());
        }
    }
}

/// Why the live loop was interrupted
enum Recovery {
    /// The book is out of sync; reload it and keep the connection
    Rebootstrap(Error),
    /// The connection is gone; reconnect, then reload
    Reconnect(Error),
}

/// Bring the book back in sync
///
/// Returns `Ok(true)` when the book is live again, `Ok(false)` on shutdown,
/// and `Err` with the last failure once the reconnect policy is exhausted.
async fn recover<T>(
    shared: &Shared,
    transport: &mut T,
    shutdown: &mut watch::Receiver<bool>,
    failure: Recovery,
    attempt: &mut u32,
) -> Result<bool, Error>
where
    T: LineTransport,
{
    let pair = shared.config.pair();
    let policy = shared.config.reconnect();
    shared.set_state(CoordinatorState::Bootstrapping);

    let (mut reconnect, mut last) = match failure {
        Recovery::Rebootstrap(e) => (false, e),
        Recovery::Reconnect(e) => (true, e),
    };
    let mut backoff = reconnect;

    loop {
        if backoff {
            if !policy.allows_attempt(*attempt) {
                warn!(%pair, attempts = *attempt, "giving up on recovery");
                return Err(last);
            }
            let delay = policy.delay_for_attempt(*attempt);
            *attempt += 1;

            if reconnect {
                if let Err(e) = transport.stop().await {
                    debug!(%pair, error = %e, "transport stop before reconnect failed");
                }
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => return Ok(false),
                _ = tokio::time::sleep(delay) => {}
            }

            if reconnect {
                info!(%pair, attempt = *attempt, "reconnecting feed");
                if let Err(e) = transport.start().await {
                    shared.stats.inc_transport_error();
                    error!(%pair, attempt = *attempt, error = %e, "reconnect failed");
                    last = e;
                    continue;
                }
                reconnect = false;
            }
        }

        match shared.reload().await {
            Ok(()) => {
                shared.set_state(CoordinatorState::Live);
                shared.stats.inc_rebootstrap();
                info!(%pair, sequence = ?shared.book.read().sequence(), "book live again");
                return Ok(true);
            }
            Err(e) => {
                warn!(%pair, error = %e, "re-bootstrap failed");
                last = e;
                backoff = true;
            }
        }
    }
}
