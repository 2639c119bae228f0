//! Ingestion counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated by the ingestion task
///
/// All counters are monotonic and updated with relaxed ordering; a
/// [`snapshot`](IngestStats::snapshot) is not a transactional view.
#[derive(Debug, Default)]
pub struct IngestStats {
    lines_received: AtomicU64,
    ticks_applied: AtomicU64,
    stale_ticks: AtomicU64,
    malformed_lines: AtomicU64,
    malformed_tokens: AtomicU64,
    rejected_levels: AtomicU64,
    sequence_gaps: AtomicU64,
    rebootstraps: AtomicU64,
    transport_errors: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStatsSnapshot {
    /// Lines read from the transport
    pub lines_received: u64,
    /// Ticks applied to the book
    pub ticks_applied: u64,
    /// Ticks skipped because their sequence was already covered
    pub stale_ticks: u64,
    /// Lines rejected as a whole (bad sequence token)
    pub malformed_lines: u64,
    /// Event tokens skipped inside otherwise valid lines
    pub malformed_tokens: u64,
    /// Book events dropped because they would overflow a side's volume
    pub rejected_levels: u64,
    /// Sequence gaps detected
    pub sequence_gaps: u64,
    /// Successful re-bootstraps after a gap or reconnect
    pub rebootstraps: u64,
    /// Transport failures (read errors, unexpected end, failed restarts)
    pub transport_errors: u64,
}

impl IngestStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn inc_lines(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_applied(&self) {
        self.ticks_applied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_stale(&self) {
        self.stale_ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_malformed_line(&self) {
        self.malformed_lines.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_malformed_tokens(&self, n: usize) {
        self.malformed_tokens.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_rejected_levels(&self, n: usize) {
        self.rejected_levels.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_gap(&self) {
        self.sequence_gaps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_rebootstrap(&self) {
        self.rebootstraps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            ticks_applied: self.ticks_applied.load(Ordering::Relaxed),
            stale_ticks: self.stale_ticks.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
            malformed_tokens: self.malformed_tokens.load(Ordering::Relaxed),
            rejected_levels: self.rejected_levels.load(Ordering::Relaxed),
            sequence_gaps: self.sequence_gaps.load(Ordering::Relaxed),
            rebootstraps: self.rebootstraps.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}
