//! Audio pump health monitoring and diagnostics

use std::time::{Duration, Instant};

use tracing::debug;

/// Interval between metric summaries
const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Counters for buffer starvation and overflow.
///
/// Totals are kept for the lifetime of the pump; the `interval_*` fields are
/// reset every time a summary is logged.
#[derive(Debug, Clone)]
pub struct PumpMetrics {
    /// Total pairs accepted by `enqueue`
    pub pairs_enqueued: u64,
    /// Total pairs dropped by overflow eviction
    pub pairs_evicted: u64,
    /// Number of eviction batches
    pub overruns: u64,
    /// Block requests that could not be fully served from real samples
    pub underruns: u64,
    /// Block requests that needed the underrun callback
    pub refills: u64,
    /// Silent pairs padded into blocks
    pub silence_pairs: u64,
    /// Occupancy range seen since the last summary
    pub interval_fill_min: usize,
    pub interval_fill_max: usize,
    interval_underruns: u64,
    interval_overruns: u64,
    last_log_time: Option<Instant>,
}

impl PumpMetrics {
    pub fn new() -> Self {
        Self {
            pairs_enqueued: 0,
            pairs_evicted: 0,
            overruns: 0,
            underruns: 0,
            refills: 0,
            silence_pairs: 0,
            interval_fill_min: usize::MAX,
            interval_fill_max: 0,
            interval_underruns: 0,
            interval_overruns: 0,
            last_log_time: None,
        }
    }

    pub(super) fn record_fill(&mut self, fill: usize) {
        self.interval_fill_min = self.interval_fill_min.min(fill);
        self.interval_fill_max = self.interval_fill_max.max(fill);
    }

    pub(super) fn record_overrun(&mut self, evicted: usize) {
        self.overruns += 1;
        self.interval_overruns += 1;
        self.pairs_evicted += evicted as u64;
    }

    pub(super) fn record_underrun(&mut self, silence: usize) {
        self.underruns += 1;
        self.interval_underruns += 1;
        self.silence_pairs += silence as u64;
    }

    /// Log a summary if at least a second passed since the previous one.
    ///
    /// Returns true when a summary was emitted.
    pub fn maybe_log(&mut self, now: Instant, capacity: usize) -> bool {
        let Some(last) = self.last_log_time else {
            self.last_log_time = Some(now);
            return false;
        };
        if now.saturating_duration_since(last) < LOG_INTERVAL {
            return false;
        }

        let pct = |fill: usize| fill as f64 / capacity.max(1) as f64 * 100.0;
        let fill_min = if self.interval_fill_min == usize::MAX {
            0
        } else {
            self.interval_fill_min
        };
        debug!(
            "audio pump: fill {:.1}%..{:.1}%, underruns={}, overruns={}, evicted_total={}",
            pct(fill_min),
            pct(self.interval_fill_max),
            self.interval_underruns,
            self.interval_overruns,
            self.pairs_evicted
        );

        self.interval_underruns = 0;
        self.interval_overruns = 0;
        self.interval_fill_min = usize::MAX;
        self.interval_fill_max = 0;
        self.last_log_time = Some(now);
        true
    }
}

impl Default for PumpMetrics {
    fn default() -> Self {
        Self::new()
    }
}
