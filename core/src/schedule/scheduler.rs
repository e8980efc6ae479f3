//! Frame pacing against host ticks

use std::time::Duration;

use tracing::{debug, warn};

use super::host::{FrameHandler, TaskId, TickHost};
use crate::config::SchedulerConfig;

/// What a single host tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The scheduler is stopped; the tick was ignored
    Stopped,
    /// First tick after start: baseline recorded, nothing generated
    Baseline,
    /// No frame was due
    Idle,
    /// One frame generated (and presented unless it faulted), plus
    /// `deferred` generate-only catch-up frames scheduled
    Generated { frames_due: u32, deferred: u32 },
}

/// Frame and fault counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Frames generated successfully, by any path
    pub frames_generated: u64,
    /// Frames handed to `present`
    pub frames_presented: u64,
    /// Frames skipped because generation failed
    pub frames_faulted: u64,
    /// Deferred catch-up frames that ran
    pub catch_up_frames: u64,
    /// Frames generated outside the tick cadence (audio underrun refills)
    pub refill_frames: u64,
    /// Frames dropped by the catch-up cap
    pub frames_dropped: u64,
}

/// Drives generation at a stable logical rate regardless of host cadence.
///
/// The scheduler owns no buffers. Each tick it works out how many logical
/// frames are due, generates and presents one of them immediately, and spreads
/// the rest as generate-only deferred tasks before the next expected tick.
#[derive(Debug)]
pub struct FrameScheduler {
    config: SchedulerConfig,
    interval: Duration,
    running: bool,
    /// Tick timestamp aligned to a frame boundary; `None` awaits a baseline
    last_aligned: Option<Duration>,
    /// How far past its frame boundary the baseline tick landed
    baseline_excess: Duration,
    /// Raw timestamp of the previous tick, for detecting a regressed clock
    last_tick: Option<Duration>,
    /// Deferred catch-up tasks registered and not yet fired
    pending: Vec<TaskId>,
    stats: SchedulerStats,
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let interval = config.interval();
        Self {
            config,
            interval,
            running: false,
            last_aligned: None,
            baseline_excess: Duration::ZERO,
            last_tick: None,
            pending: Vec::new(),
            stats: SchedulerStats::default(),
        }
    }

    /// Duration of one logical frame
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Aligned timestamp of the last accounted frame, `None` before a baseline
    pub fn last_aligned(&self) -> Option<Duration> {
        self.last_aligned
    }

    /// Deferred catch-up tasks still waiting to fire
    pub fn pending_deferred(&self) -> &[TaskId] {
        &self.pending
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Begin tick scheduling. Does nothing if already running.
    ///
    /// Never generates a frame; the first tick only records a baseline.
    pub fn start<H: TickHost + ?Sized>(&mut self, host: &mut H) {
        if self.running {
            return;
        }
        self.running = true;
        self.clear_baseline();
        host.request_tick();
        debug!("Frame scheduler started ({:?} interval)", self.interval);
    }

    /// Cancel all scheduling, including queued catch-up tasks.
    ///
    /// Safe to call in any state. Once this returns no tick or deferred task
    /// can generate or present anything until the next `start`.
    pub fn stop<H: TickHost + ?Sized>(&mut self, host: &mut H) {
        if self.running {
            host.cancel_tick();
            debug!(
                "Frame scheduler stopped ({} deferred tasks revoked)",
                self.pending.len()
            );
        }
        for id in self.pending.drain(..) {
            host.cancel_deferred(id);
        }
        self.running = false;
        self.clear_baseline();
    }

    /// Handle one host tick delivered at `timestamp`.
    pub fn on_tick<H, F>(&mut self, timestamp: Duration, host: &mut H, handler: &mut F) -> TickOutcome
    where
        H: TickHost + ?Sized,
        F: FrameHandler + ?Sized,
    {
        if !self.running {
            return TickOutcome::Stopped;
        }

        // Scheduling is self-perpetuating
        host.request_tick();

        let aligned = align_down(timestamp, self.interval);
        let Some(last) = self.last_aligned else {
            self.set_baseline(timestamp, aligned);
            return TickOutcome::Baseline;
        };

        if self.last_tick.is_some_and(|previous| timestamp < previous) {
            debug!("Host clock went backwards, re-baselining at {:?}", timestamp);
            self.set_baseline(timestamp, aligned);
            return TickOutcome::Idle;
        }
        self.last_tick = Some(timestamp);

        let mut frames_due = self.frames_due(timestamp, last);
        if frames_due == 0 {
            return TickOutcome::Idle;
        }

        let max = self.config.max_catch_up.max(1);
        let rebaseline = frames_due > max;
        if rebaseline {
            warn!(
                "{} frames due in one tick, capping at {} and dropping the backlog",
                frames_due, max
            );
            self.stats.frames_dropped += u64::from(frames_due - max);
            frames_due = max;
        }

        // The frame the user sees this tick
        if self.generate(handler) {
            handler.present();
            self.stats.frames_presented += 1;
        }

        // Spread the remaining frames evenly before the next expected tick
        let excess = timestamp.saturating_sub(aligned);
        let time_to_next = self.interval.saturating_sub(excess);
        for i in 1..frames_due {
            let delay = time_to_next * i / frames_due;
            let id = host.schedule_deferred(delay);
            self.pending.push(id);
        }
        if frames_due > 1 {
            debug!("Scheduled {} catch-up frames", frames_due - 1);
        }

        if rebaseline {
            self.set_baseline(timestamp, aligned);
        } else {
            self.last_aligned = Some(last + self.interval * frames_due);
        }

        TickOutcome::Generated {
            frames_due,
            deferred: frames_due - 1,
        }
    }

    /// Handle a deferred catch-up task firing.
    ///
    /// Generates one frame without presenting it. Returns false, generating
    /// nothing, if `id` was revoked or never issued by this scheduler.
    pub fn on_deferred<F: FrameHandler + ?Sized>(&mut self, id: TaskId, handler: &mut F) -> bool {
        let Some(pos) = self.pending.iter().position(|pending| *pending == id) else {
            return false;
        };
        self.pending.swap_remove(pos);

        if self.generate(handler) {
            self.stats.catch_up_frames += 1;
        }
        true
    }

    /// Generate one frame synchronously outside the tick cadence.
    ///
    /// Used by audio underrun recovery. Schedule state is untouched. Returns
    /// false when stopped or when generation failed.
    pub fn generate_now<F: FrameHandler + ?Sized>(&mut self, handler: &mut F) -> bool {
        if !self.running {
            return false;
        }
        let generated = self.generate(handler);
        if generated {
            self.stats.refill_frames += 1;
        }
        generated
    }

    fn generate<F: FrameHandler + ?Sized>(&mut self, handler: &mut F) -> bool {
        match handler.generate() {
            Ok(()) => {
                self.stats.frames_generated += 1;
                true
            }
            Err(e) => {
                warn!("Frame generation failed, skipping frame: {}", e);
                self.stats.frames_faulted += 1;
                false
            }
        }
    }

    fn set_baseline(&mut self, timestamp: Duration, aligned: Duration) {
        self.last_aligned = Some(aligned);
        self.baseline_excess = timestamp - aligned;
        self.last_tick = Some(timestamp);
    }

    fn clear_baseline(&mut self) {
        self.last_aligned = None;
        self.baseline_excess = Duration::ZERO;
        self.last_tick = None;
    }

    /// `round((timestamp - last - baseline_excess) / interval)`, zero while the
    /// tick is still short of the next frame slot
    fn frames_due(&self, timestamp: Duration, last: Duration) -> u32 {
        let interval_ns = self.interval.as_nanos().max(1);
        let Some(elapsed) = timestamp
            .checked_sub(last)
            .and_then(|since| since.checked_sub(self.baseline_excess))
        else {
            return 0;
        };
        let frames = (elapsed.as_nanos() + interval_ns / 2) / interval_ns;
        u32::try_from(frames).unwrap_or(u32::MAX)
    }
}

/// Align `timestamp` down to a multiple of `interval`.
pub(crate) fn align_down(timestamp: Duration, interval: Duration) -> Duration {
    let interval_ns = interval.as_nanos().max(1);
    let ts_ns = timestamp.as_nanos();
    Duration::from_nanos((ts_ns - ts_ns % interval_ns) as u64)
}
