//! Real-time host loop
//!
//! Stands in for a browser-style display callback: a fixed-rate tick plus
//! one-shot deferred tasks, all run to completion on the main thread.

use std::time::Duration;

use retrosync_core::{TaskId, TickHost};

/// Tick and deferred-task bookkeeping for the player's main loop.
///
/// Time is the loop's elapsed time since start, supplied by the caller, so
/// the queue itself never reads a clock.
#[derive(Debug)]
pub struct LoopHost {
    refresh: Duration,
    now: Duration,
    tick_requested: bool,
    next_tick: Duration,
    next_id: u64,
    /// Pending deferred tasks with their due time
    deferred: Vec<(Duration, TaskId)>,
}

impl LoopHost {
    /// Host delivering display ticks at `refresh_hz`.
    pub fn new(refresh_hz: u32) -> Self {
        let refresh = Duration::from_nanos(1_000_000_000 / u64::from(refresh_hz.max(1)));
        Self {
            refresh,
            now: Duration::ZERO,
            tick_requested: false,
            next_tick: Duration::ZERO,
            next_id: 0,
            deferred: Vec::new(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh
    }

    /// Move the loop clock forward. Time never runs backwards.
    pub fn advance_to(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Consume the pending tick if it is due.
    pub fn take_tick(&mut self) -> bool {
        if !self.tick_requested || self.now < self.next_tick {
            return false;
        }
        self.tick_requested = false;
        // Stay phase-locked to the refresh grid, skipping missed vsyncs
        while self.next_tick <= self.now {
            self.next_tick += self.refresh;
        }
        true
    }

    /// Remove and return every deferred task due by now, earliest first.
    pub fn take_due(&mut self) -> Vec<TaskId> {
        let now = self.now;
        let mut due: Vec<(Duration, TaskId)> = Vec::new();
        self.deferred.retain(|&(at, id)| {
            if at <= now {
                due.push((at, id));
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Earliest moment something needs the loop's attention
    pub fn next_deadline(&self) -> Option<Duration> {
        let tick = self.tick_requested.then_some(self.next_tick);
        let task = self.deferred.iter().map(|(at, _)| *at).min();
        match (tick, task) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }
}

impl TickHost for LoopHost {
    fn request_tick(&mut self) {
        self.tick_requested = true;
    }

    fn cancel_tick(&mut self) {
        self.tick_requested = false;
    }

    fn schedule_deferred(&mut self, delay: Duration) -> TaskId {
        self.next_id += 1;
        let id = TaskId::new(self.next_id);
        self.deferred.push((self.now + delay, id));
        id
    }

    fn cancel_deferred(&mut self, id: TaskId) {
        self.deferred.retain(|(_, pending)| *pending != id);
    }
}
