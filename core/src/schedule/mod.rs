//! Frame scheduling
//!
//! Paces logical frame generation against host ticks with bounded catch-up.
//! The host supplies timestamps and callback registration through
//! [`TickHost`], so the scheduler runs identically against a real display
//! loop or a synthetic clock in tests.

mod host;
mod scheduler;


pub use host::{Callbacks, FrameHandler, TaskId, TickHost};
pub use scheduler::{FrameScheduler, SchedulerStats, TickOutcome};
