//! Host callback registration and frame callbacks

use std::time::Duration;

use crate::error::GenerateError;

/// Handle for a deferred task registered with a [`TickHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Callback registration provided by the host environment.
///
/// The display tick is self-perpetuating: the scheduler re-registers it at
/// the start of every tick. Deferred tasks fire once, after `delay`, and are
/// delivered back through [`FrameScheduler::on_deferred`].
///
/// [`FrameScheduler::on_deferred`]: super::FrameScheduler::on_deferred
pub trait TickHost {
    /// Register the next display-synchronized tick.
    fn request_tick(&mut self);

    /// Revoke the pending display tick, if any.
    fn cancel_tick(&mut self);

    /// Register a one-shot task to fire after `delay`.
    fn schedule_deferred(&mut self, delay: Duration) -> TaskId;

    /// Revoke a deferred task. Unknown or already-fired ids are ignored.
    fn cancel_deferred(&mut self, id: TaskId);
}

/// The caller-supplied generate / present pair.
pub trait FrameHandler {
    /// Advance emulation by exactly one logical frame.
    fn generate(&mut self) -> Result<(), GenerateError>;

    /// Show the most recently generated frame.
    fn present(&mut self);
}

/// [`FrameHandler`] built from two closures.
pub struct Callbacks<G, P> {
    pub generate: G,
    pub present: P,
}

impl<G, P> FrameHandler for Callbacks<G, P>
where
    G: FnMut() -> Result<(), GenerateError>,
    P: FnMut(),
{
    fn generate(&mut self) -> Result<(), GenerateError> {
        (self.generate)()
    }

    fn present(&mut self) {
        (self.present)()
    }
}
