//! Shared test utilities for unit tests

use std::collections::VecDeque;
use std::time::Duration;

use image::RgbaImage;

use crate::error::{GenerateError, SurfaceError};
use crate::schedule::{FrameHandler, TaskId, TickHost};
use crate::session::{Button, EmulationCore, FrameSink, Player};
use crate::video::{Surface, Viewport};

// ============================================================================
// Test Host
// ============================================================================

/// Host that records registrations instead of running timers.
#[derive(Debug, Default)]
pub struct ManualHost {
    pub tick_requests: u32,
    pub tick_cancels: u32,
    pub tick_pending: bool,
    next_id: u64,
    /// Deferred tasks still registered, with their delay
    pub deferred: Vec<(TaskId, Duration)>,
    pub cancelled: Vec<TaskId>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every registered deferred task, in delay order.
    pub fn take_deferred(&mut self) -> Vec<TaskId> {
        let mut tasks = std::mem::take(&mut self.deferred);
        tasks.sort_by_key(|(_, delay)| *delay);
        tasks.into_iter().map(|(id, _)| id).collect()
    }

    pub fn deferred_delays(&self) -> Vec<Duration> {
        self.deferred.iter().map(|(_, delay)| *delay).collect()
    }
}

impl TickHost for ManualHost {
    fn request_tick(&mut self) {
        self.tick_requests += 1;
        self.tick_pending = true;
    }

    fn cancel_tick(&mut self) {
        self.tick_cancels += 1;
        self.tick_pending = false;
    }

    fn schedule_deferred(&mut self, delay: Duration) -> TaskId {
        self.next_id += 1;
        let id = TaskId::new(self.next_id);
        self.deferred.push((id, delay));
        id
    }

    fn cancel_deferred(&mut self, id: TaskId) {
        self.deferred.retain(|(pending, _)| *pending != id);
        self.cancelled.push(id);
    }
}

// ============================================================================
// Test Frame Handler
// ============================================================================

/// Handler counting calls, optionally failing on chosen generate calls.
#[derive(Debug, Default)]
pub struct CountingHandler {
    pub generated: u32,
    pub presented: u32,
    /// 1-based generate call numbers that should fail
    pub fail_on: Vec<u32>,
    calls: u32,
}

impl FrameHandler for CountingHandler {
    fn generate(&mut self) -> Result<(), GenerateError> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return Err(GenerateError::Core(format!("scripted fault {}", self.calls)));
        }
        self.generated += 1;
        Ok(())
    }

    fn present(&mut self) {
        self.presented += 1;
    }
}

// ============================================================================
// Test Emulation Core
// ============================================================================

/// Deterministic core: frame N fills the screen with pixel value N and emits
/// `samples_per_frame` pairs of value N.
#[derive(Debug)]
pub struct ScriptedCore {
    pub width: u32,
    pub height: u32,
    pub samples_per_frame: usize,
    pub frames: u32,
    pub sample_rate: Option<u32>,
    pub buttons: Vec<(Player, Button, bool)>,
    pub resets: u32,
    /// Results to return before falling back to success
    pub script: VecDeque<Result<(), GenerateError>>,
    pixels: Vec<u32>,
}

impl ScriptedCore {
    pub fn new(width: u32, height: u32, samples_per_frame: usize) -> Self {
        Self {
            width,
            height,
            samples_per_frame,
            frames: 0,
            sample_rate: None,
            buttons: Vec::new(),
            resets: 0,
            script: VecDeque::new(),
            pixels: vec![0; width as usize * height as usize],
        }
    }
}

impl EmulationCore for ScriptedCore {
    fn generate_frame(&mut self, sink: &mut dyn FrameSink) -> Result<(), GenerateError> {
        if let Some(Err(e)) = self.script.pop_front() {
            return Err(e);
        }
        self.frames += 1;
        let value = self.frames;
        self.pixels.fill(value);
        sink.video(&self.pixels);
        for _ in 0..self.samples_per_frame {
            sink.audio(value as f32, value as f32);
        }
        Ok(())
    }

    fn set_button_state(&mut self, player: Player, button: Button, pressed: bool) {
        self.buttons.push((player, button, pressed));
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = Some(rate);
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

// ============================================================================
// Test Surface
// ============================================================================

/// Surface keeping a copy of every presented frame.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub frames: Vec<RgbaImage>,
    pub viewports: Vec<Viewport>,
    /// Errors to return before accepting frames
    pub failures: VecDeque<SurfaceError>,
    pub attempts: u32,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: impl IntoIterator<Item = SurfaceError>) -> Self {
        Self {
            failures: failures.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn last(&self) -> Option<&RgbaImage> {
        self.frames.last()
    }
}

impl Surface for RecordingSurface {
    fn present(&mut self, frame: &RgbaImage, viewport: &Viewport) -> Result<(), SurfaceError> {
        self.attempts += 1;
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.frames.push(frame.clone());
        self.viewports.push(*viewport);
        Ok(())
    }
}
