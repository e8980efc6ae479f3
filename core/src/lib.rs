//! Retrosync Core - Audio/video synchronization for emulator frontends
//!
//! Drives an emulation core at a stable logical frame rate against whatever
//! cadence the host display and audio device run at.
//!
//! # Architecture
//!
//! - [`FrameScheduler`] - Paces frame generation against host ticks with bounded catch-up
//! - [`AudioPump`] - Ring-buffered bridge from per-sample production to block consumption
//! - [`PixelPresenter`] - Native frame buffer to displayable image, with CRT effects
//! - [`Session`] - Owns one core and wires the three together

pub mod audio;
pub mod config;
pub mod error;
pub mod schedule;
pub mod session;
#[cfg(test)]
mod test_utils;
pub mod video;

pub use audio::{AudioPump, PumpMetrics, SampleRing, StereoFrame};
pub use config::{AudioConfig, EffectConfig, SchedulerConfig, SyncConfig, VideoConfig};
pub use error::{ConfigError, GenerateError, SurfaceError};
pub use schedule::{
    Callbacks, FrameHandler, FrameScheduler, SchedulerStats, TaskId, TickHost, TickOutcome,
};
pub use session::{Button, EmulationCore, FrameSink, Player, Session, SessionStats};
pub use video::{EffectPipeline, EffectStage, PixelPresenter, Surface, Viewport};
