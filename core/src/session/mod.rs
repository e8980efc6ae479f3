//! Emulation session
//!
//! Owns one emulation core together with the scheduler, audio pump and
//! presenter that keep it in sync with the host. The host drives it through
//! two callbacks: [`Session::on_tick`] from the display loop and
//! [`Session::request_block`] from the audio output.

mod emulation;


pub use emulation::{Button, EmulationCore, FrameSink, Player};

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::audio::{AudioPump, StereoFrame};
use crate::config::SyncConfig;
use crate::error::GenerateError;
use crate::schedule::{FrameHandler, FrameScheduler, TaskId, TickHost, TickOutcome};
use crate::video::{EffectPipeline, PixelPresenter, Surface, Viewport};

/// Session-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_generated: u64,
    pub frames_presented: u64,
    /// Frames skipped because the core failed
    pub frames_faulted: u64,
    pub catch_up_frames: u64,
    /// Frames generated to refill starved audio
    pub refill_frames: u64,
    /// Frames dropped by the catch-up cap
    pub frames_dropped: u64,
    pub audio_underruns: u64,
    pub audio_overruns: u64,
    /// Frames the surface refused
    pub surface_drops: u64,
}

/// Routes a frame's output into the presenter and the pump.
struct SessionSink<'a, S> {
    presenter: &'a mut PixelPresenter<S>,
    pump: &'a mut AudioPump,
}

impl<S: Surface> FrameSink for SessionSink<'_, S> {
    fn video(&mut self, pixels: &[u32]) {
        self.presenter.set_buffer(pixels);
    }

    fn audio(&mut self, left: f32, right: f32) {
        self.pump.enqueue(left, right);
    }
}

/// Frame handler over borrowed session parts, so the scheduler can be
/// driven while the session's other fields stay accessible.
struct SessionFrames<'a, C, S> {
    core: &'a mut C,
    presenter: &'a mut PixelPresenter<S>,
    pump: &'a mut AudioPump,
}

impl<C: EmulationCore, S: Surface> FrameHandler for SessionFrames<'_, C, S> {
    fn generate(&mut self) -> Result<(), GenerateError> {
        let mut sink = SessionSink {
            presenter: &mut *self.presenter,
            pump: &mut *self.pump,
        };
        self.core.generate_frame(&mut sink)
    }

    fn present(&mut self) {
        self.presenter.present();
    }
}

/// A running emulator wired to the host's display and audio callbacks.
#[derive(Debug)]
pub struct Session<C, S> {
    core: C,
    config: SyncConfig,
    scheduler: FrameScheduler,
    pump: AudioPump,
    presenter: PixelPresenter<S>,
    /// Expected pairs per frame at the pump's sample rate
    samples_per_frame: usize,
}

impl<C: EmulationCore, S: Surface> Session<C, S> {
    /// Build a session around `core`.
    ///
    /// `device_rate` is the negotiated audio output rate, `None` when there
    /// is no audio device. The core is told the rate it should synthesize at.
    pub fn new(mut core: C, config: SyncConfig, surface: Option<S>, device_rate: Option<u32>) -> Self {
        let pump = AudioPump::new(config.audio.clone(), device_rate);
        let effects = config
            .effects
            .enabled
            .then(|| EffectPipeline::new(&config.effects, config.video.width, config.video.height));
        let presenter = PixelPresenter::new(config.video.clone(), surface, effects);
        let scheduler = FrameScheduler::new(config.scheduler.clone());

        let sample_rate = pump.sample_rate();
        core.set_sample_rate(sample_rate);
        let samples_per_frame = expected_samples(sample_rate, config.scheduler.tick_rate);

        info!(
            "Session ready: {}x{} @ {}Hz, audio {}Hz (~{} pairs/frame), effects {}",
            config.video.width,
            config.video.height,
            config.scheduler.tick_rate,
            sample_rate,
            samples_per_frame,
            if presenter.effects_active() { "on" } else { "off" }
        );

        Self {
            core,
            config,
            scheduler,
            pump,
            presenter,
            samples_per_frame,
        }
    }

    pub fn start<H: TickHost + ?Sized>(&mut self, host: &mut H) {
        self.scheduler.start(host);
    }

    /// Stop all generation. No frame is generated, presented or caught up
    /// after this returns.
    pub fn stop<H: TickHost + ?Sized>(&mut self, host: &mut H) {
        self.scheduler.stop(host);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Display tick callback.
    pub fn on_tick<H: TickHost + ?Sized>(&mut self, timestamp: Duration, host: &mut H) -> TickOutcome {
        let mut frames = SessionFrames {
            core: &mut self.core,
            presenter: &mut self.presenter,
            pump: &mut self.pump,
        };
        self.scheduler.on_tick(timestamp, host, &mut frames)
    }

    /// Deferred catch-up task callback.
    pub fn on_deferred(&mut self, id: TaskId) -> bool {
        let mut frames = SessionFrames {
            core: &mut self.core,
            presenter: &mut self.presenter,
            pump: &mut self.pump,
        };
        self.scheduler.on_deferred(id, &mut frames)
    }

    /// Audio output callback: fill `out` with exactly `n` pairs.
    ///
    /// On underrun, extra frames are generated synchronously (never
    /// presented) until the deficit is covered or the catch-up cap is hit.
    /// Any remaining shortfall is silence.
    pub fn request_block(&mut self, n: usize, out: &mut Vec<StereoFrame>) {
        let Self {
            core,
            scheduler,
            pump,
            presenter,
            samples_per_frame,
            ..
        } = self;
        let max_frames = scheduler.config().max_catch_up.max(1) as usize;
        let samples_per_frame = *samples_per_frame;

        pump.request_block(n, out, |pump, deficit| {
            let frames = deficit.div_ceil(samples_per_frame).min(max_frames);
            let mut generated = 0;
            for _ in 0..frames {
                if pump.occupancy() >= n {
                    break;
                }
                let mut handler = SessionFrames {
                    core: &mut *core,
                    presenter: &mut *presenter,
                    pump: &mut *pump,
                };
                if !scheduler.generate_now(&mut handler) {
                    break;
                }
                generated += 1;
            }
            if generated > 0 {
                debug!(
                    "Audio underrun of {} pairs, generated {} extra frames",
                    deficit, generated
                );
            }
        });
    }

    /// Swap in a new core, returning the old one.
    ///
    /// Schedule state and buffered audio are discarded; a running session
    /// restarts and waits for a fresh baseline tick.
    pub fn load_program<H: TickHost + ?Sized>(&mut self, mut core: C, host: &mut H) -> C {
        let was_running = self.scheduler.is_running();
        self.scheduler.stop(host);

        core.set_sample_rate(self.pump.sample_rate());
        let old = std::mem::replace(&mut self.core, core);
        self.pump.reset();

        if was_running {
            self.scheduler.start(host);
        }
        info!("Program loaded");
        old
    }

    /// Power-cycle the current core, keeping the session running.
    pub fn reset<H: TickHost + ?Sized>(&mut self, host: &mut H) {
        let was_running = self.scheduler.is_running();
        self.scheduler.stop(host);
        self.core.reset();
        self.pump.reset();
        if was_running {
            self.scheduler.start(host);
        }
    }

    pub fn set_button_state(&mut self, player: Player, button: Button, pressed: bool) {
        self.core.set_button_state(player, button, pressed);
    }

    /// Container resize; returns the new placement.
    pub fn resize(&mut self, width: u32, height: u32) -> Viewport {
        self.presenter.resize(width, height)
    }

    /// Emit periodic audio diagnostics.
    pub fn log_metrics(&mut self, now: Instant) -> bool {
        self.pump.log_metrics(now)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn pump(&self) -> &AudioPump {
        &self.pump
    }

    pub fn presenter(&self) -> &PixelPresenter<S> {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut PixelPresenter<S> {
        &mut self.presenter
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut C {
        &mut self.core
    }

    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    pub fn stats(&self) -> SessionStats {
        let sched = self.scheduler.stats();
        let audio = self.pump.metrics();
        SessionStats {
            frames_generated: sched.frames_generated,
            frames_presented: sched.frames_presented,
            frames_faulted: sched.frames_faulted,
            catch_up_frames: sched.catch_up_frames,
            refill_frames: sched.refill_frames,
            frames_dropped: sched.frames_dropped,
            audio_underruns: audio.underruns,
            audio_overruns: audio.overruns,
            surface_drops: self.presenter.frames_dropped(),
        }
    }
}

fn expected_samples(sample_rate: u32, tick_rate: u32) -> usize {
    (sample_rate as usize).div_ceil(tick_rate.max(1) as usize).max(1)
}
