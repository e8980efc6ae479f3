//! Retrosync Player - Reference frontend for the synchronization core
//!
//! Drives the synthetic demo core through a [`Session`] on a simulated
//! display loop, feeding the default audio device and a headless surface.
//!
//! # Usage
//!
//! ```bash
//! # Ten seconds at 60Hz with audio and CRT effects
//! retrosync-player
//!
//! # A 144Hz display, no audio, saving the last frame
//! retrosync-player --refresh 144 --no-audio --snapshot frame.png
//! ```

mod audio_output;
mod config;
mod demo;
mod host;
mod surface;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use audio_output::AudioOutput;
use demo::DemoCore;
use host::LoopHost;
use retrosync_core::{Button, EmulationCore, Player, Session, StereoFrame, Surface, SyncConfig};
use surface::HeadlessSurface;

/// Container the headless surface pretends to fill
const CONTAINER: (u32, u32) = (1280, 960);

/// Retrosync Player - run the demo core through the sync layer
#[derive(Parser, Debug)]
#[command(name = "retrosync-player")]
#[command(about = "Run a synthetic emulation core through the retrosync sync layer")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// How long to run, in seconds
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// Simulated display refresh rate in Hz
    #[arg(long, default_value_t = 60)]
    refresh: u32,

    /// Run without opening an audio device
    #[arg(long)]
    no_audio: bool,

    /// Disable the CRT effect pipeline
    #[arg(long)]
    no_effects: bool,

    /// Write the last presented frame to this PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// Where requested audio blocks go.
enum AudioFeed {
    /// Real device behind a hand-off ring
    Device(AudioOutput),
    /// No device: blocks are requested on the wall clock and discarded
    Virtual { sample_rate: u32, consumed: u64 },
}

impl AudioFeed {
    /// Request as many blocks as the consumer can take right now.
    fn service<C, S>(
        &mut self,
        session: &mut Session<C, S>,
        elapsed: Duration,
        block_pairs: usize,
        block: &mut Vec<StereoFrame>,
    ) where
        C: EmulationCore,
        S: Surface,
    {
        match self {
            AudioFeed::Device(output) => {
                while output.vacant_pairs() >= block_pairs {
                    session.request_block(block_pairs, block);
                    output.push_block(block);
                }
            }
            AudioFeed::Virtual {
                sample_rate,
                consumed,
            } => {
                let due = (elapsed.as_secs_f64() * f64::from(*sample_rate)) as u64;
                while *consumed + block_pairs as u64 <= due {
                    session.request_block(block_pairs, block);
                    *consumed += block_pairs as u64;
                }
            }
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    if args.no_effects {
        config.effects.enabled = false;
    }

    run(&args, config)
}

fn run(args: &Args, config: SyncConfig) -> Result<()> {
    let output = if args.no_audio {
        None
    } else {
        match AudioOutput::new() {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Audio unavailable, running silent: {}", e);
                None
            }
        }
    };

    let block_pairs = config.audio.block_pairs.max(1);
    let core = DemoCore::new(
        config.video.width,
        config.video.height,
        config.scheduler.tick_rate,
    );
    let device_rate = output.as_ref().map(AudioOutput::sample_rate);
    let mut session = Session::new(core, config, Some(HeadlessSurface::new()), device_rate);
    session.resize(CONTAINER.0, CONTAINER.1);

    let mut feed = match output {
        Some(output) => AudioFeed::Device(output),
        None => AudioFeed::Virtual {
            sample_rate: session.pump().sample_rate(),
            consumed: 0,
        },
    };

    let run_time = Duration::from_secs_f64(args.seconds.max(0.0));
    let mut host = LoopHost::new(args.refresh);
    let mut block = Vec::with_capacity(block_pairs);
    let mut input = DemoInput::new(run_time);

    info!(
        "Running demo core for {:.1}s on a {}Hz display",
        run_time.as_secs_f64(),
        args.refresh
    );

    let start = Instant::now();
    session.start(&mut host);

    loop {
        let elapsed = start.elapsed();
        if elapsed >= run_time {
            break;
        }
        host.advance_to(elapsed);

        input.apply(elapsed, &mut session);

        if host.take_tick() {
            let now = host.now();
            session.on_tick(now, &mut host);
        }
        for id in host.take_due() {
            session.on_deferred(id);
        }
        feed.service(&mut session, elapsed, block_pairs, &mut block);
        session.log_metrics(Instant::now());

        // Sleep until the next tick or deferred task, whichever is first
        let deadline = host
            .next_deadline()
            .unwrap_or(elapsed + host.refresh_interval());
        let wait = deadline
            .saturating_sub(start.elapsed())
            .min(host.refresh_interval());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    session.stop(&mut host);
    debug_assert_eq!(host.pending_tasks(), 0);

    let stats = session.stats();
    info!(
        "Generated {} frames ({} presented, {} catch-up, {} audio refills, {} faulted, {} dropped)",
        stats.frames_generated,
        stats.frames_presented,
        stats.catch_up_frames,
        stats.refill_frames,
        stats.frames_faulted,
        stats.frames_dropped
    );
    info!(
        "Audio: {} underruns, {} overruns",
        stats.audio_underruns, stats.audio_overruns
    );

    if let Some(surface) = session.presenter().surface() {
        info!(
            "Demo core reached frame {}, surface showed {} frames at {:?}",
            session.core().frame_count(),
            surface.presented(),
            surface.viewport()
        );
        if let Some(path) = &args.snapshot {
            surface.save_snapshot(path)?;
        }
    }

    Ok(())
}

/// Scripted input so the demo shows button forwarding: hold A through the
/// middle third of the run, Right through the last third.
struct DemoInput {
    run_time: Duration,
    phase: u8,
}

impl DemoInput {
    fn new(run_time: Duration) -> Self {
        Self { run_time, phase: 0 }
    }

    fn apply<C: EmulationCore, S: Surface>(&mut self, elapsed: Duration, session: &mut Session<C, S>) {
        let phase = if elapsed < self.run_time / 3 {
            0
        } else if elapsed < self.run_time * 2 / 3 {
            1
        } else {
            2
        };
        if phase == self.phase {
            return;
        }
        self.phase = phase;

        match phase {
            1 => session.set_button_state(Player::One, Button::A, true),
            _ => {
                session.set_button_state(Player::One, Button::A, false);
                session.set_button_state(Player::One, Button::Right, true);
            }
        }
    }
}
