//! Synthetic demo core: scrolling color bars and a sine tone

use std::collections::HashSet;
use std::f32::consts::TAU;

use retrosync_core::{Button, EmulationCore, FrameSink, GenerateError, Player};

/// SMPTE-ish bar colors in `0x00BBGGRR`
const BARS: [u32; 8] = [
    0x00c0_c0c0, // gray
    0x0000_c0c0, // yellow
    0x00c0_c000, // cyan
    0x0000_c000, // green
    0x00c0_00c0, // magenta
    0x0000_00c0, // red
    0x00c0_0000, // blue
    0x0010_1010, // black
];

const TONE_HZ: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 0.2;

/// Emulation core stand-in that needs no program.
///
/// Holding Left/Right on player one reverses or speeds up the scroll;
/// holding A raises the tone an octave.
#[derive(Debug)]
pub struct DemoCore {
    width: u32,
    height: u32,
    frame_rate: u32,
    sample_rate: u32,
    frame: u64,
    /// Total pairs emitted, for exact per-frame sample counts
    samples_emitted: u64,
    scroll: i64,
    phase: f32,
    held: HashSet<Button>,
    pixels: Vec<u32>,
}

impl DemoCore {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate: frame_rate.max(1),
            sample_rate: 44_100,
            frame: 0,
            samples_emitted: 0,
            scroll: 0,
            phase: 0.0,
            held: HashSet::new(),
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    fn scroll_step(&self) -> i64 {
        match (self.held.contains(&Button::Left), self.held.contains(&Button::Right)) {
            (true, false) => -1,
            (false, true) => 4,
            _ => 1,
        }
    }

    fn draw(&mut self) {
        let width = i64::from(self.width.max(1));
        let bar_width = (width / BARS.len() as i64).max(1);
        for (y, row) in self.pixels.chunks_exact_mut(self.width as usize).enumerate() {
            // Darker band across the bottom quarter
            let dim = y as u32 >= self.height * 3 / 4;
            for (x, px) in row.iter_mut().enumerate() {
                let pos = (x as i64 + self.scroll).rem_euclid(width);
                let bar = ((pos / bar_width) as usize).min(BARS.len() - 1);
                *px = if dim { (BARS[bar] >> 1) & 0x007f_7f7f } else { BARS[bar] };
            }
        }
    }

    fn synthesize(&mut self, sink: &mut dyn FrameSink) {
        let rate = u64::from(self.sample_rate);
        let target = (self.frame + 1) * rate / u64::from(self.frame_rate);
        let count = target.saturating_sub(self.samples_emitted);

        let freq = if self.held.contains(&Button::A) {
            TONE_HZ * 2.0
        } else {
            TONE_HZ
        };
        let step = TAU * freq / self.sample_rate as f32;

        for _ in 0..count {
            let sample = self.phase.sin() * TONE_AMPLITUDE;
            sink.audio(sample, sample);
            self.phase = (self.phase + step) % TAU;
        }
        self.samples_emitted = target;
    }
}

impl EmulationCore for DemoCore {
    fn generate_frame(&mut self, sink: &mut dyn FrameSink) -> Result<(), GenerateError> {
        self.draw();
        sink.video(&self.pixels);
        self.synthesize(sink);

        self.scroll += self.scroll_step();
        self.frame += 1;
        Ok(())
    }

    fn set_button_state(&mut self, player: Player, button: Button, pressed: bool) {
        if player != Player::One {
            return;
        }
        if pressed {
            self.held.insert(button);
        } else {
            self.held.remove(&button);
        }
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate.max(1);
        // Restart the sample clock at the current frame
        self.samples_emitted = self.frame * u64::from(self.sample_rate) / u64::from(self.frame_rate);
    }

    fn reset(&mut self) {
        self.frame = 0;
        self.samples_emitted = 0;
        self.scroll = 0;
        self.phase = 0.0;
        self.held.clear();
    }
}
