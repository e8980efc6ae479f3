//! Contract with the emulation core

use crate::error::GenerateError;

/// Controller port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

/// Standard pad buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];
}

/// Receives the output of one generated frame.
pub trait FrameSink {
    /// One full frame of `0x00BBGGRR` pixels, row-major.
    fn video(&mut self, pixels: &[u32]);

    /// One stereo sample pair.
    fn audio(&mut self, left: f32, right: f32);
}

/// The emulator being driven.
///
/// Decoding programs, input mapping and everything else about the emulated
/// machine stays on the implementor's side.
pub trait EmulationCore {
    /// Advance exactly one logical frame.
    ///
    /// Implementations call `sink.video` once with the finished frame and
    /// `sink.audio` for every sample synthesized during it.
    fn generate_frame(&mut self, sink: &mut dyn FrameSink) -> Result<(), GenerateError>;

    /// Edge-triggered input.
    fn set_button_state(&mut self, player: Player, button: Button, pressed: bool);

    /// Rate the core should synthesize audio at.
    fn set_sample_rate(&mut self, _rate: u32) {}

    /// Return to power-on state.
    fn reset(&mut self) {}
}
