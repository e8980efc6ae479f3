//! Video presentation
//!
//! ```text
//! core pixels (0x00BBGGRR) ──set_buffer──► presentation buffer (RGBA8)
//!                                              │ present
//!                                              ▼
//!                         [effect pipeline] ─► Surface (viewport)
//! ```
//!
//! The effect pipeline is optional. Without it, or after the surface is lost
//! while presenting effect frames, the buffer is blitted unprocessed at the
//! native aspect ratio.

mod effects;
mod presenter;
mod viewport;


pub use effects::{EffectPipeline, EffectStage};
pub use presenter::{PixelPresenter, Surface};
pub use viewport::Viewport;
