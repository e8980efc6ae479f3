//! Audio buffering
//!
//! The emulation core produces one stereo pair at a time while the host audio
//! device consumes fixed-size blocks on its own clock. The pump sits between
//! the two:
//!
//! ```text
//! Tick context                  AudioPump                  Audio context
//!     │                             │                            │
//! [generate frame]                  │                            │
//!     │──enqueue(l, r)──────────►[ring]                          │
//!     │                             │◄──────request_block(n)─────│
//!     │◄────refill(deficit)─────────│  (only when starved)       │
//!     │──enqueue(l, r)──────────►[ring]                          │
//!     │                             │─────n pairs (+ silence)───►│
//! ```
//!
//! Overflow drops the oldest pairs in fixed batches; starvation first tries a
//! synchronous refill and then pads with silence, so the consumer always gets
//! exactly the block it asked for.

mod metrics;
mod pump;
mod ring;

#[cfg(test)]
mod tests;

pub use metrics::PumpMetrics;
pub use pump::AudioPump;
pub use ring::{SampleRing, StereoFrame};
