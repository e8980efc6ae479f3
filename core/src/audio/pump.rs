//! Audio pump: per-sample production in, per-block consumption out

use std::time::Instant;

use tracing::{debug, info};

use super::metrics::PumpMetrics;
use super::ring::{SampleRing, StereoFrame};
use crate::config::AudioConfig;

/// Bridges the emulation core's sample callback and the host's block callback.
///
/// `enqueue` runs in the generation context, `request_block` in the audio
/// consumption context. Both are cooperative callbacks on the same thread, so
/// the ring is only ever touched through `&mut self` and every read is a
/// whole-block transfer.
#[derive(Debug)]
pub struct AudioPump {
    ring: SampleRing,
    config: AudioConfig,
    /// Negotiated device rate, `None` when no audio output exists
    device_rate: Option<u32>,
    metrics: PumpMetrics,
}

impl AudioPump {
    /// Create a pump for the given device sample rate.
    ///
    /// Pass `None` when no audio output is available; the pump then reports
    /// the fallback rate and is inert.
    pub fn new(config: AudioConfig, device_rate: Option<u32>) -> Self {
        match device_rate {
            Some(rate) => info!(
                "Audio pump ready at {}Hz ({} pair ring, high-water {}, evict batch {})",
                rate,
                config.capacity_pairs,
                config.high_water(),
                config.evict_batch()
            ),
            None => info!(
                "No audio output, pump inert at fallback {}Hz",
                config.fallback_sample_rate
            ),
        }

        Self {
            ring: SampleRing::new(config.capacity_pairs),
            config,
            device_rate,
            metrics: PumpMetrics::new(),
        }
    }

    /// Sample rate the emulation core should synthesize at.
    pub fn sample_rate(&self) -> u32 {
        self.device_rate.unwrap_or(self.config.fallback_sample_rate)
    }

    /// Whether there is no audio device behind this pump
    pub fn is_inert(&self) -> bool {
        self.device_rate.is_none()
    }

    pub fn occupancy(&self) -> usize {
        self.ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PumpMetrics {
        &self.metrics
    }

    /// Buffered pairs, oldest first
    pub fn buffered(&self) -> impl Iterator<Item = &StereoFrame> {
        self.ring.iter()
    }

    /// Append one stereo pair.
    ///
    /// At the high-water mark a fixed batch of the oldest pairs is dropped
    /// first, which caps end-to-end latency at `high_water / sample_rate`.
    pub fn enqueue(&mut self, left: f32, right: f32) {
        let high_water = self.config.high_water().min(self.ring.capacity());
        if self.ring.len() >= high_water {
            let evicted = self.ring.evict_oldest(self.config.evict_batch());
            self.metrics.record_overrun(evicted);
        }

        // The eviction above guarantees room; a failed push here would mean a
        // zero batch, which config validation rules out.
        if self.ring.push(StereoFrame::new(left, right)) {
            self.metrics.pairs_enqueued += 1;
        }
        self.metrics.record_fill(self.ring.len());
    }

    /// Fill `out` with exactly `n` pairs.
    ///
    /// When fewer than `n` pairs are buffered, `refill` is called once with
    /// the pump and the missing pair count; it should synchronously produce
    /// more samples through [`enqueue`](Self::enqueue). Whatever is still
    /// missing afterwards is padded with silence.
    pub fn request_block<F>(&mut self, n: usize, out: &mut Vec<StereoFrame>, refill: F)
    where
        F: FnOnce(&mut Self, usize),
    {
        out.clear();
        out.resize(n, StereoFrame::SILENCE);

        let available = self.ring.len();
        if available < n {
            self.metrics.refills += 1;
            refill(self, n - available);
        }

        self.take_block(out);
    }

    /// Fill `out` with exactly `n` pairs without attempting recovery.
    pub fn request_block_silent(&mut self, n: usize, out: &mut Vec<StereoFrame>) {
        out.clear();
        out.resize(n, StereoFrame::SILENCE);
        self.take_block(out);
    }

    fn take_block(&mut self, out: &mut [StereoFrame]) {
        let n = out.len();
        let real = self.ring.pop_into(out);
        self.metrics.record_fill(self.ring.len());

        if real < n {
            let silence = n - real;
            self.metrics.record_underrun(silence);
            // An empty ring usually means audio just stopped
            if real > 0 {
                debug!("Buffer underrun (needed {}, got {})", n, real);
            }
        }
    }

    /// Discard buffered audio (program reload or output restart).
    ///
    /// The ring is reallocated rather than drained.
    pub fn reset(&mut self) {
        self.ring = SampleRing::new(self.config.capacity_pairs);
    }

    /// Replace the buffering parameters, reallocating the ring.
    pub fn reconfigure(&mut self, config: AudioConfig) {
        self.ring = SampleRing::new(config.capacity_pairs);
        self.config = config;
    }

    /// Emit the periodic diagnostic summary.
    pub fn log_metrics(&mut self, now: Instant) -> bool {
        let capacity = self.ring.capacity();
        self.metrics.maybe_log(now, capacity)
    }
}
