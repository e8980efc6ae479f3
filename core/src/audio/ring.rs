//! Fixed-capacity stereo sample ring

use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer},
};

/// One interleaved stereo sample pair, normalized to `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    /// Zero-valued pair.
    pub const SILENCE: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Circular store of stereo pairs with O(1) occupancy.
///
/// The ring is kept unsplit so a single owner can both append and evict from
/// the read side. Reads and evictions always remove the oldest pairs first.
pub struct SampleRing {
    rb: HeapRb<StereoFrame>,
}

impl SampleRing {
    /// Allocate a ring holding `capacity` pairs (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            rb: HeapRb::new(capacity.max(1)),
        }
    }

    /// Capacity in pairs
    pub fn capacity(&self) -> usize {
        self.rb.capacity().get()
    }

    /// Occupancy in pairs
    pub fn len(&self) -> usize {
        self.rb.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.rb.is_empty()
    }

    /// Free slots in pairs
    pub fn vacant(&self) -> usize {
        self.rb.vacant_len()
    }

    /// Append one pair. Returns false if the ring is full.
    pub fn push(&mut self, frame: StereoFrame) -> bool {
        self.rb.try_push(frame).is_ok()
    }

    /// Drop up to `count` of the oldest pairs, returning how many were dropped.
    pub fn evict_oldest(&mut self, count: usize) -> usize {
        self.rb.skip(count)
    }

    /// Move the oldest pairs into `out` as one block.
    ///
    /// Returns the number of pairs written; the rest of `out` is untouched.
    pub fn pop_into(&mut self, out: &mut [StereoFrame]) -> usize {
        self.rb.pop_slice(out)
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.rb.clear();
    }

    /// Iterate oldest-first without consuming.
    pub fn iter(&self) -> impl Iterator<Item = &StereoFrame> {
        self.rb.iter()
    }
}

impl std::fmt::Debug for SampleRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRing")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
