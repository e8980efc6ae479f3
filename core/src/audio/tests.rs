//! Audio ring and pump tests

use std::time::{Duration, Instant};

use super::{AudioPump, SampleRing, StereoFrame};
use crate::config::AudioConfig;

fn pump_with_capacity(capacity: usize) -> AudioPump {
    AudioPump::new(AudioConfig::with_capacity(capacity), Some(48_000))
}

fn enqueue_sequence(pump: &mut AudioPump, range: std::ops::Range<u32>) {
    for i in range {
        pump.enqueue(i as f32, -(i as f32));
    }
}

// ============================================================================
// SampleRing Tests
// ============================================================================

#[test]
fn test_ring_starts_empty() {
    let ring = SampleRing::new(16);
    assert_eq!(ring.capacity(), 16);
    assert_eq!(ring.len(), 0);
    assert!(ring.is_empty());
    assert_eq!(ring.vacant(), 16);
}

#[test]
fn test_ring_zero_capacity_is_clamped() {
    let ring = SampleRing::new(0);
    assert_eq!(ring.capacity(), 1);
}

#[test]
fn test_ring_push_rejects_when_full() {
    let mut ring = SampleRing::new(2);
    assert!(ring.push(StereoFrame::new(0.1, 0.1)));
    assert!(ring.push(StereoFrame::new(0.2, 0.2)));
    assert!(!ring.push(StereoFrame::new(0.3, 0.3)));
    assert_eq!(ring.len(), 2);
}

#[test]
fn test_ring_evicts_oldest_first() {
    let mut ring = SampleRing::new(8);
    for i in 0..6 {
        ring.push(StereoFrame::new(i as f32, 0.0));
    }

    assert_eq!(ring.evict_oldest(4), 4);
    let left: Vec<f32> = ring.iter().map(|f| f.left).collect();
    assert_eq!(left, vec![4.0, 5.0]);

    // Evicting more than buffered only drops what is there
    assert_eq!(ring.evict_oldest(10), 2);
    assert!(ring.is_empty());
}

#[test]
fn test_ring_pop_into_transfers_block() {
    let mut ring = SampleRing::new(8);
    for i in 0..3 {
        ring.push(StereoFrame::new(i as f32, 1.0));
    }

    let mut block = [StereoFrame::SILENCE; 5];
    assert_eq!(ring.pop_into(&mut block), 3);
    assert_eq!(block[0], StereoFrame::new(0.0, 1.0));
    assert_eq!(block[2], StereoFrame::new(2.0, 1.0));
    assert_eq!(block[3], StereoFrame::SILENCE);
    assert!(ring.is_empty());
}

#[test]
fn test_ring_wraps_around() {
    let mut ring = SampleRing::new(4);
    let mut block = [StereoFrame::SILENCE; 3];

    for round in 0..5 {
        for i in 0..3 {
            assert!(ring.push(StereoFrame::new((round * 3 + i) as f32, 0.0)));
        }
        assert_eq!(ring.pop_into(&mut block), 3);
        assert_eq!(block[0].left, (round * 3) as f32);
        assert_eq!(block[2].left, (round * 3 + 2) as f32);
    }
}

// ============================================================================
// Enqueue / Eviction Tests
// ============================================================================

#[test]
fn test_enqueue_beyond_capacity_keeps_newest() {
    let mut pump = pump_with_capacity(2048);
    enqueue_sequence(&mut pump, 0..4096);

    assert_eq!(pump.occupancy(), 2048);
    let left: Vec<f32> = pump.buffered().map(|f| f.left).collect();
    let expected: Vec<f32> = (2048..4096).map(|i| i as f32).collect();
    assert_eq!(left, expected);
}

#[test]
fn test_eviction_drops_documented_batch() {
    let mut pump = pump_with_capacity(2048);
    enqueue_sequence(&mut pump, 0..2048);
    assert_eq!(pump.occupancy(), 2048);
    assert_eq!(pump.metrics().overruns, 0);

    // One more pair evicts capacity / 4 first
    pump.enqueue(9.0, 9.0);
    assert_eq!(pump.occupancy(), 2048 - 512 + 1);
    assert_eq!(pump.metrics().overruns, 1);
    assert_eq!(pump.metrics().pairs_evicted, 512);
    assert_eq!(pump.buffered().next().map(|f| f.left), Some(512.0));
}

#[test]
fn test_lower_high_water_caps_latency() {
    let config = AudioConfig {
        capacity_pairs: 1000,
        high_water_pairs: Some(100),
        evict_batch_pairs: Some(10),
        ..AudioConfig::default()
    };
    let mut pump = AudioPump::new(config, Some(44_100));

    for i in 0..10_000 {
        pump.enqueue(i as f32, 0.0);
        assert!(pump.occupancy() <= 100);
    }
    assert_eq!(pump.buffered().last().map(|f| f.left), Some(9999.0));
}

#[test]
fn test_minimal_eviction_batch() {
    let config = AudioConfig {
        capacity_pairs: 4,
        evict_batch_pairs: Some(1),
        ..AudioConfig::default()
    };
    let mut pump = AudioPump::new(config, Some(44_100));
    enqueue_sequence(&mut pump, 0..7);

    let left: Vec<f32> = pump.buffered().map(|f| f.left).collect();
    assert_eq!(left, vec![3.0, 4.0, 5.0, 6.0]);
    assert_eq!(pump.metrics().overruns, 3);
}

#[test]
fn test_occupancy_stays_within_capacity() {
    let mut pump = pump_with_capacity(64);
    let mut block = Vec::new();

    for step in 0..500u32 {
        let burst = (step * 7) % 50;
        enqueue_sequence(&mut pump, 0..burst);
        assert!(pump.occupancy() <= pump.capacity());

        pump.request_block_silent(((step * 13) % 40) as usize, &mut block);
        assert!(pump.occupancy() <= pump.capacity());
    }
}

// ============================================================================
// Request Block Tests
// ============================================================================

#[test]
fn test_request_block_always_returns_n() {
    let mut pump = pump_with_capacity(256);
    let mut block = Vec::new();

    for n in [0usize, 1, 7, 64, 255, 256, 1000] {
        for prior in [0u32, 10, 300] {
            pump.reset();
            enqueue_sequence(&mut pump, 0..prior);
            pump.request_block(n, &mut block, |_, _| {});
            assert_eq!(block.len(), n, "n={n} prior={prior}");
        }
    }
}

#[test]
fn test_request_block_serves_buffered_samples_in_order() {
    let mut pump = pump_with_capacity(64);
    enqueue_sequence(&mut pump, 0..10);

    let mut block = Vec::new();
    let mut refilled = false;
    pump.request_block(4, &mut block, |_, _| refilled = true);

    assert!(!refilled);
    assert_eq!(block[0], StereoFrame::new(0.0, 0.0));
    assert_eq!(block[3], StereoFrame::new(3.0, -3.0));
    assert_eq!(pump.occupancy(), 6);
}

#[test]
fn test_request_block_refills_on_underrun() {
    let mut pump = pump_with_capacity(64);
    enqueue_sequence(&mut pump, 0..2);

    let mut block = Vec::new();
    let mut deficit_seen = None;
    pump.request_block(8, &mut block, |pump, deficit| {
        deficit_seen = Some(deficit);
        for i in 2..8 {
            pump.enqueue(i as f32, 0.0);
        }
    });

    assert_eq!(deficit_seen, Some(6));
    let left: Vec<f32> = block.iter().map(|f| f.left).collect();
    assert_eq!(left, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    assert_eq!(pump.metrics().refills, 1);
    assert_eq!(pump.metrics().underruns, 0);
}

#[test]
fn test_request_block_pads_with_silence_when_refill_falls_short() {
    let mut pump = pump_with_capacity(64);
    enqueue_sequence(&mut pump, 1..3);

    let mut block = Vec::new();
    pump.request_block(6, &mut block, |pump, _| pump.enqueue(0.5, 0.5));

    assert_eq!(block.len(), 6);
    assert_eq!(block[0], StereoFrame::new(1.0, -1.0));
    assert_eq!(block[1], StereoFrame::new(2.0, -2.0));
    assert_eq!(block[2], StereoFrame::new(0.5, 0.5));
    assert!(block[3..].iter().all(|f| *f == StereoFrame::SILENCE));
    assert_eq!(pump.metrics().underruns, 1);
    assert_eq!(pump.metrics().silence_pairs, 3);
    assert_eq!(pump.occupancy(), 0);
}

#[test]
fn test_request_block_from_empty_pump_is_silence() {
    let mut pump = pump_with_capacity(64);
    let mut block = vec![StereoFrame::new(1.0, 1.0); 3];
    pump.request_block_silent(16, &mut block);

    assert_eq!(block.len(), 16);
    assert!(block.iter().all(|f| *f == StereoFrame::SILENCE));
}

#[test]
fn test_request_zero_pairs_never_refills() {
    let mut pump = pump_with_capacity(64);
    let mut block = Vec::new();
    let mut called = false;
    pump.request_block(0, &mut block, |_, _| called = true);

    assert!(block.is_empty());
    assert!(!called);
}

// ============================================================================
// Sample Rate / Lifecycle Tests
// ============================================================================

#[test]
fn test_negotiated_sample_rate() {
    let pump = pump_with_capacity(64);
    assert_eq!(pump.sample_rate(), 48_000);
    assert!(!pump.is_inert());
}

#[test]
fn test_inert_pump_reports_fallback_rate() {
    let mut pump = AudioPump::new(AudioConfig::default(), None);
    assert!(pump.is_inert());
    assert_eq!(pump.sample_rate(), 44_100);

    // Still well-defined
    pump.enqueue(0.25, 0.25);
    let mut block = Vec::new();
    pump.request_block(4, &mut block, |_, _| {});
    assert_eq!(block.len(), 4);
    assert_eq!(block[0], StereoFrame::new(0.25, 0.25));
}

#[test]
fn test_reset_discards_buffered_audio() {
    let mut pump = pump_with_capacity(64);
    enqueue_sequence(&mut pump, 0..32);
    pump.reset();
    assert_eq!(pump.occupancy(), 0);
    assert_eq!(pump.capacity(), 64);
}

#[test]
fn test_reconfigure_reallocates_ring() {
    let mut pump = pump_with_capacity(64);
    enqueue_sequence(&mut pump, 0..32);
    pump.reconfigure(AudioConfig::with_capacity(128));
    assert_eq!(pump.capacity(), 128);
    assert_eq!(pump.occupancy(), 0);
}

#[test]
fn test_metrics_log_once_per_second() {
    let mut pump = pump_with_capacity(64);
    let start = Instant::now();

    // First call only arms the timer
    assert!(!pump.log_metrics(start));
    assert!(!pump.log_metrics(start + Duration::from_millis(500)));
    assert!(pump.log_metrics(start + Duration::from_millis(1000)));
    assert!(!pump.log_metrics(start + Duration::from_millis(1500)));
}
