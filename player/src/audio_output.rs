//! Audio output using cpal and a lock-free hand-off ring
//!
//! The session fills whole blocks on the main thread; the device callback
//! drains them on the audio thread and pads any shortfall with silence.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};
use tracing::{debug, error, info};

use retrosync_core::StereoFrame;

/// Hand-off ring size in stereo pairs
///
/// Four 1024-pair blocks, ~90ms at 44.1kHz. The session ring upstream does
/// the real buffering; this only has to ride out scheduling jitter.
const HANDOFF_PAIRS: usize = 4096;

/// Failure opening the default output device.
#[derive(Debug, thiserror::Error)]
pub enum AudioDeviceError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to get default output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to play audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(cpal::SampleFormat),
}

/// Default output device fed with interleaved stereo f32.
pub struct AudioOutput {
    /// Producer side of the hand-off ring (main thread writes here)
    producer: ringbuf::HeapProd<f32>,
    /// The cpal stream (kept alive for the duration)
    _stream: cpal::Stream,
    sample_rate: u32,
    /// Scratch buffer for interleaving
    interleaved: Vec<f32>,
}

impl AudioOutput {
    /// Open the default output device at its default configuration.
    pub fn new() -> Result<Self, AudioDeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioDeviceError::NoDevice)?;
        let config = device.default_output_config()?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let ring = HeapRb::<f32>::new(HANDOFF_PAIRS * 2);
        let (producer, consumer) = ring.split();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), consumer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), consumer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), consumer)?,
            format => return Err(AudioDeviceError::UnsupportedFormat(format)),
        };
        stream.play()?;

        info!(
            "Audio output: {}Hz, {} channels",
            sample_rate, channels
        );

        Ok(Self {
            producer,
            _stream: stream,
            sample_rate,
            interleaved: Vec::with_capacity(HANDOFF_PAIRS * 2),
        })
    }

    /// Negotiated output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Pairs that can be pushed without overflowing the hand-off ring
    pub fn vacant_pairs(&self) -> usize {
        self.producer.vacant_len() / 2
    }

    /// Queue one block for the device.
    ///
    /// The block goes in whole or not at all; returns false if it did not fit.
    pub fn push_block(&mut self, block: &[StereoFrame]) -> bool {
        if self.vacant_pairs() < block.len() {
            debug!(
                "Audio hand-off full, dropping {} pair block",
                block.len()
            );
            return false;
        }

        self.interleaved.clear();
        for frame in block {
            self.interleaved.push(frame.left);
            self.interleaved.push(frame.right);
        }
        self.producer.push_slice(&self.interleaved);
        true
    }
}

/// Build an output stream converting interleaved stereo f32 to `T`.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut consumer: ringbuf::HeapCons<f32>,
) -> Result<cpal::Stream, AudioDeviceError>
where
    T: Sample + SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = usize::from(config.channels.max(1));
    // Pre-allocate for batch reads
    let mut stereo: Vec<f32> = vec![0.0; 4096];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels;
            if stereo.len() < frames * 2 {
                stereo.resize(frames * 2, 0.0);
            }

            // Batch read, then pad with silence
            let popped = consumer.pop_slice(&mut stereo[..frames * 2]);
            stereo[popped..frames * 2].fill(0.0);

            for (out, pair) in data.chunks_exact_mut(channels).zip(stereo.chunks_exact(2)) {
                write_frame(out, pair[0], pair[1]);
            }
        },
        |err| error!("Audio stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Spread one stereo pair over an output frame of any channel count.
fn write_frame<T: Sample + FromSample<f32>>(out: &mut [T], left: f32, right: f32) {
    match out {
        [mono] => *mono = T::from_sample((left + right) * 0.5),
        [l, r, rest @ ..] => {
            *l = T::from_sample(left);
            *r = T::from_sample(right);
            rest.fill(T::EQUILIBRIUM);
        }
        [] => {}
    }
}
