//! Configuration (retrosync.toml)
//!
//! All synchronization parameters live here. Every field has a default, so an
//! empty file (or no file at all) yields the stock 60 Hz / 256×240 setup.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level synchronization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Frame pacing settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Audio buffering settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Presentation settings
    #[serde(default)]
    pub video: VideoConfig,
    /// CRT effect pipeline settings
    #[serde(default)]
    pub effects: EffectConfig,
}

/// Frame pacing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Logical frame rate in Hz (default: 60)
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Most frames a single tick may produce before the backlog is dropped (default: 4)
    #[serde(default = "default_max_catch_up")]
    pub max_catch_up: u32,
}

impl SchedulerConfig {
    /// Duration of one logical frame.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate.max(1)))
    }
}

/// Audio ring buffer configuration. All sizes are in stereo pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Ring buffer capacity (default: 4096)
    #[serde(default = "default_capacity_pairs")]
    pub capacity_pairs: usize,
    /// Occupancy that triggers eviction before enqueue (default: capacity)
    #[serde(default)]
    pub high_water_pairs: Option<usize>,
    /// Pairs dropped per eviction (default: capacity / 4)
    #[serde(default)]
    pub evict_batch_pairs: Option<usize>,
    /// Pairs requested per host audio callback (default: 1024)
    #[serde(default = "default_block_pairs")]
    pub block_pairs: usize,
    /// Sample rate reported when no audio device exists (default: 44100)
    #[serde(default = "default_fallback_sample_rate")]
    pub fallback_sample_rate: u32,
}

impl AudioConfig {
    /// Configuration with the given capacity and derived defaults.
    pub fn with_capacity(capacity_pairs: usize) -> Self {
        Self {
            capacity_pairs,
            ..Self::default()
        }
    }

    /// Effective high-water mark.
    pub fn high_water(&self) -> usize {
        self.high_water_pairs.unwrap_or(self.capacity_pairs)
    }

    /// Effective eviction batch.
    pub fn evict_batch(&self) -> usize {
        self.evict_batch_pairs
            .unwrap_or(self.capacity_pairs / 4)
            .max(1)
    }
}

/// Presentation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Native frame width (default: 256)
    #[serde(default = "default_width")]
    pub width: u32,
    /// Native frame height (default: 240)
    #[serde(default = "default_height")]
    pub height: u32,
    /// On-screen aspect ratio with effects active (default: 1.38)
    #[serde(default = "default_display_aspect")]
    pub display_aspect: f32,
    /// Fraction of the container the effect image may fill (default: 0.7)
    #[serde(default = "default_fill")]
    pub fill: f32,
}

impl VideoConfig {
    /// Number of pixels in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// CRT effect pipeline configuration.
///
/// Stage parameters are tuned for the 256×240 native frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Build the effect pipeline at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub scanlines: bool,
    /// Darkening of rows with `y % 4 == 0` (default: 0.05)
    #[serde(default = "default_scanline_even")]
    pub scanline_even: f32,
    /// Darkening of rows with `y % 4 == 2` (default: 0.03)
    #[serde(default = "default_scanline_odd")]
    pub scanline_odd: f32,
    #[serde(default = "default_true")]
    pub bulge: bool,
    /// Bulge radius as a fraction of frame width (default: 0.9)
    #[serde(default = "default_bulge_radius")]
    pub bulge_radius: f32,
    /// Bulge strength, negative values pinch (default: 0.1)
    #[serde(default = "default_bulge_strength")]
    pub bulge_strength: f32,
    #[serde(default = "default_true")]
    pub vignette: bool,
    #[serde(default = "default_vignette_size")]
    pub vignette_size: f32,
    #[serde(default = "default_vignette_amount")]
    pub vignette_amount: f32,
    #[serde(default = "default_true")]
    pub noise: bool,
    #[serde(default = "default_noise_amount")]
    pub noise_amount: f32,
    #[serde(default = "default_true")]
    pub blur: bool,
    /// Blur radius in pixels (default: 0.5)
    #[serde(default = "default_blur_radius")]
    pub blur_radius: f32,
    /// Fixed noise seed; random per session when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EffectConfig {
    /// Configuration with every stage switched off (identity pipeline).
    pub fn passthrough() -> Self {
        Self {
            scanlines: false,
            bulge: false,
            vignette: false,
            noise: false,
            blur: false,
            ..Self::default()
        }
    }
}

fn default_tick_rate() -> u32 {
    60
}
fn default_max_catch_up() -> u32 {
    4
}
fn default_capacity_pairs() -> usize {
    4096
}
fn default_block_pairs() -> usize {
    1024
}
fn default_fallback_sample_rate() -> u32 {
    44_100
}
fn default_width() -> u32 {
    256
}
fn default_height() -> u32 {
    240
}
fn default_display_aspect() -> f32 {
    1.38
}
fn default_fill() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}
fn default_scanline_even() -> f32 {
    0.05
}
fn default_scanline_odd() -> f32 {
    0.03
}
fn default_bulge_radius() -> f32 {
    0.9
}
fn default_bulge_strength() -> f32 {
    0.1
}
fn default_vignette_size() -> f32 {
    0.25
}
fn default_vignette_amount() -> f32 {
    0.5
}
fn default_noise_amount() -> f32 {
    0.06
}
fn default_blur_radius() -> f32 {
    0.5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            max_catch_up: default_max_catch_up(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capacity_pairs: default_capacity_pairs(),
            high_water_pairs: None,
            evict_batch_pairs: None,
            block_pairs: default_block_pairs(),
            fallback_sample_rate: default_fallback_sample_rate(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            display_aspect: default_display_aspect(),
            fill: default_fill(),
        }
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            scanlines: default_true(),
            scanline_even: default_scanline_even(),
            scanline_odd: default_scanline_odd(),
            bulge: default_true(),
            bulge_radius: default_bulge_radius(),
            bulge_strength: default_bulge_strength(),
            vignette: default_true(),
            vignette_size: default_vignette_size(),
            vignette_amount: default_vignette_amount(),
            noise: default_true(),
            noise_amount: default_noise_amount(),
            blur: default_true(),
            blur_radius: default_blur_radius(),
            seed: None,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the synchronization layer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.scheduler.tick_rate == 0 {
            return invalid("scheduler.tick_rate must be non-zero".to_string());
        }
        if self.scheduler.max_catch_up == 0 {
            return invalid("scheduler.max_catch_up must be at least 1".to_string());
        }

        let audio = &self.audio;
        if audio.capacity_pairs == 0 {
            return invalid("audio.capacity_pairs must be non-zero".to_string());
        }
        if audio.high_water() == 0 || audio.high_water() > audio.capacity_pairs {
            return invalid(format!(
                "audio.high_water_pairs {} must be within 1..={}",
                audio.high_water(),
                audio.capacity_pairs
            ));
        }
        if audio.evict_batch() > audio.high_water() {
            return invalid(format!(
                "audio.evict_batch_pairs {} exceeds high-water mark {}",
                audio.evict_batch(),
                audio.high_water()
            ));
        }
        if audio.fallback_sample_rate == 0 {
            return invalid("audio.fallback_sample_rate must be non-zero".to_string());
        }

        let video = &self.video;
        if video.width == 0 || video.height == 0 {
            return invalid(format!(
                "video resolution {}x{} is empty",
                video.width, video.height
            ));
        }
        if !(video.display_aspect > 0.0) {
            return invalid("video.display_aspect must be positive".to_string());
        }
        if !(video.fill > 0.0 && video.fill <= 1.0) {
            return invalid("video.fill must be within (0, 1]".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.scheduler.tick_rate, 60);
        assert_eq!(config.scheduler.max_catch_up, 4);
        assert_eq!(config.audio.capacity_pairs, 4096);
        assert_eq!(config.audio.high_water(), 4096);
        assert_eq!(config.audio.evict_batch(), 1024);
        assert_eq!(config.audio.block_pairs, 1024);
        assert_eq!(config.video.width, 256);
        assert_eq!(config.video.height, 240);
        assert!(config.effects.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_at_60hz() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn test_derived_audio_sizes_follow_capacity() {
        let audio = AudioConfig::with_capacity(2048);
        assert_eq!(audio.high_water(), 2048);
        assert_eq!(audio.evict_batch(), 512);
    }

    #[test]
    fn test_passthrough_disables_every_stage() {
        let effects = EffectConfig::passthrough();
        assert!(effects.enabled);
        assert!(!effects.scanlines);
        assert!(!effects.bulge);
        assert!(!effects.vignette);
        assert!(!effects.noise);
        assert!(!effects.blur);
    }

    // =============================================================
    // Parsing tests
    // =============================================================

    #[test]
    fn test_empty_document_is_default() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
                [scheduler]
                tick_rate = 50

                [audio]
                capacity_pairs = 2048
                evict_batch_pairs = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.tick_rate, 50);
        assert_eq!(config.scheduler.max_catch_up, 4);
        assert_eq!(config.audio.capacity_pairs, 2048);
        assert_eq!(config.audio.evict_batch(), 1);
        assert_eq!(config.video, VideoConfig::default());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = SyncConfig::default();
        config.effects.seed = Some(7);
        config.effects.noise = false;

        let text = config.to_toml_string().unwrap();
        let parsed = SyncConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retrosync.toml");
        std::fs::write(&path, "[video]\nfill = 0.5\n").unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.video.fill, 0.5);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SyncConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let result = SyncConfig::from_toml_str("[scheduler\ntick_rate = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // =============================================================
    // Validation tests
    // =============================================================

    #[test]
    fn test_rejects_zero_tick_rate() {
        let result = SyncConfig::from_toml_str("[scheduler]\ntick_rate = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_high_water_above_capacity() {
        let mut config = SyncConfig::default();
        config.audio.high_water_pairs = Some(config.audio.capacity_pairs + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_batch_above_high_water() {
        let mut config = SyncConfig::default();
        config.audio.high_water_pairs = Some(100);
        config.audio.evict_batch_pairs = Some(101);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_resolution() {
        let mut config = SyncConfig::default();
        config.video.height = 0;
        assert!(config.validate().is_err());
    }
}
