//! Error types
//!
//! Every failure inside the synchronization layer is fail-soft: these errors
//! are logged and recovered from, never surfaced to the user.

use std::path::PathBuf;

/// Failure reported by the emulation core while generating a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// The core raised an error while advancing a frame
    #[error("emulation core failed: {0}")]
    Core(String),

    /// No program is loaded
    #[error("no program loaded")]
    NotLoaded,
}

/// Failure reported by an output surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The rendering target became unusable mid-session
    #[error("surface lost")]
    Lost,

    /// The surface has not been created yet
    #[error("surface unavailable")]
    Unavailable,

    /// Backend-specific failure
    #[error("surface backend error: {0}")]
    Backend(String),
}

/// Configuration loading or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
