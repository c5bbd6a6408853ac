//! Error types for the spectrogram viewer core.
//!
//! Fetch errors are recovered locally and kept as state flags; they are never
//! thrown across the component boundary. The top-level [`WhombatError`] exists
//! for the glue layers (configuration, settings store, workers).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all viewer operations.
#[derive(Error, Debug)]
pub enum WhombatError {
    /// Spectrogram chunk fetch errors
    #[error("Chunk error: {0}")]
    Chunk(#[from] ChunkFetchError),

    /// Audio segment fetch errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioFetchError),

    /// Annotation geometry errors
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Viewport errors
    #[error("Viewport error: {0}")]
    Viewport(#[from] ViewportError),

    /// Settings action errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Species search errors
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Annotation persistence errors
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// Worker thread errors
    #[error("Worker thread error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to obtain a single spectrogram chunk image.
///
/// Non-fatal: the chunk is rendered as a gap and reported through the
/// aggregated generation status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkFetchError {
    #[error("Network failure while fetching chunk: {reason}")]
    Network { reason: String },

    #[error("Server responded with status {status}")]
    Status { status: u16 },

    #[error("Could not decode chunk image: {reason}")]
    Decode { reason: String },

    #[error("Chunk worker unavailable")]
    WorkerGone,
}

/// Failure to obtain a playable audio segment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioFetchError {
    #[error("Network failure while fetching audio: {reason}")]
    Network { reason: String },

    #[error("Server responded with status {status}")]
    Status { status: u16 },

    #[error("Could not decode audio segment: {reason}")]
    Decode { reason: String },

    #[error("Audio segment is empty")]
    Empty,

    #[error("Audio playback initialization failed: {reason}")]
    PlaybackInitFailed { reason: String },
}

/// Failure of a species taxonomy search. Shown inline in the search box.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Network failure while searching species: {reason}")]
    Network { reason: String },

    #[error("Server responded with status {status}")]
    Status { status: u16 },

    #[error("Could not parse search results: {reason}")]
    Decode { reason: String },
}

/// Failure to persist an annotation change. Reported as a notification;
/// draw state is never rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Network failure while saving: {reason}")]
    Network { reason: String },

    #[error("Server responded with status {status}")]
    Status { status: u16 },

    #[error("Could not encode request: {reason}")]
    Encode { reason: String },
}

/// Geometry errors. Zero-span commits are silently discarded by the draw
/// state machine; this type only surfaces through explicit validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },
}

/// Viewport errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewportError {
    #[error("Viewport bounds collapsed: time span {time_span}, frequency span {freq_span}")]
    BoundsCollapse { time_span: f64, freq_span: f64 },

    #[error("Non-finite viewport coordinates")]
    NonFinite,
}

/// Contract violations when dispatching settings actions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Window size must be greater than 0, got {value}")]
    WindowSize { value: f64 },

    #[error("Overlap must be between 0 and 1, got {value}")]
    Overlap { value: f64 },

    #[error("Minimum dB must be less than maximum dB ({min} >= {max})")]
    DbRange { min: f64, max: f64 },

    #[error("Time scale must be between 1.0 and 10, got {value}")]
    TimeScale { value: f64 },

    #[error("Frequency scale must be between 0.1 and 10, got {value}")]
    FreqScale { value: f64 },

    #[error("Height must be greater than 0, got {value}")]
    Height { value: f64 },

    #[error("Playback speed must be greater than 0, got {value}")]
    Speed { value: f64 },

    #[error("Sample rate must be greater than 0, got {value}")]
    Samplerate { value: u32 },

    #[error("Low frequency must be below high frequency ({low} >= {high})")]
    FilterBand { low: f64, high: f64 },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file '{path}': {source}")]
    LoadFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },

    #[error("Invalid config format in '{path}': {source}")]
    InvalidFormat {
        path: Box<PathBuf>,
        source: toml::de::Error,
    },

    #[error("Config validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Failed to save config to '{path}': {source}")]
    SaveFailed {
        path: Box<PathBuf>,
        source: std::io::Error,
    },

    #[error("Config serialization failed: {source}")]
    SerializationFailed { source: toml::ser::Error },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker thread panicked: {reason}")]
    Panicked { reason: String },

    #[error("Worker thread channel disconnected")]
    ChannelDisconnected,

    #[error("Worker thread failed to start: {reason}")]
    StartFailed { reason: String },
}

/// Result type alias for viewer operations
pub type Result<T, E = WhombatError> = std::result::Result<T, E>;

impl ChunkFetchError {
    /// Check if retrying the request may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ChunkFetchError::Network { .. } | ChunkFetchError::WorkerGone => true,
            ChunkFetchError::Status { status } => *status >= 500,
            ChunkFetchError::Decode { .. } => false,
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            ChunkFetchError::Network { .. } => "Could not reach the spectrogram server".to_string(),
            ChunkFetchError::Status { status } => {
                format!("Spectrogram server returned status {}", status)
            }
            ChunkFetchError::Decode { .. } => "Spectrogram image could not be read".to_string(),
            ChunkFetchError::WorkerGone => "Spectrogram loader stopped".to_string(),
        }
    }

    /// Get suggested recovery action
    pub fn recovery_hint(&self) -> Option<&str> {
        match self {
            ChunkFetchError::Network { .. } | ChunkFetchError::Status { .. } => {
                Some("Use \"Re-generate Spectrogram\" to retry")
            }
            ChunkFetchError::Decode { .. } => Some("Try different spectrogram settings"),
            ChunkFetchError::WorkerGone => None,
        }
    }
}

impl AudioFetchError {
    /// Check if retrying the request may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AudioFetchError::Network { .. }
                | AudioFetchError::Status { .. }
                | AudioFetchError::PlaybackInitFailed { .. }
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AudioFetchError::Network { .. } => "Could not reach the audio server".to_string(),
            AudioFetchError::Status { status } => {
                format!("Audio server returned status {}", status)
            }
            AudioFetchError::Decode { .. } => "Audio segment could not be decoded".to_string(),
            AudioFetchError::Empty => "Audio segment is empty".to_string(),
            AudioFetchError::PlaybackInitFailed { .. } => {
                "Could not initialize audio playback device".to_string()
            }
        }
    }

    /// Get suggested recovery action
    pub fn recovery_hint(&self) -> Option<&str> {
        match self {
            AudioFetchError::Network { .. } | AudioFetchError::Status { .. } => {
                Some("Retry playback")
            }
            AudioFetchError::PlaybackInitFailed { .. } => Some("Check the audio output device"),
            _ => None,
        }
    }
}

impl SearchError {
    /// Check if retrying the search may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            SearchError::Network { .. } => true,
            SearchError::Status { status } => *status >= 500,
            SearchError::Decode { .. } => false,
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            SearchError::Network { .. } => "Could not reach the taxonomy service".to_string(),
            SearchError::Status { status } => format!("Species search failed ({})", status),
            SearchError::Decode { .. } => "Unexpected species search response".to_string(),
        }
    }
}

impl MutationError {
    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            MutationError::Network { .. } => "Could not reach the server; change not saved".to_string(),
            MutationError::Status { status } => format!("Server rejected the change ({})", status),
            MutationError::Encode { .. } => "Change could not be sent".to_string(),
        }
    }
}
