//! Application configuration system with TOML persistence.
//!
//! Loaded once at startup; values fall back to defaults when the file is
//! missing or unreadable.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Whombat server connection
    pub server: ServerConfig,

    /// Spectrogram chunking
    pub chunks: ChunksConfig,

    /// Audio playback and viewport following
    pub playback: PlaybackConfig,

    /// UI configuration
    pub ui: UiConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Whombat server connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the server, without the API prefix
    pub base_url: String,

    /// API path prefix
    pub api_prefix: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Spectrogram chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunksConfig {
    /// Chunk duration in seconds
    pub chunk_duration: f64,

    /// Buffer on each side of a chunk, in STFT windows
    pub chunk_buffer: u32,

    /// Chunks fetched ahead of the viewport on each side
    pub lookahead_chunks: usize,

    /// Number of fetch worker threads
    pub max_concurrent_fetches: usize,
}

/// Audio playback and viewport following
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Highest effective sample rate the output accepts (Hz)
    pub max_samplerate: u32,

    /// Fraction of the viewport span from either edge that triggers recentring
    pub edge_fraction: f64,

    /// Fraction of the viewport span the view jumps ahead when recentring
    pub recenter_fraction: f64,

    /// Length of the audio segment fetched around a seek target (seconds)
    pub segment_duration: f64,

    /// Default playback volume (0.0-1.0)
    pub default_volume: f32,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Spectrogram canvas height in pixels
    pub canvas_height: f32,

    /// Pixel tolerance for picking annotations
    pub hit_tolerance_px: f64,

    /// Frame rate target
    pub target_fps: u32,
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics collection
    pub enabled: bool,

    /// Enable metrics UI panel
    pub show_metrics_panel: bool,

    /// Histogram precision (significant value digits)
    pub histogram_precision: u8,

    /// Maximum histogram value in milliseconds
    pub histogram_max_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            api_prefix: "/api/v1".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for ChunksConfig {
    fn default() -> Self {
        Self {
            chunk_duration: crate::chunks::CHUNK_DURATION,
            chunk_buffer: crate::chunks::CHUNK_BUFFER,
            lookahead_chunks: 1,
            max_concurrent_fetches: 4,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_samplerate: crate::settings::MAX_PLAYBACK_SAMPLERATE,
            edge_fraction: 0.1,
            recenter_fraction: 0.4,
            segment_duration: 60.0,
            default_volume: 1.0,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            canvas_height: 384.0,
            hit_tolerance_px: 6.0,
            target_fps: 60,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_metrics_panel: cfg!(debug_assertions),
            histogram_precision: 2,
            histogram_max_ms: 60_000,
        }
    }
}

impl ServerConfig {
    /// Full URL for an API path such as `/spectrograms/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/'),
            path
        )
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::LoadFailed {
            path: Box::new(path.to_path_buf()),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::InvalidFormat {
            path: Box::new(path.to_path_buf()),
            source,
        })
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::SaveFailed {
                path: Box::new(path.to_path_buf()),
                source,
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|source| ConfigError::SerializationFailed { source })?;

        std::fs::write(path, contents).map_err(|source| ConfigError::SaveFailed {
            path: Box::new(path.to_path_buf()),
            source,
        })
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("whombat-viewer")
            .join("config.toml")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.base_url.starts_with("http://") && !self.server.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationFailed {
                reason: format!("Server URL '{}' must be http(s)", self.server.base_url),
            });
        }

        if !(self.chunks.chunk_duration > 0.0) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "Chunk duration {}s must be > 0",
                    self.chunks.chunk_duration
                ),
            });
        }

        if self.chunks.max_concurrent_fetches == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "Concurrent fetches must be > 0".to_string(),
            });
        }

        if self.playback.max_samplerate == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "Playback sample rate ceiling must be > 0".to_string(),
            });
        }

        let edge = self.playback.edge_fraction;
        if !(0.0..0.5).contains(&edge) {
            return Err(ConfigError::ValidationFailed {
                reason: format!("Edge fraction {} out of range 0.0-0.5", edge),
            });
        }

        if !(0.0..=1.0).contains(&self.playback.recenter_fraction) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "Recenter fraction {} out of range 0.0-1.0",
                    self.playback.recenter_fraction
                ),
            });
        }

        if !(self.playback.segment_duration > 0.0) {
            return Err(ConfigError::ValidationFailed {
                reason: "Audio segment duration must be > 0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.playback.default_volume) {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "Volume {} out of range 0.0-1.0",
                    self.playback.default_volume
                ),
            });
        }

        if self.ui.canvas_height <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                reason: "Canvas height must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }

        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }

        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_valid() {
        let config = AppConfig::default();
        config.validate().expect("Default config should be valid");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).expect("Should serialize");
        let deserialized: AppConfig = toml::from_str(&toml_str).expect("Should deserialize");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("[server]\nbase_url = \"https://whombat.example\"\n")
            .expect("Should deserialize");
        assert_eq!(config.server.base_url, "https://whombat.example");
        assert_eq!(config.server.api_prefix, "/api/v1");
        assert_eq!(config.chunks.chunk_duration, 5.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.chunks.lookahead_chunks = 3;
        config.save_to_file(&path).unwrap();
        assert_eq!(AppConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validation_fractions() {
        let mut config = AppConfig::default();
        config.playback.edge_fraction = 0.6;
        assert!(config.validate().is_err());

        config.playback.edge_fraction = 0.1;
        config.playback.recenter_fraction = 1.5;
        assert!(config.validate().is_err());

        config.playback.recenter_fraction = 0.4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_server_url() {
        let mut config = AppConfig::default();
        config.server.base_url = "ftp://nope".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let server = ServerConfig {
            base_url: "http://host:5000/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            server.endpoint("/spectrograms/"),
            "http://host:5000/api/v1/spectrograms/"
        );
    }
}
