// Library interface for the Whombat spectrogram viewer

pub mod app;
pub mod audio;
pub mod audio_state;
pub mod canvas;
pub mod chunk_manager;
pub mod chunks;
pub mod compositor;
pub mod config;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod interactions;
pub mod interval;
pub mod metrics;
pub mod models;
pub mod player;
pub mod presets;
pub mod scale_control;
pub mod services;
pub mod session;
pub mod settings;
pub mod species;
pub mod sync;
pub mod ui;
pub mod utils;
pub mod view;
pub mod viewport;
pub mod windows;

// Fakes and synthetic audio for tests and benches
pub mod test_fixtures;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Result, WhombatError};
pub use interval::{Interval, Position, SpectrogramWindow};
pub use session::SettingsStore;
pub use settings::{AudioSettings, SpectrogramSettings};
pub use view::SpectrogramViewer;
pub use viewport::ViewportController;
pub use windows::ViewSubject;
