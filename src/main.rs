#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use whombat_viewer::app::WhombatApp;
use whombat_viewer::services::audio::PlaybackBackend;
use whombat_viewer::services::fetch::{spawn_fetch_worker, Sources};
use whombat_viewer::services::http::HttpClient;
use whombat_viewer::{AppConfig, SettingsStore, SpectrogramViewer, ViewSubject};

/// Browse and annotate a Whombat recording's spectrogram.
#[derive(Parser, Debug)]
#[command(name = "whombat-viewer", version, about)]
struct Args {
    /// UUID of the recording to open
    recording: String,

    /// Server base URL (overrides the config file)
    #[arg(long)]
    server: Option<String>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start of the viewable range, in seconds
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// End of the viewable range, in seconds (defaults to the recording end)
    #[arg(long)]
    end: Option<f64>,

    /// Do not write settings changes back to disk
    #[arg(long)]
    no_save: bool,
}

fn playback_backend() -> Box<dyn PlaybackBackend> {
    #[cfg(feature = "audio_playback")]
    {
        match whombat_viewer::services::audio::RodioBackend::open_default() {
            Ok(backend) => return Box::new(backend),
            Err(e) => tracing::warn!(error = %e, "No audio output, playback will be silent"),
        }
    }
    Box::new(whombat_viewer::services::audio::SilentBackend::default())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_default(&config_path);
    if let Some(server) = args.server {
        config.server.base_url = server;
    }
    config.validate().context("Invalid configuration")?;

    let store_path = SettingsStore::default_path();
    let store = SettingsStore::load_or_default(&store_path);

    let client = Arc::new(HttpClient::new(config.server.clone()));
    let recording = client
        .fetch_recording(&args.recording)
        .with_context(|| format!("Failed to open recording {}", args.recording))?;
    tracing::info!(
        recording = %recording.uuid,
        duration = recording.duration,
        samplerate = recording.samplerate,
        "Recording loaded"
    );

    let worker = spawn_fetch_worker(Sources::from_client(client), config.chunks.max_concurrent_fetches)
        .context("Failed to start fetch worker")?;

    let subject = ViewSubject::Recording {
        recording,
        start_time: args.start,
        end_time: args.end,
    };
    let viewer = SpectrogramViewer::new(
        subject,
        store.audio.clone(),
        store.spectrogram.clone(),
        config,
        playback_backend(),
        Box::new(worker),
    );
    let app = WhombatApp::new(viewer, store, (!args.no_save).then_some(store_path));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 720.0]),
        ..Default::default()
    };
    eframe::run_native("Whombat Viewer", options, Box::new(|_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("UI failed: {}", e))
}
