//! Viewer metrics collection and reporting.
//!
//! Uses HDR histograms for chunk latency and frame time percentiles.

use crate::audio_state::PlaybackMetrics;
use crate::chunk_manager::ResponseOutcome;
use crate::config::MetricsConfig;
use crate::error::ConfigError;
use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Frame times above this are recorded as this (milliseconds).
const MAX_FRAME_MS: u64 = 1_000;

#[derive(Debug)]
pub struct ViewerMetrics {
    /// Chunk fetch latency histogram (milliseconds)
    chunk_latency_ms: Histogram<u64>,

    /// Canvas composite time histogram (milliseconds)
    frame_time_ms: Histogram<u64>,

    chunk_requests: AtomicU64,
    chunk_success: AtomicU64,
    chunk_errors: AtomicU64,
    /// Responses dropped because a refresh superseded them
    chunk_stale: AtomicU64,
    refreshes: AtomicU64,

    /// Latest snapshot from the audio controller
    playback: PlaybackMetrics,

    started: Instant,
}

/// Summary of key metrics for display
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub chunk_p50_ms: f64,
    pub chunk_p95_ms: f64,
    pub chunk_p99_ms: f64,

    /// Average composites per second
    pub avg_fps: f64,
    pub frame_p99_ms: f64,

    pub chunk_requests: u64,
    pub chunk_errors: u64,
    pub stale_discards: u64,
    pub refreshes: u64,

    /// Successful chunk fetches over all completed ones (0.0-1.0)
    pub success_rate: f64,

    pub plays: u64,
    pub pauses: u64,
    pub seeks: u64,
    pub segment_reloads: u64,

    pub uptime_secs: f64,
}

impl ViewerMetrics {
    pub fn new(config: &MetricsConfig) -> Result<Self, ConfigError> {
        let histogram = |max: u64| {
            Histogram::new_with_bounds(1, max.max(2), config.histogram_precision).map_err(|e| {
                ConfigError::ValidationFailed {
                    reason: format!("Invalid histogram bounds: {}", e),
                }
            })
        };

        Ok(Self {
            chunk_latency_ms: histogram(config.histogram_max_ms)?,
            frame_time_ms: histogram(MAX_FRAME_MS)?,
            chunk_requests: AtomicU64::new(0),
            chunk_success: AtomicU64::new(0),
            chunk_errors: AtomicU64::new(0),
            chunk_stale: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            playback: PlaybackMetrics::default(),
            started: Instant::now(),
        })
    }

    pub fn record_chunk_requests(&self, count: usize) {
        self.chunk_requests.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a chunk response and what the manager did with it.
    pub fn record_chunk_response(&mut self, elapsed: Duration, success: bool, outcome: ResponseOutcome) {
        if outcome == ResponseOutcome::Stale {
            self.chunk_stale.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let ms = elapsed.as_millis() as u64;
        if let Err(e) = self.chunk_latency_ms.record(ms.max(1)) {
            tracing::warn!("Failed to record chunk latency: {}", e);
        }

        if success {
            self.chunk_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.chunk_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_time(&mut self, duration: Duration) {
        let ms = (duration.as_millis() as u64).clamp(1, MAX_FRAME_MS);
        if let Err(e) = self.frame_time_ms.record(ms) {
            tracing::warn!("Failed to record frame time: {}", e);
        }
    }

    pub fn update_playback(&mut self, playback: &PlaybackMetrics) {
        self.playback = playback.clone();
    }

    pub fn summary(&self) -> MetricsSummary {
        let success = self.chunk_success.load(Ordering::Relaxed);
        let errors = self.chunk_errors.load(Ordering::Relaxed);
        let completed = success + errors;
        let success_rate = if completed > 0 {
            success as f64 / completed as f64
        } else {
            0.0
        };

        let avg_frame_ms = self.frame_time_ms.mean();
        let avg_fps = if avg_frame_ms > 0.0 {
            1000.0 / avg_frame_ms
        } else {
            0.0
        };

        MetricsSummary {
            chunk_p50_ms: self.chunk_latency_ms.value_at_quantile(0.5) as f64,
            chunk_p95_ms: self.chunk_latency_ms.value_at_quantile(0.95) as f64,
            chunk_p99_ms: self.chunk_latency_ms.value_at_quantile(0.99) as f64,
            avg_fps,
            frame_p99_ms: self.frame_time_ms.value_at_quantile(0.99) as f64,
            chunk_requests: self.chunk_requests.load(Ordering::Relaxed),
            chunk_errors: errors,
            stale_discards: self.chunk_stale.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            success_rate,
            plays: u64::from(self.playback.play_count),
            pauses: u64::from(self.playback.pause_count),
            seeks: u64::from(self.playback.seek_count),
            segment_reloads: u64::from(self.playback.seek_reloads),
            uptime_secs: self.started.elapsed().as_secs_f64(),
        }
    }

    pub fn reset(&mut self) {
        self.chunk_latency_ms.clear();
        self.frame_time_ms.clear();
        for counter in [
            &self.chunk_requests,
            &self.chunk_success,
            &self.chunk_errors,
            &self.chunk_stale,
            &self.refreshes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.playback = PlaybackMetrics::default();
        self.started = Instant::now();
    }
}

impl MetricsSummary {
    /// Render metrics as UI panel
    pub fn ui_panel(&self, ui: &mut egui::Ui) {
        ui.heading("Viewer Metrics");
        ui.separator();

        ui.label("Chunk latency:");
        ui.indent("chunk_latency", |ui| {
            ui.monospace(format!("  P50: {:.1}ms", self.chunk_p50_ms));
            ui.monospace(format!("  P95: {:.1}ms", self.chunk_p95_ms));
            ui.monospace(format!("  P99: {:.1}ms", self.chunk_p99_ms));
        });

        ui.separator();

        ui.label("Canvas:");
        ui.indent("canvas_perf", |ui| {
            ui.monospace(format!("  Avg FPS: {:.1}", self.avg_fps));
            ui.monospace(format!("  Frame P99: {:.1}ms", self.frame_p99_ms));
        });

        ui.separator();

        ui.label("Chunks:");
        ui.indent("chunk_stats", |ui| {
            ui.monospace(format!("  Requests: {}", self.chunk_requests));
            ui.monospace(format!("  Success Rate: {:.1}%", self.success_rate * 100.0));
            ui.monospace(format!("  Errors: {}", self.chunk_errors));
            ui.monospace(format!("  Stale: {}", self.stale_discards));
            ui.monospace(format!("  Refreshes: {}", self.refreshes));
        });

        ui.separator();

        ui.label("Playback:");
        ui.indent("playback_stats", |ui| {
            ui.monospace(format!("  Plays: {} / Pauses: {}", self.plays, self.pauses));
            ui.monospace(format!("  Seeks: {}", self.seeks));
            ui.monospace(format!("  Segment reloads: {}", self.segment_reloads));
        });

        ui.separator();
        ui.label(format!("Uptime: {:.1}s", self.uptime_secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ViewerMetrics {
        ViewerMetrics::new(&MetricsConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_precision_rejected() {
        let config = MetricsConfig {
            histogram_precision: 9,
            ..Default::default()
        };
        assert!(ViewerMetrics::new(&config).is_err());
    }

    #[test]
    fn test_chunk_recording() {
        let mut metrics = metrics();
        metrics.record_chunk_requests(4);
        metrics.record_chunk_response(Duration::from_millis(150), true, ResponseOutcome::Applied);
        metrics.record_chunk_response(Duration::from_millis(200), true, ResponseOutcome::Applied);
        metrics.record_chunk_response(Duration::from_millis(100), false, ResponseOutcome::Applied);
        metrics.record_chunk_response(Duration::from_millis(100), true, ResponseOutcome::Stale);

        let summary = metrics.summary();
        assert_eq!(summary.chunk_requests, 4);
        assert_eq!(summary.chunk_errors, 1);
        assert_eq!(summary.stale_discards, 1);
        assert!((summary.success_rate - 2.0 / 3.0).abs() < 0.01);
        assert!(summary.chunk_p99_ms >= 199.0);
    }

    #[test]
    fn test_frame_time_recording() {
        let mut metrics = metrics();
        for i in 1..=10 {
            metrics.record_frame_time(Duration::from_millis(i * 2));
        }
        assert!(metrics.summary().avg_fps > 0.0);
    }

    #[test]
    fn test_playback_snapshot() {
        let mut metrics = metrics();
        let mut playback = PlaybackMetrics::default();
        playback.record_play();
        playback.record_seek();
        playback.record_segment_load(true);
        metrics.update_playback(&playback);

        let summary = metrics.summary();
        assert_eq!(summary.plays, 1);
        assert_eq!(summary.seeks, 1);
        assert_eq!(summary.segment_reloads, 1);
    }

    #[test]
    fn test_metrics_reset() {
        let mut metrics = metrics();
        metrics.record_chunk_requests(3);
        metrics.record_refresh();
        metrics.reset();

        let summary = metrics.summary();
        assert_eq!(summary.chunk_requests, 0);
        assert_eq!(summary.refreshes, 0);
    }
}
