//! Audio playback state management
//!
//! Explicit playback state plus counters for monitoring the audio controller.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::AudioFetchError;

/// Explicit audio playback state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    /// No segment requested yet
    Idle,
    /// A segment fetch is in flight
    Loading,
    /// Segment loaded, not playing
    Ready,
    /// Active playback in progress
    Playing,
    /// Playback paused, position retained
    Paused,
    /// Playback disabled until retried
    Error(AudioFetchError),
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Loading => write!(f, "Loading"),
            Self::Ready => write!(f, "Ready"),
            Self::Playing => write!(f, "Playing"),
            Self::Paused => write!(f, "Paused"),
            Self::Error(e) => write!(f, "Error: {}", e),
        }
    }
}

impl PlaybackState {
    /// Returns true if audio is actively playing
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Returns true if `play` would start or resume playback
    pub fn can_play(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready | Self::Paused)
    }

    /// Returns true if in an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the error if in error state
    pub fn error(&self) -> Option<&AudioFetchError> {
        if let Self::Error(e) = self {
            Some(e)
        } else {
            None
        }
    }

    /// Get a user-friendly status icon
    pub fn status_icon(&self) -> &'static str {
        match self {
            Self::Idle => "⚪",
            Self::Loading => "⏳",
            Self::Ready => "🔊",
            Self::Playing => "▶️",
            Self::Paused => "⏸️",
            Self::Error(_) => "⚠️",
        }
    }

    /// Get a user-friendly status message
    pub fn status_message(&self) -> String {
        match self {
            Self::Idle => "No audio".to_string(),
            Self::Loading => "Loading audio".to_string(),
            Self::Ready => "Audio ready".to_string(),
            Self::Playing => "Playing".to_string(),
            Self::Paused => "Paused".to_string(),
            Self::Error(e) => e.user_message(),
        }
    }
}

/// Counters for audio playback monitoring
#[derive(Debug, Clone, Default)]
pub struct PlaybackMetrics {
    /// Total time spent playing audio
    pub total_playback_time: Duration,
    /// Number of seeks performed
    pub seek_count: u32,
    /// Number of segment fetches issued
    pub segment_loads: u32,
    /// Number of segment fetches caused by out-of-range seeks
    pub seek_reloads: u32,
    /// Number of fetch or device errors encountered
    pub errors: u32,
    /// Number of play operations
    pub play_count: u32,
    /// Number of pause operations
    pub pause_count: u32,
    /// Timestamp of last state change
    pub last_state_change: Option<Instant>,
}

impl PlaybackMetrics {
    pub fn record_seek(&mut self) {
        self.seek_count += 1;
    }

    pub fn record_segment_load(&mut self, from_seek: bool) {
        self.segment_loads += 1;
        if from_seek {
            self.seek_reloads += 1;
        }
    }

    pub fn record_play(&mut self) {
        self.play_count += 1;
        self.last_state_change = Some(Instant::now());
    }

    pub fn record_pause(&mut self) {
        self.pause_count += 1;
        self.last_state_change = Some(Instant::now());
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
        self.last_state_change = Some(Instant::now());
    }

    pub fn add_playback_time(&mut self, duration: Duration) {
        self.total_playback_time += duration;
    }

    /// Generate a summary string for debugging
    pub fn summary(&self) -> String {
        format!(
            "Playback: plays={}, pauses={}, seeks={}, loads={} ({} from seeks), playback_time={:.1}s, errors={}",
            self.play_count,
            self.pause_count,
            self.seek_count,
            self.segment_loads,
            self.seek_reloads,
            self.total_playback_time.as_secs_f32(),
            self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(PlaybackState::Playing.is_playing());
        assert!(!PlaybackState::Ready.is_playing());

        assert!(PlaybackState::Ready.can_play());
        assert!(PlaybackState::Paused.can_play());
        assert!(!PlaybackState::Playing.can_play());
        assert!(!PlaybackState::Loading.can_play());

        let err = PlaybackState::Error(AudioFetchError::Empty);
        assert!(err.is_error());
        assert!(!err.can_play());
        assert_eq!(err.error(), Some(&AudioFetchError::Empty));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PlaybackState::Ready.to_string(), "Ready");
        assert_eq!(
            PlaybackState::Error(AudioFetchError::Empty).to_string(),
            "Error: Audio segment is empty"
        );
    }

    #[test]
    fn test_metrics_recording() {
        let mut metrics = PlaybackMetrics::default();
        metrics.record_seek();
        metrics.record_seek();
        metrics.record_segment_load(false);
        metrics.record_segment_load(true);
        assert_eq!(metrics.seek_count, 2);
        assert_eq!(metrics.segment_loads, 2);
        assert_eq!(metrics.seek_reloads, 1);

        metrics.record_play();
        assert_eq!(metrics.play_count, 1);
        assert!(metrics.last_state_change.is_some());
        assert!(metrics.summary().contains("loads=2 (1 from seeks)"));
    }

    #[test]
    fn test_status_icons() {
        assert_eq!(PlaybackState::Playing.status_icon(), "▶️");
        assert_eq!(PlaybackState::Paused.status_icon(), "⏸️");
        assert_eq!(
            PlaybackState::Error(AudioFetchError::Empty).status_icon(),
            "⚠️"
        );
    }
}
