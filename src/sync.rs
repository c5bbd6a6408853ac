//! Keeps the viewport following audio playback.
//!
//! The follower reads audio events and writes the viewport through
//! [`ViewportController::center_on`] only. It never touches the audio
//! controller, so recentring cannot feed back into a seek.

use crate::config::PlaybackConfig;
use crate::player::AudioEvent;
use crate::viewport::ViewportController;

#[derive(Debug, Clone)]
pub struct PlaybackFollower {
    edge_fraction: f64,
    recenter_fraction: f64,
    enabled: bool,
}

impl Default for PlaybackFollower {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

impl PlaybackFollower {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            edge_fraction: config.edge_fraction,
            recenter_fraction: config.recenter_fraction,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// React to one audio event. Returns true if the viewport moved.
    pub fn on_event(&self, event: &AudioEvent, viewport: &mut ViewportController) -> bool {
        match event {
            AudioEvent::TimeUpdate(time) => self.follow(*time, viewport),
            AudioEvent::Seeked(time) => self.on_seek(*time, viewport),
            _ => false,
        }
    }

    /// Recenter ahead of (or behind) the playback position once it comes
    /// within the edge margin of the visible time range.
    pub fn follow(&self, time: f64, viewport: &mut ViewportController) -> bool {
        if !self.enabled || !time.is_finite() {
            return false;
        }
        let current = viewport.viewport().time;
        let span = current.span();
        let edge = self.edge_fraction * span;
        let jump = self.recenter_fraction * span;

        if time >= current.max - edge {
            tracing::trace!(time, "Playback near right edge, recentring");
            viewport.center_on(Some(time + jump), None)
        } else if time <= current.min + edge {
            tracing::trace!(time, "Playback near left edge, recentring");
            viewport.center_on(Some(time - jump), None)
        } else {
            false
        }
    }

    /// Center the viewport on an explicit seek target.
    pub fn on_seek(&self, time: f64, viewport: &mut ViewportController) -> bool {
        if !self.enabled || !time.is_finite() {
            return false;
        }
        viewport.center_on(Some(time), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Interval, SpectrogramWindow};

    fn controller(t0: f64, t1: f64) -> ViewportController {
        let bounds = SpectrogramWindow::new(Interval::new(0.0, 60.0), Interval::new(0.0, 22_050.0));
        let initial = SpectrogramWindow::new(Interval::new(t0, t1), bounds.freq);
        ViewportController::new(initial, bounds)
    }

    #[test]
    fn test_no_move_in_middle() {
        let mut vp = controller(10.0, 20.0);
        let follower = PlaybackFollower::default();
        assert!(!follower.follow(15.0, &mut vp));
        assert_eq!(vp.viewport().time, Interval::new(10.0, 20.0));
    }

    #[test]
    fn test_recenters_ahead_near_right_edge() {
        let mut vp = controller(10.0, 20.0);
        let follower = PlaybackFollower::default();
        assert!(follower.follow(19.5, &mut vp));
        // center = 19.5 + 4
        let time = vp.viewport().time;
        assert!((time.center() - 23.5).abs() < 1e-9);
        assert!((time.span() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_recenters_behind_near_left_edge() {
        let mut vp = controller(30.0, 40.0);
        let follower = PlaybackFollower::default();
        assert!(follower.follow(30.5, &mut vp));
        assert!((vp.viewport().time.center() - 26.5).abs() < 1e-9);
    }

    #[test]
    fn test_seek_centers_and_clamps() {
        let mut vp = controller(0.0, 10.0);
        let follower = PlaybackFollower::default();
        assert!(follower.on_event(&AudioEvent::Seeked(58.0), &mut vp));
        assert_eq!(vp.viewport().time, Interval::new(50.0, 60.0));
    }

    #[test]
    fn test_disabled_follower_is_inert() {
        let mut vp = controller(10.0, 20.0);
        let mut follower = PlaybackFollower::default();
        follower.set_enabled(false);
        assert!(!follower.follow(19.9, &mut vp));
        assert!(!follower.on_seek(50.0, &mut vp));
    }
}
