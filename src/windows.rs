//! Bounds and initial windows for the things a spectrogram can show.

use crate::geometry::Geometry;
use crate::interval::{Interval, SpectrogramWindow};
use crate::models::{Clip, Recording};
use crate::settings::SpectrogramSettings;
use crate::viewport::ViewportController;

/// Longest time span shown when a view opens, in seconds.
pub const DEFAULT_TIME_WINDOW: f64 = 20.0;

/// Time padding around a sound event for the viewport bounds.
pub const SOUND_EVENT_BOUNDS_PADDING: f64 = 0.2;

/// Time padding around a sound event for the initial window.
pub const SOUND_EVENT_INITIAL_PADDING: f64 = 0.1;

/// The entity a spectrogram view is opened on.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewSubject {
    Recording {
        recording: Recording,
        start_time: f64,
        end_time: Option<f64>,
    },
    Clip(Clip),
    SoundEvent {
        uuid: String,
        geometry: Geometry,
        recording: Recording,
    },
}

impl ViewSubject {
    pub fn recording(&self) -> &Recording {
        match self {
            ViewSubject::Recording { recording, .. } => recording,
            ViewSubject::Clip(clip) => &clip.recording,
            ViewSubject::SoundEvent { recording, .. } => recording,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ViewSubject::Recording { .. } => "recording",
            ViewSubject::Clip(_) => "clip",
            ViewSubject::SoundEvent { .. } => "sound_event",
        }
    }

    /// Identity used to decide whether a new subject needs fresh windows.
    pub fn uuid(&self) -> &str {
        match self {
            ViewSubject::Recording { recording, .. } => &recording.uuid,
            ViewSubject::Clip(clip) => &clip.uuid,
            ViewSubject::SoundEvent { uuid, .. } => uuid,
        }
    }

    pub fn windows(&self, effective_samplerate: u32, settings: &SpectrogramSettings) -> ViewingWindows {
        match self {
            ViewSubject::Recording {
                recording,
                start_time,
                end_time,
            } => ViewingWindows::for_recording(
                recording,
                *start_time,
                *end_time,
                effective_samplerate,
            ),
            ViewSubject::Clip(clip) => ViewingWindows::for_clip(clip, effective_samplerate, settings),
            ViewSubject::SoundEvent {
                geometry, recording, ..
            } => ViewingWindows::for_sound_event(geometry, recording, effective_samplerate),
        }
    }
}

/// Bounds plus the window a view starts at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewingWindows {
    pub bounds: SpectrogramWindow,
    pub initial: SpectrogramWindow,
}

impl ViewingWindows {
    pub fn for_recording(
        recording: &Recording,
        start_time: f64,
        end_time: Option<f64>,
        effective_samplerate: u32,
    ) -> Self {
        let end = end_time
            .filter(|end| *end > 0.0)
            .unwrap_or(recording.duration);
        let bounds = SpectrogramWindow::new(
            Interval::new(start_time, end),
            full_frequency_range(effective_samplerate),
        );
        Self {
            bounds,
            initial: initial_window(&bounds),
        }
    }

    pub fn for_clip(clip: &Clip, effective_samplerate: u32, settings: &SpectrogramSettings) -> Self {
        let bounds = SpectrogramWindow::new(
            Interval::new(clip.start_time, clip.end_time),
            full_frequency_range(effective_samplerate),
        );
        let base = initial_window(&bounds);
        Self {
            bounds,
            initial: scale_window(&base, &bounds, settings.time_scale, settings.freq_scale),
        }
    }

    pub fn for_sound_event(geometry: &Geometry, recording: &Recording, effective_samplerate: u32) -> Self {
        Self {
            bounds: geometry_window(
                geometry,
                recording,
                SOUND_EVENT_BOUNDS_PADDING,
                false,
                effective_samplerate,
            ),
            initial: geometry_window(
                geometry,
                recording,
                SOUND_EVENT_INITIAL_PADDING,
                true,
                effective_samplerate,
            ),
        }
    }

    pub fn into_controller(self) -> ViewportController {
        ViewportController::new(self.initial, self.bounds)
    }
}

/// `[0, nyquist]` for the given sample rate.
pub fn full_frequency_range(effective_samplerate: u32) -> Interval {
    Interval::new(0.0, effective_samplerate as f64 / 2.0)
}

/// Window a view starts at: the first `DEFAULT_TIME_WINDOW` seconds of the
/// bounds (or all of it, if shorter) over the full frequency range.
pub fn initial_window(bounds: &SpectrogramWindow) -> SpectrogramWindow {
    let span = bounds.time.span().min(DEFAULT_TIME_WINDOW);
    SpectrogramWindow::new(
        Interval {
            min: bounds.time.min,
            max: bounds.time.min + span,
        },
        bounds.freq,
    )
}

/// Zoom `base` around its center by the given scales, staying inside
/// `bounds`. Scales are floored at a tiny positive value.
pub fn scale_window(
    base: &SpectrogramWindow,
    bounds: &SpectrogramWindow,
    time_scale: f64,
    freq_scale: f64,
) -> SpectrogramWindow {
    let scale_axis = |axis: &Interval, limit: &Interval, scale: f64| {
        let half = axis.span() / (2.0 * scale.max(1e-6));
        let center = axis.center();
        Interval {
            min: (center - half).max(limit.min),
            max: (center + half).min(limit.max),
        }
    };
    SpectrogramWindow::new(
        scale_axis(&base.time, &bounds.time, time_scale),
        scale_axis(&base.freq, &bounds.freq, freq_scale),
    )
}

/// Window around a geometry, padded in time and clamped to the recording.
///
/// With `fit_frequency` the frequency axis hugs the geometry's own
/// frequency extent (when it has one); otherwise it spans `[0, nyquist]`.
pub fn geometry_window(
    geometry: &Geometry,
    recording: &Recording,
    time_padding: f64,
    fit_frequency: bool,
    effective_samplerate: u32,
) -> SpectrogramWindow {
    let extent = geometry.time_extent().expand(time_padding);
    let time = Interval {
        min: extent.min.max(0.0),
        max: extent.max.min(recording.duration),
    };
    let full = full_frequency_range(effective_samplerate);
    let freq = match geometry.freq_extent() {
        Some(f) if fit_frequency && f.span() > 0.0 => Interval {
            min: f.min.max(full.min),
            max: f.max.min(full.max),
        },
        _ => full,
    };
    SpectrogramWindow::new(time, freq)
}

/// Frequency axis to show after the effective sample rate changes: a band
/// of `nyquist / freq_scale` centered at `nyquist / 2`, inside `[0, nyquist]`.
pub fn frequency_reset_interval(effective_samplerate: u32, freq_scale: f64) -> Interval {
    let nyquist = effective_samplerate as f64 / 2.0;
    if nyquist <= 0.0 {
        return Interval::new(0.0, 0.0);
    }
    let bandwidth = nyquist / freq_scale.max(1e-6);
    let center = nyquist / 2.0;
    Interval {
        min: (center - bandwidth / 2.0).max(0.0),
        max: (center + bandwidth / 2.0).min(nyquist),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Position;

    fn recording(duration: f64) -> Recording {
        Recording {
            uuid: "rec".to_string(),
            duration,
            samplerate: 44_100,
            channels: 1,
        }
    }

    #[test]
    fn test_recording_windows() {
        let w = ViewingWindows::for_recording(&recording(60.0), 0.0, None, 44_100);
        assert_eq!(w.bounds.time, Interval::new(0.0, 60.0));
        assert_eq!(w.bounds.freq, Interval::new(0.0, 22_050.0));
        assert_eq!(w.initial.time, Interval::new(0.0, DEFAULT_TIME_WINDOW));
        assert_eq!(w.initial.freq, w.bounds.freq);
    }

    #[test]
    fn test_short_recording_initial_is_whole() {
        let w = ViewingWindows::for_recording(&recording(3.0), 0.0, None, 44_100);
        assert_eq!(w.initial.time, Interval::new(0.0, 3.0));
    }

    #[test]
    fn test_clip_windows_apply_scales() {
        let clip = Clip {
            uuid: "clip".to_string(),
            recording: recording(120.0),
            start_time: 10.0,
            end_time: 20.0,
        };
        let settings = SpectrogramSettings {
            time_scale: 2.0,
            freq_scale: 2.0,
            ..Default::default()
        };
        let w = ViewingWindows::for_clip(&clip, 44_100, &settings);
        assert_eq!(w.bounds.time, Interval::new(10.0, 20.0));
        assert!((w.initial.time.span() - 5.0).abs() < 1e-9);
        assert!((w.initial.time.center() - 15.0).abs() < 1e-9);
        assert!((w.initial.freq.span() - 11_025.0).abs() < 1e-9);
    }

    #[test]
    fn test_sound_event_windows() {
        let geometry = Geometry::bounding_box(Position::new(0.05, 1000.0), Position::new(1.0, 4000.0));
        let w = ViewingWindows::for_sound_event(&geometry, &recording(10.0), 44_100);
        assert_eq!(w.bounds.time.min, 0.0);
        assert!((w.bounds.time.max - 1.2).abs() < 1e-9);
        assert_eq!(w.bounds.freq, Interval::new(0.0, 22_050.0));
        assert!((w.initial.time.max - 1.1).abs() < 1e-9);
        assert_eq!(w.initial.freq, Interval::new(1000.0, 4000.0));
        assert!(w.initial.is_within(&w.bounds));
    }

    #[test]
    fn test_frequency_reset_interval() {
        let band = frequency_reset_interval(44_100, 2.0);
        assert!((band.min - 5_512.5).abs() < 1e-9);
        assert!((band.max - 16_537.5).abs() < 1e-9);

        assert_eq!(frequency_reset_interval(44_100, 1.0), Interval::new(0.0, 22_050.0));
        assert_eq!(frequency_reset_interval(0, 1.0), Interval::new(0.0, 0.0));
    }

    #[test]
    fn test_subject_uuid() {
        let subject = ViewSubject::Recording {
            recording: recording(5.0),
            start_time: 0.0,
            end_time: None,
        };
        assert_eq!(subject.uuid(), "rec");
        assert_eq!(subject.recording().duration, 5.0);
    }
}
