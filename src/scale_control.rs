//! Slider-style zoom controls bound to the `time_scale` / `freq_scale`
//! settings.
//!
//! Dragging a slider previews the scale on the viewport immediately;
//! releasing it commits the value to the settings.

use crate::error::SettingsError;
use crate::interval::{Interval, SpectrogramWindow};
use crate::settings::{SpectrogramSettings, SpectrogramSettingsAction};
use crate::viewport::ViewportController;
use crate::windows::DEFAULT_TIME_WINDOW;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Time,
    Freq,
}

/// Scale control for a single axis: the visible range is the bounds span
/// divided by the scale, centered on the current view.
#[derive(Debug, Clone)]
pub struct AxisScaleControl {
    axis: Axis,
    preview: f64,
    last_applied: Option<f64>,
}

impl AxisScaleControl {
    pub fn new(axis: Axis, scale: f64) -> Self {
        Self {
            axis,
            preview: positive_or_one(scale),
            last_applied: None,
        }
    }

    pub fn value(&self) -> f64 {
        self.preview
    }

    /// Apply the committed setting, e.g. after the settings changed.
    pub fn sync(&mut self, target: f64, viewport: &mut ViewportController) -> bool {
        let next = positive_or_one(target);
        self.preview = next;
        self.apply(next, viewport)
    }

    /// Live preview while the slider moves. Non-positive values are ignored.
    pub fn preview(&mut self, next: f64, viewport: &mut ViewportController) -> bool {
        if !(next > 0.0) {
            return false;
        }
        self.preview = next;
        self.apply(next, viewport)
    }

    pub fn commit(&self, next: f64, settings: &mut SpectrogramSettings) -> Result<(), SettingsError> {
        if !(next > 0.0) {
            return Ok(());
        }
        let action = match self.axis {
            Axis::Time => SpectrogramSettingsAction::SetTimeScale(next),
            Axis::Freq => SpectrogramSettingsAction::SetFreqScale(next),
        };
        settings.apply(action)
    }

    /// Near an edge the range is clipped at the bounds, not shifted, so
    /// the visible span can be smaller than `bounds / scale`.
    fn apply(&mut self, scale: f64, viewport: &mut ViewportController) -> bool {
        if self.last_applied == Some(scale) {
            return false;
        }
        self.last_applied = Some(scale);

        let bounds = viewport.bounds();
        let current = viewport.viewport();
        let (limit, axis) = match self.axis {
            Axis::Time => (bounds.time, current.time),
            Axis::Freq => (bounds.freq, current.freq),
        };
        let range = limit.span() / scale;
        let center = axis.center();
        let interval = Interval {
            min: (center - range / 2.0).max(limit.min),
            max: (center + range / 2.0).min(limit.max),
        };
        let next = match self.axis {
            Axis::Time => SpectrogramWindow::new(interval, current.freq),
            Axis::Freq => SpectrogramWindow::new(current.time, interval),
        };
        viewport.set(next)
    }
}

/// Time-axis scale control that also follows the playback speed.
///
/// The base range is `min(DEFAULT_TIME_WINDOW, bounds span)` and the
/// effective scale is `time_scale / speed`, so faster playback shows a
/// proportionally wider window.
#[derive(Debug, Clone)]
pub struct TimeScaleControl {
    preview: f64,
    base_range: Option<f64>,
    last_applied: Option<(f64, f64)>,
}

impl TimeScaleControl {
    pub fn new(scale: f64) -> Self {
        Self {
            preview: positive_or_one(scale),
            base_range: None,
            last_applied: None,
        }
    }

    pub fn value(&self) -> f64 {
        self.preview
    }

    /// Recompute the base range from the bounds and apply `target` at
    /// `speed`. Called when bounds, the setting, or the speed change.
    pub fn sync(&mut self, target: f64, speed: f64, viewport: &mut ViewportController) -> bool {
        let bounds_range = viewport.bounds().time.span();
        let base = if bounds_range > 0.0 {
            DEFAULT_TIME_WINDOW.min(bounds_range)
        } else {
            DEFAULT_TIME_WINDOW
        };
        if self
            .base_range
            .is_none_or(|current| (current - base).abs() > f64::EPSILON)
        {
            self.base_range = Some(base);
            self.last_applied = None;
        }
        let next = positive_or_one(target);
        self.preview = next;
        self.apply(next, speed, viewport)
    }

    pub fn preview(&mut self, next: f64, speed: f64, viewport: &mut ViewportController) -> bool {
        if !(next > 0.0) {
            return false;
        }
        self.preview = next;
        self.apply(next, speed, viewport)
    }

    pub fn commit(&self, next: f64, settings: &mut SpectrogramSettings) -> Result<(), SettingsError> {
        if !(next > 0.0) {
            return Ok(());
        }
        settings.apply(SpectrogramSettingsAction::SetTimeScale(next))
    }

    fn apply(&mut self, scale: f64, speed: f64, viewport: &mut ViewportController) -> bool {
        let Some(base) = self.base_range else {
            return false;
        };
        if !(speed > 0.0) || self.last_applied == Some((scale, speed)) {
            return false;
        }
        self.last_applied = Some((scale, speed));

        let range = base / (scale / speed);
        let current = viewport.viewport();
        viewport.set(SpectrogramWindow::new(
            Interval::centered_on(current.time.center(), range),
            current.freq,
        ))
    }
}

fn positive_or_one(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        1.0
    }
}
