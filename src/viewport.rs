//! The viewport controller: owner of the visible time × frequency window.
//!
//! Every mutation is clamped to the bounds and committed synchronously, so
//! the next read (or draw) always sees the latest state. Listeners are
//! notified after each committed change.

use crate::error::ViewportError;
use crate::interval::{Interval, Position, SpectrogramWindow, MIN_FREQ_SPAN, MIN_TIME_SPAN};

/// Callback invoked after the viewport changes.
pub type ViewportListener = Box<dyn FnMut(&SpectrogramWindow)>;

/// Maximum number of entries kept for [`ViewportController::back`].
const MAX_HISTORY: usize = 64;

pub struct ViewportController {
    viewport: SpectrogramWindow,
    bounds: SpectrogramWindow,
    initial: SpectrogramWindow,
    history: Vec<SpectrogramWindow>,
    listeners: Vec<ViewportListener>,
    revision: u64,
}

impl std::fmt::Debug for ViewportController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportController")
            .field("viewport", &self.viewport)
            .field("bounds", &self.bounds)
            .field("revision", &self.revision)
            .finish()
    }
}

/// Clamp both axes of `window` into `bounds`, enforcing the minimum spans.
pub fn clamp_window(window: &SpectrogramWindow, bounds: &SpectrogramWindow) -> SpectrogramWindow {
    SpectrogramWindow {
        time: window.time.fit_within(&bounds.time, MIN_TIME_SPAN),
        freq: window.freq.fit_within(&bounds.freq, MIN_FREQ_SPAN),
    }
}

fn is_collapsed(bounds: &SpectrogramWindow) -> bool {
    !bounds.is_finite() || bounds.time.span() <= 0.0 || bounds.freq.span() <= 0.0
}

impl ViewportController {
    pub fn new(initial: SpectrogramWindow, bounds: SpectrogramWindow) -> Self {
        let initial = if is_collapsed(&bounds) || !initial.is_finite() {
            bounds
        } else {
            clamp_window(&initial, &bounds)
        };
        if is_collapsed(&bounds) {
            tracing::warn!(?bounds, "Viewport bounds collapsed; viewport operations disabled");
        }
        Self {
            viewport: initial,
            bounds,
            initial,
            history: Vec::new(),
            listeners: Vec::new(),
            revision: 0,
        }
    }

    /// The visible window.
    pub fn viewport(&self) -> SpectrogramWindow {
        self.viewport
    }

    pub fn bounds(&self) -> SpectrogramWindow {
        self.bounds
    }

    pub fn initial(&self) -> SpectrogramWindow {
        self.initial
    }

    /// Incremented on every committed change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_collapsed(&self) -> bool {
        is_collapsed(&self.bounds)
    }

    /// Report why operations are being ignored, if they are.
    pub fn check_bounds(&self) -> Result<(), ViewportError> {
        if !self.bounds.is_finite() {
            return Err(ViewportError::NonFinite);
        }
        if self.is_collapsed() {
            return Err(ViewportError::BoundsCollapse {
                time_span: self.bounds.time.span(),
                freq_span: self.bounds.freq.span(),
            });
        }
        Ok(())
    }

    pub fn subscribe(&mut self, listener: ViewportListener) {
        self.listeners.push(listener);
    }

    /// Clamp and store `window`. Returns true if the viewport changed.
    pub fn set(&mut self, window: SpectrogramWindow) -> bool {
        self.commit(window, true)
    }

    /// Move the window so it is centered on the given coordinates, keeping
    /// its span. Missing coordinates keep the current center on that axis.
    pub fn center_on(&mut self, time: Option<f64>, freq: Option<f64>) -> bool {
        let current = self.viewport;
        let next = SpectrogramWindow {
            time: match time {
                Some(t) => Interval::centered_on(t, current.time.span()),
                None => current.time,
            },
            freq: match freq {
                Some(f) => Interval::centered_on(f, current.freq.span()),
                None => current.freq,
            },
        };
        self.commit(next, false)
    }

    /// Replace only the frequency axis.
    pub fn set_frequency_interval(&mut self, freq: Interval) -> bool {
        let next = SpectrogramWindow {
            time: self.viewport.time,
            freq,
        };
        self.commit(next, false)
    }

    /// Replace only the time axis.
    pub fn set_time_interval(&mut self, time: Interval) -> bool {
        let next = SpectrogramWindow {
            time,
            freq: self.viewport.freq,
        };
        self.commit(next, true)
    }

    /// Zoom by `factor` around `anchor`; factors above 1 zoom in.
    /// The anchor keeps its relative position on screen.
    pub fn zoom_by(&mut self, factor: f64, anchor: Position) -> bool {
        if !(factor.is_finite() && factor > 0.0) {
            return false;
        }
        let zoom_axis = |axis: Interval, at: f64| {
            let fraction = axis.fraction_of(at);
            let span = axis.span() / factor;
            let min = at - fraction * span;
            Interval { min, max: min + span }
        };
        let current = self.viewport;
        let next = SpectrogramWindow {
            time: zoom_axis(current.time, anchor.time),
            freq: zoom_axis(current.freq, anchor.freq),
        };
        self.commit(next, true)
    }

    /// Pan by a domain-space displacement.
    pub fn shift_by(&mut self, time: f64, freq: f64) -> bool {
        let current = self.viewport;
        let next = SpectrogramWindow {
            time: current.time.shift(time),
            freq: current.freq.shift(freq),
        };
        self.commit(next, false)
    }

    /// Zoom into a user-drawn rectangle.
    pub fn zoom_to(&mut self, window: SpectrogramWindow) -> bool {
        self.commit(window, true)
    }

    /// Return to the initial window.
    pub fn reset(&mut self) -> bool {
        let initial = self.initial;
        self.commit(initial, true)
    }

    /// Undo the last recorded viewport change.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => self.commit(previous, false),
            None => false,
        }
    }

    /// Recompute bounds and initial window, e.g. when a different clip,
    /// recording or sound event is selected.
    pub fn reset_to(&mut self, initial: SpectrogramWindow, bounds: SpectrogramWindow) {
        self.bounds = bounds;
        self.initial = if is_collapsed(&bounds) || !initial.is_finite() {
            bounds
        } else {
            clamp_window(&initial, &bounds)
        };
        self.history.clear();
        self.viewport = self.initial;
        self.revision += 1;
        self.notify();
    }

    /// Replace the bounds and re-clamp the current viewport, e.g. when the
    /// effective sample rate changes.
    pub fn set_bounds(&mut self, bounds: SpectrogramWindow) {
        self.bounds = bounds;
        if is_collapsed(&bounds) {
            tracing::warn!(?bounds, "Viewport bounds collapsed");
            return;
        }
        self.initial = clamp_window(&self.initial, &bounds);
        let current = self.viewport;
        self.commit(current, false);
    }

    fn commit(&mut self, window: SpectrogramWindow, record_history: bool) -> bool {
        if self.is_collapsed() || !window.is_finite() {
            return false;
        }
        let next = clamp_window(&window, &self.bounds);
        if next == self.viewport {
            return false;
        }
        if record_history {
            self.history.push(self.viewport);
            if self.history.len() > MAX_HISTORY {
                self.history.remove(0);
            }
        }
        self.viewport = next;
        self.revision += 1;
        self.notify();
        true
    }

    fn notify(&mut self) {
        let viewport = self.viewport;
        for listener in self.listeners.iter_mut() {
            listener(&viewport);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn bounds() -> SpectrogramWindow {
        SpectrogramWindow::new(Interval::new(0.0, 60.0), Interval::new(0.0, 22_050.0))
    }

    fn controller() -> ViewportController {
        ViewportController::new(
            SpectrogramWindow::new(Interval::new(0.0, 10.0), Interval::new(0.0, 22_050.0)),
            bounds(),
        )
    }

    #[test]
    fn test_center_on_clamps_at_end() {
        let mut vp = controller();
        assert!(vp.center_on(Some(58.0), None));
        let w = vp.viewport();
        assert!((w.time.min - 50.0).abs() < 1e-9);
        assert!((w.time.max - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_clamps_to_bounds() {
        let mut vp = controller();
        vp.set(SpectrogramWindow::new(
            Interval::new(-20.0, 100.0),
            Interval::new(-5.0, 40_000.0),
        ));
        let w = vp.viewport();
        assert!(w.is_within(&bounds()));
        assert_eq!(w, bounds());
    }

    #[test]
    fn test_minimum_span_enforced() {
        let mut vp = controller();
        vp.set(SpectrogramWindow::new(
            Interval::new(5.0, 5.0),
            Interval::new(100.0, 100.0),
        ));
        let w = vp.viewport();
        assert!(w.time.span() >= MIN_TIME_SPAN - 1e-12);
        assert!(w.freq.span() >= MIN_FREQ_SPAN - 1e-12);
    }

    #[test]
    fn test_collapsed_bounds_are_noops() {
        let collapsed = SpectrogramWindow::new(Interval::new(0.0, 0.0), Interval::new(0.0, 22_050.0));
        let mut vp = ViewportController::new(collapsed, collapsed);
        assert!(vp.is_collapsed());
        assert!(vp.check_bounds().is_err());
        assert!(!vp.center_on(Some(3.0), None));
        assert!(!vp.zoom_by(2.0, Position::new(0.0, 0.0)));
        let w = vp.viewport();
        assert!(w.time.min.is_finite() && w.time.max.is_finite());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut vp = controller();
        let before = vp.viewport();
        assert!(!vp.set(SpectrogramWindow::new(
            Interval { min: f64::NAN, max: 3.0 },
            Interval::new(0.0, 100.0),
        )));
        assert_eq!(vp.viewport(), before);
    }

    #[test]
    fn test_zoom_keeps_anchor_fraction() {
        let mut vp = controller();
        let anchor = Position::new(2.5, 11_025.0);
        vp.zoom_by(2.0, anchor);
        let w = vp.viewport();
        assert!((w.time.span() - 5.0).abs() < 1e-9);
        assert!((w.time.fraction_of(2.5) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_back_restores_previous() {
        let mut vp = controller();
        let original = vp.viewport();
        vp.set_time_interval(Interval::new(20.0, 30.0));
        assert!(vp.back());
        assert_eq!(vp.viewport(), original);
        assert!(!vp.back());
    }

    #[test]
    fn test_listeners_fire_on_change_only() {
        let mut vp = controller();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        vp.subscribe(Box::new(move |_| counter.set(counter.get() + 1)));

        vp.shift_by(5.0, 0.0);
        assert_eq!(calls.get(), 1);

        // Already at the start; shifting left is clamped to the same window.
        vp.shift_by(-100.0, 0.0);
        vp.shift_by(-100.0, 0.0);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_reset_to_recomputes() {
        let mut vp = controller();
        vp.shift_by(30.0, 0.0);
        let new_bounds =
            SpectrogramWindow::new(Interval::new(100.0, 110.0), Interval::new(0.0, 48_000.0));
        vp.reset_to(new_bounds, new_bounds);
        assert_eq!(vp.viewport(), new_bounds);
        assert_eq!(vp.bounds(), new_bounds);
        assert!(!vp.back());
    }

    #[test]
    fn test_set_bounds_reclamps() {
        let mut vp = controller();
        let narrower =
            SpectrogramWindow::new(Interval::new(0.0, 60.0), Interval::new(0.0, 8_000.0));
        vp.set_bounds(narrower);
        assert!(vp.viewport().freq.max <= 8_000.0);
    }
}
