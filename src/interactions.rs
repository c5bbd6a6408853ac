//! Pointer interactions on the spectrogram that move the viewport rather
//! than edit annotations.

use crate::canvas::{Canvas, ZOOM_STYLE};
use crate::interval::{
    scale_pixel_delta, scale_pixel_to_window, scale_position_to_viewport, Dimensions, Interval, Pixel,
    PixelRect, Position, SpectrogramWindow,
};
use crate::viewport::ViewportController;

/// Pointer travel (pixels) below which a press and release count as a click.
const CLICK_SLOP: f64 = 3.0;

/// Zoom factor per scrolled pixel.
const WHEEL_SENSITIVITY: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrogramMode {
    #[default]
    Idle,
    Panning,
    Zooming,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Press { origin: Pixel },
    Pan { last: Pixel },
    Zoom { start: Position, current: Position },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionOutput {
    /// Click in idle mode; seek playback to this time.
    Seek(f64),
    /// The zoom box was applied.
    Zoomed(SpectrogramWindow),
}

#[derive(Debug, Clone, Default)]
pub struct SpectrogramInteractions {
    mode: SpectrogramMode,
    drag: Option<Drag>,
}

impl SpectrogramInteractions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SpectrogramMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SpectrogramMode) {
        if mode != self.mode {
            self.drag = None;
            self.mode = mode;
        }
    }

    /// Hotkey toggle: pressing the key for the active mode returns to idle.
    pub fn toggle_panning(&mut self) {
        self.toggle(SpectrogramMode::Panning);
    }

    pub fn toggle_zooming(&mut self) {
        self.toggle(SpectrogramMode::Zooming);
    }

    fn toggle(&mut self, mode: SpectrogramMode) {
        let next = if self.mode == mode {
            SpectrogramMode::Idle
        } else {
            mode
        };
        self.set_mode(next);
    }

    pub fn cancel(&mut self) {
        self.drag = None;
    }

    pub fn pointer_down(&mut self, at: Pixel, viewport: &ViewportController, dimensions: Dimensions) {
        self.drag = Some(match self.mode {
            SpectrogramMode::Idle => Drag::Press { origin: at },
            SpectrogramMode::Panning => Drag::Pan { last: at },
            SpectrogramMode::Zooming => {
                let start = scale_pixel_to_window(at, &viewport.viewport(), dimensions);
                Drag::Zoom { start, current: start }
            }
        });
    }

    /// Returns true if the viewport moved.
    pub fn pointer_move(
        &mut self,
        at: Pixel,
        viewport: &mut ViewportController,
        dimensions: Dimensions,
    ) -> bool {
        match &mut self.drag {
            Some(Drag::Pan { last }) => {
                // Dragging right reveals earlier times.
                let delta = scale_pixel_delta(last.x - at.x, last.y - at.y, &viewport.viewport(), dimensions);
                *last = at;
                viewport.shift_by(delta.time, delta.freq)
            }
            Some(Drag::Zoom { current, .. }) => {
                *current = scale_pixel_to_window(at, &viewport.viewport(), dimensions);
                false
            }
            _ => false,
        }
    }

    pub fn pointer_up(
        &mut self,
        at: Pixel,
        viewport: &mut ViewportController,
        dimensions: Dimensions,
    ) -> Option<InteractionOutput> {
        match self.drag.take()? {
            Drag::Press { origin } => {
                if origin.distance_to(&at) > CLICK_SLOP {
                    return None;
                }
                let position = scale_pixel_to_window(at, &viewport.viewport(), dimensions);
                Some(InteractionOutput::Seek(position.time))
            }
            Drag::Pan { .. } => None,
            Drag::Zoom { start, .. } => {
                let end = scale_pixel_to_window(at, &viewport.viewport(), dimensions);
                let window = SpectrogramWindow::new(
                    Interval::new(start.time, end.time),
                    Interval::new(start.freq, end.freq),
                );
                if window.time.span() <= 0.0 || window.freq.span() <= 0.0 {
                    tracing::debug!("Ignoring empty zoom box");
                    return None;
                }
                viewport.zoom_to(window);
                self.mode = SpectrogramMode::Panning;
                Some(InteractionOutput::Zoomed(viewport.viewport()))
            }
        }
    }

    /// Wheel zoom around the pointer. Positive `scroll` zooms in.
    pub fn scroll(
        &mut self,
        scroll: f64,
        at: Pixel,
        viewport: &mut ViewportController,
        dimensions: Dimensions,
    ) -> bool {
        if scroll == 0.0 || dimensions.is_empty() {
            return false;
        }
        let anchor = scale_pixel_to_window(at, &viewport.viewport(), dimensions);
        viewport.zoom_by((scroll * WHEEL_SENSITIVITY).exp(), anchor)
    }

    /// Zoom box overlay.
    pub fn draw(&self, canvas: &mut dyn Canvas, viewport: &SpectrogramWindow) {
        if let Some(Drag::Zoom { start, current }) = self.drag {
            let size = canvas.size();
            let rect = PixelRect::from_corners(
                scale_position_to_viewport(start, viewport, size),
                scale_position_to_viewport(current, viewport, size),
            );
            canvas.draw_rect(rect, &ZOOM_STYLE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{DrawCall, RecordingCanvas};

    fn controller() -> ViewportController {
        let bounds = SpectrogramWindow::new(Interval::new(0.0, 100.0), Interval::new(0.0, 10_000.0));
        let initial = SpectrogramWindow::new(Interval::new(10.0, 20.0), bounds.freq);
        ViewportController::new(initial, bounds)
    }

    const DIMS: Dimensions = Dimensions {
        width: 100.0,
        height: 100.0,
    };

    #[test]
    fn test_click_in_idle_seeks() {
        let mut vp = controller();
        let mut ix = SpectrogramInteractions::new();
        ix.pointer_down(Pixel::new(50.0, 50.0), &vp, DIMS);
        let out = ix.pointer_up(Pixel::new(51.0, 50.0), &mut vp, DIMS);
        let Some(InteractionOutput::Seek(time)) = out else {
            panic!("expected seek, got {:?}", out);
        };
        assert!((time - 15.1).abs() < 1e-9);
    }

    #[test]
    fn test_idle_drag_is_not_a_click() {
        let mut vp = controller();
        let mut ix = SpectrogramInteractions::new();
        ix.pointer_down(Pixel::new(10.0, 50.0), &vp, DIMS);
        assert_eq!(ix.pointer_up(Pixel::new(60.0, 50.0), &mut vp, DIMS), None);
        assert_eq!(vp.viewport().time, Interval::new(10.0, 20.0));
    }

    #[test]
    fn test_pan_drag_shifts_viewport() {
        let mut vp = controller();
        let mut ix = SpectrogramInteractions::new();
        ix.toggle_panning();
        ix.pointer_down(Pixel::new(50.0, 50.0), &vp, DIMS);
        assert!(ix.pointer_move(Pixel::new(30.0, 50.0), &mut vp, DIMS));
        // 20 px of a 10 s span over 100 px
        let time = vp.viewport().time;
        assert!((time.min - 12.0).abs() < 1e-9);
        assert!((time.max - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_box_applies_and_switches_to_panning() {
        let mut vp = controller();
        let mut ix = SpectrogramInteractions::new();
        ix.toggle_zooming();
        ix.pointer_down(Pixel::new(20.0, 20.0), &vp, DIMS);
        ix.pointer_move(Pixel::new(60.0, 80.0), &mut vp, DIMS);

        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        ix.draw(&mut canvas, &vp.viewport());
        assert!(matches!(canvas.calls()[0], DrawCall::Rect { .. }));

        let out = ix.pointer_up(Pixel::new(60.0, 80.0), &mut vp, DIMS);
        assert!(matches!(out, Some(InteractionOutput::Zoomed(_))));
        let window = vp.viewport();
        assert!((window.time.min - 12.0).abs() < 1e-9);
        assert!((window.time.max - 16.0).abs() < 1e-9);
        assert!((window.freq.min - 2_000.0).abs() < 1e-6);
        assert!((window.freq.max - 8_000.0).abs() < 1e-6);
        assert_eq!(ix.mode(), SpectrogramMode::Panning);
    }

    #[test]
    fn test_flat_zoom_box_ignored() {
        let mut vp = controller();
        let mut ix = SpectrogramInteractions::new();
        ix.set_mode(SpectrogramMode::Zooming);
        ix.pointer_down(Pixel::new(20.0, 40.0), &vp, DIMS);
        assert_eq!(ix.pointer_up(Pixel::new(70.0, 40.0), &mut vp, DIMS), None);
        assert_eq!(ix.mode(), SpectrogramMode::Zooming);
    }

    #[test]
    fn test_toggle_returns_to_idle() {
        let mut ix = SpectrogramInteractions::new();
        ix.toggle_panning();
        assert_eq!(ix.mode(), SpectrogramMode::Panning);
        ix.toggle_panning();
        assert_eq!(ix.mode(), SpectrogramMode::Idle);
    }

    #[test]
    fn test_wheel_zooms_around_pointer() {
        let mut vp = controller();
        let mut ix = SpectrogramInteractions::new();
        assert!(ix.scroll(100.0, Pixel::new(50.0, 50.0), &mut vp, DIMS));
        let time = vp.viewport().time;
        assert!(time.span() < 10.0);
        assert!((time.center() - 15.0).abs() < 1e-9);
    }
}
