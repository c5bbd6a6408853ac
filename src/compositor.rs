//! Per-frame composition of the spectrogram canvas.
//!
//! Layers are painted back to front:
//!
//! 1. spectrogram chunks
//! 2. playback onset line
//! 3. interaction overlays (zoom box, annotation preview)
//! 4. committed annotations
//! 5. cursor crosshair

use crate::canvas::{draw_cursor, draw_onset, draw_shape, Canvas, DELETE_STYLE, IDLE_STYLE, SELECTED_STYLE};
use crate::chunk_manager::ChunkManager;
use crate::draw::{AnnotationDraw, DrawMode};
use crate::geometry::{AnnotationId, AnnotationRecord};
use crate::interactions::SpectrogramInteractions;
use crate::interval::{scale_time_to_viewport, Pixel, SpectrogramWindow};

/// Everything drawn in one frame.
pub struct Frame<'a> {
    pub viewport: SpectrogramWindow,
    pub chunks: Option<&'a ChunkManager>,
    pub playback_time: Option<f64>,
    pub interactions: Option<&'a SpectrogramInteractions>,
    pub draw: Option<&'a AnnotationDraw>,
    pub annotations: &'a [AnnotationRecord],
    pub selected: Option<AnnotationId>,
    /// Annotation under the pointer, highlighted in delete mode.
    pub hovered: Option<AnnotationId>,
    pub cursor: Option<Pixel>,
}

impl<'a> Frame<'a> {
    pub fn new(viewport: SpectrogramWindow) -> Self {
        Self {
            viewport,
            chunks: None,
            playback_time: None,
            interactions: None,
            draw: None,
            annotations: &[],
            selected: None,
            hovered: None,
            cursor: None,
        }
    }
}

pub fn compose(canvas: &mut dyn Canvas, frame: &Frame<'_>) {
    let viewport = &frame.viewport;

    if let Some(chunks) = frame.chunks {
        chunks.draw(canvas, viewport);
    }

    if let Some(time) = frame.playback_time {
        if viewport.time.contains(time) {
            let x = scale_time_to_viewport(time, viewport, canvas.size().width);
            draw_onset(canvas, x);
        }
    }

    if let Some(interactions) = frame.interactions {
        interactions.draw(canvas, viewport);
    }
    if let Some(draw) = frame.draw {
        draw.draw(canvas, viewport);
    }

    let deleting = frame.draw.map(|d| d.mode()) == Some(DrawMode::Deleting);
    let size = canvas.size();
    for annotation in frame.annotations {
        if !annotation.geometry.intersects_window(viewport) {
            continue;
        }
        let style = if deleting && frame.hovered == Some(annotation.id) {
            &DELETE_STYLE
        } else if frame.selected == Some(annotation.id) {
            &SELECTED_STYLE
        } else {
            &IDLE_STYLE
        };
        let shape = annotation.geometry.scale_to_viewport(size, viewport);
        draw_shape(canvas, &shape, style);
    }

    if let Some(cursor) = frame.cursor {
        draw_cursor(canvas, cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CREATE_STYLE, CURSOR_STYLE, ONSET_STYLE, ZOOM_STYLE};
    use crate::geometry::{Geometry, GeometryType};
    use crate::interactions::SpectrogramMode;
    use crate::interval::{Dimensions, Interval, Position};
    use crate::test_fixtures::{DrawCall, RecordingCanvas};
    use crate::viewport::ViewportController;

    fn window() -> SpectrogramWindow {
        SpectrogramWindow::new(Interval::new(0.0, 10.0), Interval::new(0.0, 1_000.0))
    }

    fn style_of(call: &DrawCall) -> Option<crate::canvas::Style> {
        match call {
            DrawCall::Line { style, .. }
            | DrawCall::Rect { style, .. }
            | DrawCall::Polyline { style, .. }
            | DrawCall::Circle { style, .. } => Some(*style),
            DrawCall::Image { .. } => None,
        }
    }

    #[test]
    fn test_layer_order() {
        let vp = ViewportController::new(window(), window());
        let dims = Dimensions::new(100.0, 100.0);

        let mut interactions = SpectrogramInteractions::new();
        interactions.set_mode(SpectrogramMode::Zooming);
        interactions.pointer_down(Pixel::new(10.0, 10.0), &vp, dims);

        let mut draw = AnnotationDraw::new(GeometryType::BoundingBox);
        draw.enable_drawing();
        draw.pointer_down(Position::new(1.0, 100.0));
        draw.pointer_move(Position::new(2.0, 200.0));

        let annotations = vec![
            AnnotationRecord {
                id: 1,
                geometry: Geometry::TimeInterval([3.0, 4.0]),
            },
            AnnotationRecord {
                id: 2,
                geometry: Geometry::TimeInterval([5.0, 6.0]),
            },
            AnnotationRecord {
                id: 3,
                geometry: Geometry::TimeStamp(50.0),
            },
        ];

        let frame = Frame {
            playback_time: Some(5.0),
            interactions: Some(&interactions),
            draw: Some(&draw),
            annotations: &annotations,
            selected: Some(2),
            cursor: Some(Pixel::new(40.0, 40.0)),
            ..Frame::new(window())
        };
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        compose(&mut canvas, &frame);

        let styles: Vec<_> = canvas.calls().iter().filter_map(style_of).collect();
        assert_eq!(
            styles,
            vec![
                ONSET_STYLE,
                ZOOM_STYLE,
                CREATE_STYLE,
                IDLE_STYLE,
                SELECTED_STYLE,
                CURSOR_STYLE,
                CURSOR_STYLE
            ]
        );
    }

    #[test]
    fn test_onset_hidden_outside_viewport() {
        let frame = Frame {
            playback_time: Some(12.0),
            ..Frame::new(window())
        };
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        compose(&mut canvas, &frame);
        assert!(canvas.calls().is_empty());
    }

    #[test]
    fn test_hovered_annotation_in_delete_mode() {
        let mut draw = AnnotationDraw::default();
        draw.enable_deleting();
        let annotations = vec![AnnotationRecord {
            id: 9,
            geometry: Geometry::TimeStamp(2.0),
        }];
        let frame = Frame {
            draw: Some(&draw),
            annotations: &annotations,
            hovered: Some(9),
            ..Frame::new(window())
        };
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        compose(&mut canvas, &frame);
        assert_eq!(style_of(&canvas.calls()[0]), Some(DELETE_STYLE));
    }
}
