//! Annotation drawing and editing state machine.
//!
//! Pointer input arrives in domain coordinates. Each geometry type has its
//! own gesture:
//!
//! | type           | gesture                                           |
//! |----------------|---------------------------------------------------|
//! | `TimeStamp`    | press and drag moves a candidate instant; release commits |
//! | `TimeInterval` | drag from start to end; release commits            |
//! | `BoundingBox`  | drag a rectangle; release commits                  |
//! | `LineString`   | each press adds a vertex; double click or [`AnnotationDraw::finish`] commits |
//!
//! Degenerate results (zero duration, zero height, fewer than two distinct
//! vertices) are dropped without output. After a commit the machine returns
//! to idle.

use crate::canvas::{draw_shape, Canvas, Style, CREATE_STYLE};
use crate::geometry::{pick_annotation, AnnotationId, AnnotationRecord, Geometry, GeometryType};
use crate::interval::{Dimensions, Pixel, Position, SpectrogramWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Idle,
    Drawing,
    Selecting,
    Deleting,
}

/// What a gesture produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutput {
    Created(Geometry),
    /// Replacement geometry for an annotation being edited.
    Edited { id: AnnotationId, geometry: Geometry },
    Selected(AnnotationId),
    Deleted(AnnotationId),
}

#[derive(Debug, Clone, PartialEq)]
enum InProgress {
    Drag { start: Position, current: Position },
    Line { points: Vec<Position>, hover: Option<Position> },
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationDraw {
    mode: DrawMode,
    geometry_type: GeometryType,
    in_progress: Option<InProgress>,
    /// Annotation whose geometry the next commit replaces.
    editing: Option<AnnotationId>,
    disabled: bool,
}

impl AnnotationDraw {
    pub fn new(geometry_type: GeometryType) -> Self {
        Self {
            geometry_type,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn editing(&self) -> Option<AnnotationId> {
        self.editing
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// True while a gesture has started but not been committed.
    pub fn is_active(&self) -> bool {
        self.in_progress.is_some()
    }

    pub fn enable_drawing(&mut self) {
        self.editing = None;
        self.set_mode(DrawMode::Drawing);
    }

    /// Draw a replacement geometry for `id`.
    pub fn enable_editing(&mut self, id: AnnotationId, geometry_type: GeometryType) {
        self.geometry_type = geometry_type;
        self.set_mode(DrawMode::Drawing);
        self.editing = Some(id);
    }

    pub fn enable_selecting(&mut self) {
        self.set_mode(DrawMode::Selecting);
    }

    pub fn enable_deleting(&mut self) {
        self.set_mode(DrawMode::Deleting);
    }

    pub fn set_idle(&mut self) {
        self.set_mode(DrawMode::Idle);
    }

    pub fn set_geometry_type(&mut self, geometry_type: GeometryType) {
        if geometry_type != self.geometry_type {
            self.discard("geometry type changed");
            self.geometry_type = geometry_type;
        }
    }

    /// Disabling discards any gesture in progress and ignores input until
    /// re-enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.discard("drawing disabled");
            self.mode = DrawMode::Idle;
            self.editing = None;
        }
        self.disabled = !enabled;
    }

    fn set_mode(&mut self, mode: DrawMode) {
        self.discard("mode changed");
        self.mode = mode;
        if mode != DrawMode::Drawing {
            self.editing = None;
        }
    }

    /// Drop the gesture in progress without committing.
    pub fn cancel(&mut self) {
        self.discard("cancelled");
    }

    fn discard(&mut self, reason: &str) {
        if self.in_progress.take().is_some() {
            tracing::debug!(reason, "Discarded in-progress geometry");
        }
    }

    fn drawing(&self) -> bool {
        !self.disabled && self.mode == DrawMode::Drawing
    }

    pub fn pointer_down(&mut self, at: Position) {
        if !self.drawing() {
            return;
        }
        match (&mut self.in_progress, self.geometry_type) {
            (Some(InProgress::Line { points, hover }), GeometryType::LineString) => {
                // The presses of a double click land on the last vertex.
                if points.last() != Some(&at) {
                    points.push(at);
                }
                *hover = None;
            }
            (_, GeometryType::LineString) => {
                self.in_progress = Some(InProgress::Line {
                    points: vec![at],
                    hover: None,
                });
            }
            (_, _) => {
                self.in_progress = Some(InProgress::Drag {
                    start: at,
                    current: at,
                });
            }
        }
    }

    pub fn pointer_move(&mut self, at: Position) {
        if !self.drawing() {
            return;
        }
        match &mut self.in_progress {
            Some(InProgress::Drag { current, .. }) => *current = at,
            Some(InProgress::Line { hover, .. }) => *hover = Some(at),
            None => {}
        }
    }

    /// Release ends drag gestures. Line strings keep collecting vertices.
    pub fn pointer_up(&mut self, at: Position) -> Option<DrawOutput> {
        if !self.drawing() {
            return None;
        }
        let Some(InProgress::Drag { start, .. }) = self.in_progress else {
            return None;
        };
        self.in_progress = None;
        let geometry = match self.geometry_type {
            GeometryType::TimeStamp => Geometry::TimeStamp(at.time),
            GeometryType::TimeInterval => Geometry::time_interval(start.time, at.time),
            GeometryType::BoundingBox => Geometry::bounding_box(start, at),
            GeometryType::LineString => return None,
        };
        self.commit(geometry)
    }

    /// Double click adds the final vertex of a line string and commits it.
    pub fn double_click(&mut self, at: Position) -> Option<DrawOutput> {
        if !self.drawing() || self.geometry_type != GeometryType::LineString {
            return None;
        }
        if let Some(InProgress::Line { points, .. }) = &mut self.in_progress {
            if points.last() != Some(&at) {
                points.push(at);
            }
        }
        self.finish()
    }

    /// Explicit end gesture for line strings.
    pub fn finish(&mut self) -> Option<DrawOutput> {
        match self.in_progress.take() {
            Some(InProgress::Line { points, .. }) => self.commit(Geometry::line_string(&points)),
            other => {
                self.in_progress = other;
                None
            }
        }
    }

    fn commit(&mut self, geometry: Geometry) -> Option<DrawOutput> {
        if let Err(e) = geometry.validate() {
            tracing::debug!(error = %e, "Dropped degenerate geometry");
            return None;
        }
        let output = match self.editing.take() {
            Some(id) => DrawOutput::Edited { id, geometry },
            None => DrawOutput::Created(geometry),
        };
        self.mode = DrawMode::Idle;
        Some(output)
    }

    /// Select or delete the topmost annotation under `point`.
    pub fn pick(
        &mut self,
        annotations: &[AnnotationRecord],
        point: Pixel,
        viewport: &SpectrogramWindow,
        dimensions: Dimensions,
        tolerance: f64,
    ) -> Option<DrawOutput> {
        if self.disabled {
            return None;
        }
        let output: fn(AnnotationId) -> DrawOutput = match self.mode {
            DrawMode::Selecting => DrawOutput::Selected,
            DrawMode::Deleting => DrawOutput::Deleted,
            _ => return None,
        };
        pick_annotation(annotations, point, viewport, dimensions, tolerance).map(output)
    }

    /// Geometry shown while a gesture is in progress.
    pub fn preview(&self) -> Option<Geometry> {
        match self.in_progress.as_ref()? {
            InProgress::Drag { start, current } => Some(match self.geometry_type {
                GeometryType::TimeStamp => Geometry::TimeStamp(current.time),
                GeometryType::TimeInterval => Geometry::time_interval(start.time, current.time),
                _ => Geometry::bounding_box(*start, *current),
            }),
            InProgress::Line { points, hover } => {
                let mut points = points.clone();
                points.extend(*hover);
                Some(Geometry::line_string(&points))
            }
        }
    }

    /// Draw the in-progress preview with the creation style.
    pub fn draw(&self, canvas: &mut dyn Canvas, viewport: &SpectrogramWindow) {
        self.draw_with_style(canvas, viewport, &CREATE_STYLE);
    }

    pub fn draw_with_style(&self, canvas: &mut dyn Canvas, viewport: &SpectrogramWindow, style: &Style) {
        if let Some(geometry) = self.preview() {
            let shape = geometry.scale_to_viewport(canvas.size(), viewport);
            draw_shape(canvas, &shape, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(time: f64, freq: f64) -> Position {
        Position::new(time, freq)
    }

    fn drawing(geometry_type: GeometryType) -> AnnotationDraw {
        let mut draw = AnnotationDraw::new(geometry_type);
        draw.enable_drawing();
        draw
    }

    #[test]
    fn test_timestamp_commits_release_position() {
        let mut draw = drawing(GeometryType::TimeStamp);
        draw.pointer_down(p(1.0, 0.0));
        draw.pointer_move(p(1.5, 0.0));
        assert_eq!(draw.preview(), Some(Geometry::TimeStamp(1.5)));
        let out = draw.pointer_up(p(2.0, 0.0));
        assert_eq!(out, Some(DrawOutput::Created(Geometry::TimeStamp(2.0))));
        assert_eq!(draw.mode(), DrawMode::Idle);
    }

    #[test]
    fn test_interval_normalizes_direction() {
        let mut draw = drawing(GeometryType::TimeInterval);
        draw.pointer_down(p(3.0, 0.0));
        let out = draw.pointer_up(p(1.0, 0.0));
        assert_eq!(
            out,
            Some(DrawOutput::Created(Geometry::TimeInterval([1.0, 3.0])))
        );
    }

    #[test]
    fn test_zero_span_drag_discarded() {
        let mut draw = drawing(GeometryType::TimeInterval);
        draw.pointer_down(p(2.0, 100.0));
        assert_eq!(draw.pointer_up(p(2.0, 500.0)), None);
        assert!(!draw.is_active());

        let mut draw = drawing(GeometryType::BoundingBox);
        draw.pointer_down(p(1.0, 100.0));
        assert_eq!(draw.pointer_up(p(2.0, 100.0)), None);
        assert_eq!(draw.mode(), DrawMode::Drawing);
    }

    #[test]
    fn test_line_string_double_click() {
        let mut draw = drawing(GeometryType::LineString);
        draw.pointer_down(p(0.0, 100.0));
        assert_eq!(draw.pointer_up(p(0.0, 100.0)), None);
        draw.pointer_move(p(0.5, 150.0));
        draw.pointer_down(p(1.0, 200.0));
        let out = draw.double_click(p(2.0, 300.0));
        assert_eq!(
            out,
            Some(DrawOutput::Created(Geometry::LineString(vec![
                [0.0, 100.0],
                [1.0, 200.0],
                [2.0, 300.0]
            ])))
        );
    }

    #[test]
    fn test_repeated_press_adds_one_vertex() {
        let mut draw = drawing(GeometryType::LineString);
        draw.pointer_down(p(0.0, 100.0));
        draw.pointer_up(p(0.0, 100.0));
        draw.pointer_down(p(1.0, 200.0));
        draw.pointer_up(p(1.0, 200.0));
        draw.pointer_down(p(1.0, 200.0));
        draw.pointer_up(p(1.0, 200.0));
        assert_eq!(
            draw.double_click(p(1.0, 200.0)),
            Some(DrawOutput::Created(Geometry::LineString(vec![[0.0, 100.0], [1.0, 200.0]])))
        );
    }

    #[test]
    fn test_single_vertex_line_not_committed() {
        let mut draw = drawing(GeometryType::LineString);
        draw.pointer_down(p(1.0, 100.0));
        assert_eq!(draw.finish(), None);
        assert!(!draw.is_active());
    }

    #[test]
    fn test_mode_change_discards_gesture() {
        let mut draw = drawing(GeometryType::BoundingBox);
        draw.pointer_down(p(1.0, 100.0));
        draw.pointer_move(p(2.0, 200.0));
        draw.enable_selecting();
        assert!(!draw.is_active());
        assert_eq!(draw.pointer_up(p(2.0, 200.0)), None);
    }

    #[test]
    fn test_disable_mid_gesture() {
        let mut draw = drawing(GeometryType::TimeInterval);
        draw.pointer_down(p(1.0, 0.0));
        draw.set_enabled(false);
        assert_eq!(draw.pointer_up(p(3.0, 0.0)), None);
        draw.set_enabled(true);
        assert_eq!(draw.mode(), DrawMode::Idle);
    }

    #[test]
    fn test_geometry_type_change_resets() {
        let mut draw = drawing(GeometryType::TimeInterval);
        draw.pointer_down(p(1.0, 0.0));
        draw.set_geometry_type(GeometryType::BoundingBox);
        assert!(!draw.is_active());
        assert_eq!(draw.mode(), DrawMode::Drawing);
    }

    #[test]
    fn test_editing_emits_replacement() {
        let mut draw = AnnotationDraw::new(GeometryType::TimeStamp);
        draw.enable_editing(42, GeometryType::TimeInterval);
        draw.pointer_down(p(1.0, 0.0));
        let out = draw.pointer_up(p(2.0, 0.0));
        assert_eq!(
            out,
            Some(DrawOutput::Edited {
                id: 42,
                geometry: Geometry::TimeInterval([1.0, 2.0])
            })
        );
        assert_eq!(draw.editing(), None);
    }

    #[test]
    fn test_pick_in_select_and_delete_modes() {
        use crate::interval::Interval;
        let viewport = SpectrogramWindow::new(Interval::new(0.0, 10.0), Interval::new(0.0, 1000.0));
        let dims = Dimensions::new(100.0, 100.0);
        let annotations = vec![AnnotationRecord {
            id: 7,
            geometry: Geometry::TimeStamp(5.0),
        }];

        let mut draw = AnnotationDraw::default();
        assert_eq!(draw.pick(&annotations, Pixel::new(50.0, 10.0), &viewport, dims, 3.0), None);

        draw.enable_selecting();
        assert_eq!(
            draw.pick(&annotations, Pixel::new(51.0, 10.0), &viewport, dims, 3.0),
            Some(DrawOutput::Selected(7))
        );
        draw.enable_deleting();
        assert_eq!(
            draw.pick(&annotations, Pixel::new(49.0, 10.0), &viewport, dims, 3.0),
            Some(DrawOutput::Deleted(7))
        );
        assert_eq!(draw.pick(&annotations, Pixel::new(90.0, 10.0), &viewport, dims, 3.0), None);
    }
}
