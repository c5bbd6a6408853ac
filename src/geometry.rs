//! Annotation geometries in domain space and their pixel-space projections.

use crate::error::GeometryError;
use crate::interval::{
    scale_freq_to_viewport, scale_position_to_viewport, scale_time_to_viewport, Dimensions,
    Interval, Pixel, PixelRect, Position, SpectrogramWindow,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The shape families a sound event can be annotated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeometryType {
    #[default]
    TimeStamp,
    TimeInterval,
    BoundingBox,
    LineString,
}

impl GeometryType {
    pub const ALL: [GeometryType; 4] = [
        GeometryType::TimeStamp,
        GeometryType::TimeInterval,
        GeometryType::BoundingBox,
        GeometryType::LineString,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GeometryType::TimeStamp => "Time stamp",
            GeometryType::TimeInterval => "Time interval",
            GeometryType::BoundingBox => "Bounding box",
            GeometryType::LineString => "Line string",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A committed annotation geometry.
///
/// Serializes the same way the annotation API does:
/// `{"type": "BoundingBox", "coordinates": [start, low, end, high]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single instant, in seconds.
    TimeStamp(f64),
    /// `[start_time, end_time]`.
    TimeInterval([f64; 2]),
    /// `[start_time, low_freq, end_time, high_freq]`.
    BoundingBox([f64; 4]),
    /// Sequence of `[time, freq]` vertices.
    LineString(Vec<[f64; 2]>),
}

impl Geometry {
    pub fn time_interval(start: f64, end: f64) -> Self {
        let i = Interval::new(start, end);
        Geometry::TimeInterval([i.min, i.max])
    }

    pub fn bounding_box(a: Position, b: Position) -> Self {
        let time = Interval::new(a.time, b.time);
        let freq = Interval::new(a.freq, b.freq);
        Geometry::BoundingBox([time.min, freq.min, time.max, freq.max])
    }

    pub fn line_string(points: &[Position]) -> Self {
        Geometry::LineString(points.iter().map(|p| [p.time, p.freq]).collect())
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::TimeStamp(_) => GeometryType::TimeStamp,
            Geometry::TimeInterval(_) => GeometryType::TimeInterval,
            Geometry::BoundingBox(_) => GeometryType::BoundingBox,
            Geometry::LineString(_) => GeometryType::LineString,
        }
    }

    /// Time extent covered by the geometry.
    pub fn time_extent(&self) -> Interval {
        match self {
            Geometry::TimeStamp(t) => Interval::new(*t, *t),
            Geometry::TimeInterval([a, b]) => Interval::new(*a, *b),
            Geometry::BoundingBox([t0, _, t1, _]) => Interval::new(*t0, *t1),
            Geometry::LineString(points) => extent(points.iter().map(|p| p[0])),
        }
    }

    /// Frequency extent, for geometries that carry a frequency coordinate.
    pub fn freq_extent(&self) -> Option<Interval> {
        match self {
            Geometry::TimeStamp(_) | Geometry::TimeInterval(_) => None,
            Geometry::BoundingBox([_, f0, _, f1]) => Some(Interval::new(*f0, *f1)),
            Geometry::LineString(points) => Some(extent(points.iter().map(|p| p[1]))),
        }
    }

    /// Reject degenerate geometries.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let finite = match self {
            Geometry::TimeStamp(t) => t.is_finite(),
            Geometry::TimeInterval(c) => c.iter().all(|v| v.is_finite()),
            Geometry::BoundingBox(c) => c.iter().all(|v| v.is_finite()),
            Geometry::LineString(points) => points.iter().flatten().all(|v| v.is_finite()),
        };
        if !finite {
            return Err(GeometryError::InvalidGeometry {
                reason: "non-finite coordinate".to_string(),
            });
        }

        match self {
            Geometry::TimeStamp(_) => Ok(()),
            Geometry::TimeInterval(_) => {
                if self.time_extent().span() > 0.0 {
                    Ok(())
                } else {
                    Err(GeometryError::InvalidGeometry {
                        reason: "time interval has zero duration".to_string(),
                    })
                }
            }
            Geometry::BoundingBox(_) => {
                let freq_span = self.freq_extent().map(|f| f.span()).unwrap_or(0.0);
                if self.time_extent().span() > 0.0 && freq_span > 0.0 {
                    Ok(())
                } else {
                    Err(GeometryError::InvalidGeometry {
                        reason: "bounding box has zero width or height".to_string(),
                    })
                }
            }
            Geometry::LineString(points) => {
                if points.len() >= 2 && points.windows(2).any(|w| w[0] != w[1]) {
                    Ok(())
                } else {
                    Err(GeometryError::InvalidGeometry {
                        reason: "line string needs two distinct vertices".to_string(),
                    })
                }
            }
        }
    }

    /// True if any part of the geometry falls inside `window`.
    pub fn intersects_window(&self, window: &SpectrogramWindow) -> bool {
        let time = self.time_extent();
        let time_hit = if time.span() == 0.0 {
            window.time.contains(time.min)
        } else {
            time.intersects(&window.time)
        };
        if !time_hit {
            return false;
        }
        match self.freq_extent() {
            None => true,
            Some(freq) if freq.span() == 0.0 => window.freq.contains(freq.min),
            Some(freq) => freq.intersects(&window.freq),
        }
    }

    /// Project into pixel space for the given viewport.
    pub fn scale_to_viewport(&self, dimensions: Dimensions, viewport: &SpectrogramWindow) -> Shape {
        let x = |t: f64| scale_time_to_viewport(t, viewport, dimensions.width);
        match self {
            Geometry::TimeStamp(t) => Shape::VerticalLine { x: x(*t) },
            Geometry::TimeInterval([a, b]) => Shape::VerticalBand {
                x0: x(*a),
                x1: x(*b),
            },
            Geometry::BoundingBox([t0, f0, t1, f1]) => {
                let y0 = scale_freq_to_viewport(*f1, viewport, dimensions.height);
                let y1 = scale_freq_to_viewport(*f0, viewport, dimensions.height);
                Shape::Rect(PixelRect::from_corners(
                    Pixel::new(x(*t0), y0),
                    Pixel::new(x(*t1), y1),
                ))
            }
            Geometry::LineString(points) => Shape::Polyline(
                points
                    .iter()
                    .map(|p| {
                        scale_position_to_viewport(Position::new(p[0], p[1]), viewport, dimensions)
                    })
                    .collect(),
            ),
        }
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Interval {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        Interval::default()
    } else {
        Interval { min, max }
    }
}

/// A geometry projected into pixel space.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Full-height line at `x`.
    VerticalLine { x: f64 },
    /// Full-height band between `x0` and `x1`.
    VerticalBand { x0: f64, x1: f64 },
    Rect(PixelRect),
    Polyline(Vec<Pixel>),
}

impl Shape {
    /// Distance-based hit test with a pixel tolerance.
    pub fn hit_test(&self, point: Pixel, tolerance: f64) -> bool {
        match self {
            Shape::VerticalLine { x } => (point.x - x).abs() <= tolerance,
            Shape::VerticalBand { x0, x1 } => {
                point.x >= x0.min(*x1) - tolerance && point.x <= x0.max(*x1) + tolerance
            }
            Shape::Rect(rect) => rect.expand(tolerance).contains(point),
            Shape::Polyline(points) => points
                .windows(2)
                .any(|seg| distance_to_segment(point, seg[0], seg[1]) <= tolerance),
        }
    }
}

fn distance_to_segment(p: Pixel, a: Pixel, b: Pixel) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance_to(&a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance_to(&Pixel::new(a.x + t * dx, a.y + t * dy))
}

/// Identifier of a committed sound-event annotation.
pub type AnnotationId = u64;

/// A committed annotation as seen by the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    pub geometry: Geometry,
}

/// Topmost annotation under `point`, if any.
pub fn pick_annotation(
    annotations: &[AnnotationRecord],
    point: Pixel,
    viewport: &SpectrogramWindow,
    dimensions: Dimensions,
    tolerance: f64,
) -> Option<AnnotationId> {
    annotations
        .iter()
        .rev()
        .filter(|a| a.geometry.intersects_window(viewport))
        .find(|a| {
            a.geometry
                .scale_to_viewport(dimensions, viewport)
                .hit_test(point, tolerance)
        })
        .map(|a| a.id)
}
