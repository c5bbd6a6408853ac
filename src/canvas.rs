//! The rendering context the compositor draws through, plus the primitive
//! layers (onset line, cursor crosshair, annotation shapes).
//!
//! Coordinates are pixels with the origin at the top-left corner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::geometry::Shape;
use crate::interval::{Dimensions, Pixel, PixelRect};

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(239, 68, 68);
    pub const BLUE: Color = Color::rgb(59, 130, 246);
    pub const EMERALD: Color = Color::rgb(16, 185, 129);
    pub const AMBER: Color = Color::rgb(245, 158, 11);
}

/// Stroke and fill used to draw a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub border_color: Color,
    pub border_width: f64,
    /// `[dash, gap]` lengths in pixels; solid when `None`.
    pub border_dash: Option<[f64; 2]>,
    pub fill_color: Color,
    pub fill_alpha: f64,
}

impl Style {
    pub const fn solid(color: Color, width: f64) -> Self {
        Self {
            border_color: color,
            border_width: width,
            border_dash: None,
            fill_color: color,
            fill_alpha: 0.0,
        }
    }

    /// Fill color with the style's alpha applied.
    pub fn fill(&self) -> Color {
        self.fill_color.with_alpha(self.fill_alpha)
    }
}

/// Preview of a geometry being drawn.
pub const CREATE_STYLE: Style = Style {
    border_color: Color::EMERALD,
    border_width: 2.0,
    border_dash: Some([5.0, 5.0]),
    fill_color: Color::EMERALD,
    fill_alpha: 0.2,
};

/// Committed annotations.
pub const IDLE_STYLE: Style = Style {
    border_color: Color::BLUE,
    border_width: 2.0,
    border_dash: None,
    fill_color: Color::BLUE,
    fill_alpha: 0.1,
};

/// The selected annotation.
pub const SELECTED_STYLE: Style = Style {
    border_color: Color::AMBER,
    border_width: 3.0,
    border_dash: None,
    fill_color: Color::AMBER,
    fill_alpha: 0.2,
};

/// An annotation under the pointer while deleting.
pub const DELETE_STYLE: Style = Style {
    border_color: Color::RED,
    border_width: 3.0,
    border_dash: Some([4.0, 4.0]),
    fill_color: Color::RED,
    fill_alpha: 0.3,
};

/// Zoom rectangle overlay.
pub const ZOOM_STYLE: Style = Style {
    border_color: Color::WHITE,
    border_width: 1.0,
    border_dash: Some([3.0, 3.0]),
    fill_color: Color::WHITE,
    fill_alpha: 0.15,
};

pub const ONSET_STYLE: Style = Style::solid(Color::RED, 1.5);

pub const CURSOR_STYLE: Style = Style {
    border_color: Color::WHITE,
    border_width: 1.0,
    border_dash: Some([2.0, 4.0]),
    fill_color: Color::WHITE,
    fill_alpha: 0.0,
};

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded RGBA chunk image. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChunkImage {
    id: u64,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl ChunkImage {
    /// `pixels` is row-major RGBA, top row first.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Unique per decoded image; renderers key texture caches on it.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Same pixels, regardless of which decode produced them.
impl PartialEq for ChunkImage {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.pixels == other.pixels
    }
}

/// Sub-rectangle of an image in normalized `[0, 1]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f64,
    pub v0: f64,
    pub u1: f64,
    pub v1: f64,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };
}

/// Rendering context.
pub trait Canvas {
    fn size(&self) -> Dimensions;

    /// Draw the `source` region of `image` stretched into `dest`.
    fn draw_image(&mut self, image: &ChunkImage, source: UvRect, dest: PixelRect);

    fn draw_line(&mut self, from: Pixel, to: Pixel, style: &Style);

    fn draw_rect(&mut self, rect: PixelRect, style: &Style);

    fn draw_polyline(&mut self, points: &[Pixel], style: &Style);

    fn draw_circle(&mut self, center: Pixel, radius: f64, style: &Style);
}

/// Playback position marker.
pub fn draw_onset(canvas: &mut dyn Canvas, x: f64) {
    let height = canvas.size().height;
    canvas.draw_line(Pixel::new(x, 0.0), Pixel::new(x, height), &ONSET_STYLE);
}

/// Crosshair under the pointer.
pub fn draw_cursor(canvas: &mut dyn Canvas, at: Pixel) {
    let size = canvas.size();
    canvas.draw_line(Pixel::new(at.x, 0.0), Pixel::new(at.x, size.height), &CURSOR_STYLE);
    canvas.draw_line(Pixel::new(0.0, at.y), Pixel::new(size.width, at.y), &CURSOR_STYLE);
}

/// Vertex marker radius for line strings.
const VERTEX_RADIUS: f64 = 3.0;

/// Draw a projected geometry.
pub fn draw_shape(canvas: &mut dyn Canvas, shape: &Shape, style: &Style) {
    let height = canvas.size().height;
    match shape {
        Shape::VerticalLine { x } => {
            canvas.draw_line(Pixel::new(*x, 0.0), Pixel::new(*x, height), style);
        }
        Shape::VerticalBand { x0, x1 } => {
            let rect = PixelRect::from_corners(Pixel::new(*x0, 0.0), Pixel::new(*x1, height));
            canvas.draw_rect(rect, style);
        }
        Shape::Rect(rect) => canvas.draw_rect(*rect, style),
        Shape::Polyline(points) => {
            canvas.draw_polyline(points, style);
            for p in points {
                canvas.draw_circle(*p, VERTEX_RADIUS, style);
            }
        }
    }
}
