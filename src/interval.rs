//! Interval arithmetic and the mapping between domain space (seconds, Hz)
//! and pixel space.
//!
//! Pixel space has its origin at the top-left corner of the canvas. Time
//! grows to the right and frequency grows upwards, so the frequency axis is
//! flipped when scaled to pixels.

use serde::{Deserialize, Serialize};

/// Smallest time span (seconds) a viewport may shrink to.
pub const MIN_TIME_SPAN: f64 = 1e-4;

/// Smallest frequency span (Hz) a viewport may shrink to.
pub const MIN_FREQ_SPAN: f64 = 1.0;

/// A closed range `[min, max]` over one real-valued axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Build an interval, swapping the ends if given out of order.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// True if `self` lies entirely inside `other`.
    pub fn is_within(&self, other: &Interval) -> bool {
        self.min >= other.min && self.max <= other.max
    }

    /// Overlap of two intervals. Intervals that only touch at an end point
    /// do not intersect.
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min < max {
            Some(Interval { min, max })
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &Interval) -> bool {
        self.intersection(other).is_some()
    }

    pub fn shift(&self, delta: f64) -> Interval {
        Interval {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Grow both ends by `amount`.
    pub fn expand(&self, amount: f64) -> Interval {
        Interval {
            min: self.min - amount,
            max: self.max + amount,
        }
    }

    /// Interval of the given span centered on `center`.
    pub fn centered_on(center: f64, span: f64) -> Interval {
        Interval {
            min: center - span / 2.0,
            max: center + span / 2.0,
        }
    }

    /// Fit `self` inside `bounds`.
    ///
    /// The span is first limited to `[min_span, bounds.span()]`, then the
    /// interval is shifted (not truncated) so it lies within the bounds.
    /// The result never leaves `bounds`, even by rounding.
    pub fn fit_within(&self, bounds: &Interval, min_span: f64) -> Interval {
        let bounds_span = bounds.span();
        let span = self.span().max(min_span.min(bounds_span)).min(bounds_span);
        if span >= bounds_span {
            return *bounds;
        }
        let mut candidate = Interval::centered_on(self.center(), span);

        if candidate.min < bounds.min {
            candidate = Interval {
                min: bounds.min,
                max: bounds.min + span,
            };
        }
        if candidate.max > bounds.max {
            candidate = Interval {
                min: bounds.max - span,
                max: bounds.max,
            };
        }
        Interval {
            min: candidate.min.max(bounds.min),
            max: candidate.max.min(bounds.max),
        }
    }

    /// Relative position of `value` within the interval (0 at `min`, 1 at `max`).
    pub fn fraction_of(&self, value: f64) -> f64 {
        let span = self.span();
        if span == 0.0 {
            return 0.0;
        }
        (value - self.min) / span
    }

    /// Inverse of [`Interval::fraction_of`].
    pub fn lerp(&self, fraction: f64) -> f64 {
        self.min + fraction * self.span()
    }
}

/// Free-function form of [`Interval::intersection`].
pub fn interval_intersection(a: &Interval, b: &Interval) -> Option<Interval> {
    a.intersection(b)
}

/// A time × frequency rectangle in domain space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectrogramWindow {
    pub time: Interval,
    pub freq: Interval,
}

impl SpectrogramWindow {
    pub fn new(time: Interval, freq: Interval) -> Self {
        Self { time, freq }
    }

    pub fn is_finite(&self) -> bool {
        self.time.is_finite() && self.freq.is_finite()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.time.contains(position.time) && self.freq.contains(position.freq)
    }

    pub fn is_within(&self, other: &SpectrogramWindow) -> bool {
        self.time.is_within(&other.time) && self.freq.is_within(&other.freq)
    }

    pub fn center(&self) -> Position {
        Position {
            time: self.time.center(),
            freq: self.freq.center(),
        }
    }
}

/// A point in domain space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub time: f64,
    pub freq: f64,
}

impl Position {
    pub fn new(time: f64, freq: f64) -> Self {
        Self { time, freq }
    }
}

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Pixel) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub min: Pixel,
    pub max: Pixel,
}

impl PixelRect {
    pub fn from_corners(a: Pixel, b: Pixel) -> Self {
        Self {
            min: Pixel::new(a.x.min(b.x), a.y.min(b.y)),
            max: Pixel::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: Pixel) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn expand(&self, amount: f64) -> Self {
        Self {
            min: Pixel::new(self.min.x - amount, self.min.y - amount),
            max: Pixel::new(self.max.x + amount, self.max.y + amount),
        }
    }
}

/// Map a time (seconds) to an x coordinate.
pub fn scale_time_to_viewport(time: f64, viewport: &SpectrogramWindow, width: f64) -> f64 {
    viewport.time.fraction_of(time) * width
}

/// Map a frequency (Hz) to a y coordinate. Higher frequencies are drawn
/// closer to the top of the canvas.
pub fn scale_freq_to_viewport(freq: f64, viewport: &SpectrogramWindow, height: f64) -> f64 {
    height - viewport.freq.fraction_of(freq) * height
}

pub fn scale_position_to_viewport(
    position: Position,
    viewport: &SpectrogramWindow,
    dimensions: Dimensions,
) -> Pixel {
    Pixel {
        x: scale_time_to_viewport(position.time, viewport, dimensions.width),
        y: scale_freq_to_viewport(position.freq, viewport, dimensions.height),
    }
}

/// Inverse of [`scale_position_to_viewport`].
pub fn scale_pixel_to_window(
    pixel: Pixel,
    viewport: &SpectrogramWindow,
    dimensions: Dimensions,
) -> Position {
    if dimensions.is_empty() {
        return viewport.center();
    }
    Position {
        time: viewport.time.lerp(pixel.x / dimensions.width),
        freq: viewport.freq.lerp(1.0 - pixel.y / dimensions.height),
    }
}

/// Convert a pixel displacement into a domain displacement.
pub fn scale_pixel_delta(
    dx: f64,
    dy: f64,
    viewport: &SpectrogramWindow,
    dimensions: Dimensions,
) -> Position {
    if dimensions.is_empty() {
        return Position::default();
    }
    Position {
        time: dx / dimensions.width * viewport.time.span(),
        freq: -dy / dimensions.height * viewport.freq.span(),
    }
}
