//! Axis-aligned box geometry.
//!
//! Pure predicates shared by the correlation engine and the compositor.
//! Containment is strict: a point on a box edge is outside. That boundary
//! policy is what keeps panel assignment deterministic when boxes touch, so
//! it is a contract, not an implementation detail.

use serde::Serialize;

use crate::GeometryError;

/// Axis-aligned rectangle in image pixel coordinates.
///
/// Invariant: `x1 <= x2`, `y1 <= y2`, all coordinates finite and
/// non-negative. [`Rect::new`] enforces it; the fields stay public so
/// detector backends can assemble layouts that hold it by construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    /// Validate and build a rect. Rejects non-finite, negative, and
    /// inverted coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, GeometryError> {
        if [x1, y1, x2, y2].iter().any(|c| !c.is_finite()) {
            return Err(GeometryError::NotFinite { x1, y1, x2, y2 });
        }
        if [x1, y1, x2, y2].iter().any(|c| *c < 0.0) {
            return Err(GeometryError::Negative { x1, y1, x2, y2 });
        }
        if x1 > x2 || y1 > y2 {
            return Err(GeometryError::Inverted { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Arithmetic mean of the corner coordinates, per axis.
    pub fn midpoint(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Strict interior test: `x1 < x < x2 && y1 < y < y2`.
    ///
    /// A point exactly on an edge is not contained. A degenerate
    /// (zero-width or zero-height) rect contains nothing, including its own
    /// midpoint.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.x1 < x && x < self.x2 && self.y1 < y && y < self.y2
    }

    /// Box area, non-negative for any validated rect.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    /// Lexicographic sort key for canonical detection ordering.
    pub(crate) fn ord_key(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}
