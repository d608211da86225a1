//! Compass angle math shared by the rotation controller and the geometry.
//!
//! Bearings are degrees measured clockwise from "up". Screen coordinates have
//! y growing downward, so a bearing projects to `(sin θ, -cos θ)`.

use std::f64::consts::{PI, TAU};

/// A point in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from `center` along `bearing` degrees.
    pub fn on_circle(center: Point, radius: f64, bearing: f64) -> Self {
        let rad = bearing.to_radians();
        Self {
            x: center.x + radius * rad.sin(),
            y: center.y - radius * rad.cos(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Normalize degrees into `[0, 360)`.
///
/// Equivalent to `((degrees % 360) + 360) % 360`, except that a value already
/// in range is returned untouched so the function stays idempotent for tiny
/// magnitudes that would otherwise round to the seam.
pub fn wrap360(degrees: f64) -> f64 {
    let r = degrees % 360.0;
    if r < 0.0 {
        let wrapped = r + 360.0;
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    } else {
        // folds -0.0 into 0.0
        r + 0.0
    }
}

/// Compose a reference bearing with a relative offset.
pub fn add_heading(a: f64, b: f64) -> f64 {
    wrap360(a + b)
}

/// Signed angle at vertex `b` from ray `b→a` to ray `b→c`, in `(-π, π]`.
///
/// Positive values turn clockwise on screen (y down).
pub fn signed_angle_between(a: Point, b: Point, c: Point) -> f64 {
    let from = (a.y - b.y).atan2(a.x - b.x);
    let to = (c.y - b.y).atan2(c.x - b.x);
    let mut angle = to - from;
    if angle > PI {
        angle -= TAU;
    } else if angle <= -PI {
        angle += TAU;
    }
    angle
}
