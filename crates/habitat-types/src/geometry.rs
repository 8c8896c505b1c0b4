//! Planar world coordinates.
//!
//! The simulation runs on a flat ground plane; height never matters to
//! discovery, navigation or distribution, so positions are two-dimensional.

use core::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point (or displacement) on the ground plane, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// East-west coordinate.
    pub x: f64,
    /// North-south coordinate.
    pub y: f64,
}

impl Position {
    /// The world origin.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Construct a position from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Length of this position treated as a vector.
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Multiply both coordinates by `factor`.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Unit vector in the same direction, or the origin for a zero vector.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f64::EPSILON {
            Self::ORIGIN
        } else {
            self.scale(1.0 / len)
        }
    }

    /// Linear interpolation towards `target`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, target: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        self + (target - self).scale(t)
    }

    /// Heading angle of this vector in radians, measured from the +x axis.
    pub fn heading(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Unit vector pointing along `angle` radians.
    pub fn from_heading(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Whether the two points are within `tolerance` of each other.
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < EPS);
        assert!((b.distance(a) - 5.0).abs() < EPS);
    }

    #[test]
    fn normalizing_zero_is_safe() {
        assert!(Position::ORIGIN.normalized().approx_eq(Position::ORIGIN, EPS));
        let unit = Position::new(10.0, 0.0).normalized();
        assert!(unit.approx_eq(Position::new(1.0, 0.0), EPS));
    }

    #[test]
    fn lerp_clamps_factor() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(10.0, 0.0);
        assert!(a.lerp(b, 0.5).approx_eq(Position::new(5.0, 0.0), EPS));
        assert!(a.lerp(b, 2.0).approx_eq(b, EPS));
        assert!(a.lerp(b, -1.0).approx_eq(a, EPS));
    }

    #[test]
    fn heading_round_trips() {
        let dir = Position::from_heading(core::f64::consts::FRAC_PI_2);
        assert!(dir.approx_eq(Position::new(0.0, 1.0), EPS));
        assert!((dir.heading() - core::f64::consts::FRAC_PI_2).abs() < EPS);
    }
}
