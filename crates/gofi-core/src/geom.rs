//! Planar geometry: points/vectors, oriented boxes and angle helpers.
//!
//! All quantities are metres and radians in the map frame.  Headings are
//! measured counter-clockwise from the +x axis.

use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Wrap an angle into `[-π, π)`.
#[inline]
pub fn wrap_angle(a: f64) -> f64 {
    (a + PI).rem_euclid(2.0 * PI) - PI
}

// ── Vec2 ──────────────────────────────────────────────────────────────────────

/// A 2-D point or vector.  Serialised as `[x, y]`.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[f64; 2]", into = "[f64; 2]"))]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `heading`.
    #[inline]
    pub fn from_heading(heading: f64) -> Self {
        Self::new(heading.cos(), heading.sin())
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3-D cross product.
    #[inline]
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).norm()
    }

    /// Direction angle of the vector.  `0.0` for the zero vector.
    #[inline]
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Unit vector in the same direction, or zero if the norm is negligible.
    pub fn normalized(self) -> Vec2 {
        let n = self.norm();
        if n < 1e-12 { Vec2::ZERO } else { self * (1.0 / n) }
    }

    /// Rotate counter-clockwise by `angle` radians.
    pub fn rotated(self, angle: f64) -> Vec2 {
        let (s, c) = angle.sin_cos();
        Vec2::new(c * self.x - s * self.y, s * self.x + c * self.y)
    }

    /// Left-hand normal (rotated +90°).
    #[inline]
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    #[inline]
    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self + (other - self) * t
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Vec2::new(x, y)
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ── BoundingBox ───────────────────────────────────────────────────────────────

/// An oriented rectangle: used for spawn poses, goal regions and vehicle
/// footprints.  `length` runs along `heading`, `width` across it.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub center:  Vec2,
    pub length:  f64,
    pub width:   f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub heading: f64,
}

impl BoundingBox {
    pub fn new(center: Vec2, length: f64, width: f64, heading: f64) -> Self {
        Self { center, length, width, heading }
    }

    /// `true` if `point` lies inside or on the boundary.
    pub fn contains(&self, point: Vec2) -> bool {
        let local = (point - self.center).rotated(-self.heading);
        local.x.abs() <= self.length * 0.5 + 1e-9 && local.y.abs() <= self.width * 0.5 + 1e-9
    }

    /// The four corners in counter-clockwise order starting front-left.
    pub fn corners(&self) -> [Vec2; 4] {
        let fwd  = Vec2::from_heading(self.heading) * (self.length * 0.5);
        let left = Vec2::from_heading(self.heading).perp() * (self.width * 0.5);
        [
            self.center + fwd + left,
            self.center - fwd + left,
            self.center - fwd - left,
            self.center + fwd - left,
        ]
    }

    /// Separating-axis overlap test between two oriented boxes.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        let a = self.corners();
        let b = other.corners();
        let axes = [
            Vec2::from_heading(self.heading),
            Vec2::from_heading(self.heading).perp(),
            Vec2::from_heading(other.heading),
            Vec2::from_heading(other.heading).perp(),
        ];
        axes.iter().all(|&axis| {
            let (a_min, a_max) = project(&a, axis);
            let (b_min, b_max) = project(&b, axis);
            a_max >= b_min && b_max >= a_min
        })
    }

    /// The same box moved to `center` and rotated to `heading`.
    pub fn moved_to(&self, center: Vec2, heading: f64) -> BoundingBox {
        BoundingBox { center, heading, ..*self }
    }
}

fn project(corners: &[Vec2; 4], axis: Vec2) -> (f64, f64) {
    corners.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        let d = c.dot(axis);
        (lo.min(d), hi.max(d))
    })
}
