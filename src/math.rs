// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small 2D vector and bounding-box helpers used by the command front end.

/// A 2D point or direction in screen pixels.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Self) -> Self {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Self) -> Self {
        Vec2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Self {
        Vec2 {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub const fn splat(v: f32) -> Self {
        Vec2 { x: v, y: v }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Counter-clockwise perpendicular.
    pub fn skew(self) -> Vec2 {
        Vec2 {
            x: -self.y,
            y: self.x,
        }
    }

    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2 {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
        }
    }

    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2 {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
        }
    }

    pub fn mix(self, other: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn from_angle(radians: f32) -> Vec2 {
        Vec2 {
            x: radians.cos(),
            y: radians.sin(),
        }
    }

    /// Normalizes in place, returning the original length. Degenerate vectors
    /// are left untouched and report a length of zero.
    pub fn normalize(&mut self) -> f32 {
        let norm = self.length();
        if norm <= f32::EPSILON {
            return 0.0;
        }
        *self = *self * (1.0 / norm);
        norm
    }

    /// True when both coordinates differ by less than `epsilon`.
    pub fn similar(self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

/// Whether `mid` lies within `threshold` pixels of the segment base `p0..p1`,
/// measured as perpendicular distance.
pub fn is_colinear(p0: Vec2, p1: Vec2, mid: Vec2, threshold: f32) -> bool {
    let v0 = p1 - p0;
    let v1 = mid - p0;
    let area = (v0.x * v1.y - v0.y * v1.x).abs();
    let base2 = v0.length_squared();
    if base2 < f32::EPSILON {
        return true;
    }
    let height2 = (area * area) / base2;
    height2 <= threshold * threshold
}

/// An axis-aligned bounding box in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Aabb { min, max }
    }

    pub fn grow(&mut self, amount: Vec2) {
        self.min = self.min - amount;
        self.max = self.max + amount;
    }

    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        Aabb {
            min: center - Vec2::splat(radius),
            max: center + Vec2::splat(radius),
        }
    }

    pub fn from_triangle(v0: Vec2, v1: Vec2, v2: Vec2) -> Self {
        Aabb {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }

    /// Bounds of the rounded oriented box spanned by the segment `p0..p1`
    /// with the given cross width, extended by `border` on every side.
    pub fn from_rounded_obb(p0: Vec2, p1: Vec2, width: f32, border: f32) -> Self {
        let mut dir = p1 - p0;
        dir.normalize();
        let normal = dir.skew() * (width * 0.5 + border);
        let dir = dir * border;
        let p0 = p0 - dir;
        let p1 = p1 + dir;

        let corners = [p0 + normal, p0 - normal, p1 - normal, p1 + normal];
        Aabb {
            min: corners[0].min(corners[1]).min(corners[2]).min(corners[3]),
            max: corners[0].max(corners[1]).max(corners[2]).max(corners[3]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skew_is_ccw_perpendicular() {
        let v = Vec2::new(1.0, 0.0);
        assert_eq!(v.skew(), Vec2::new(0.0, 1.0));
        assert_eq!(v.dot(v.skew()), 0.0);
    }

    #[test]
    fn normalize_degenerate() {
        let mut v = Vec2::splat(0.0);
        assert_eq!(v.normalize(), 0.0);
        assert_eq!(v, Vec2::splat(0.0));
    }

    #[test]
    fn mix_interpolates_endpoints() {
        let a = Vec2::new(10.0, 20.0);
        let b = Vec2::new(30.0, 40.0);
        assert_eq!(a.mix(b, 0.0), a);
        assert_eq!(a.mix(b, 1.0), b);
        assert_eq!(a.mix(b, 0.5), Vec2::new(20.0, 30.0));
    }

    #[test]
    fn colinear_detects_straight_and_bent() {
        let p0 = Vec2::new(0.0, 0.0);
        let p1 = Vec2::new(100.0, 0.0);
        assert!(is_colinear(p0, p1, Vec2::new(50.0, 0.05), 0.1));
        assert!(!is_colinear(p0, p1, Vec2::new(50.0, 3.0), 0.1));
        // Degenerate base counts as colinear.
        assert!(is_colinear(p0, p0, Vec2::new(50.0, 3.0), 0.1));
    }

    #[test]
    fn obb_bounds_contain_segment_ends() {
        let bb = Aabb::from_rounded_obb(Vec2::new(10.0, 10.0), Vec2::new(50.0, 30.0), 8.0, 2.0);
        assert!(bb.min.x < 10.0 && bb.min.y < 10.0);
        assert!(bb.max.x > 50.0 && bb.max.y > 30.0);
    }

    #[test]
    fn axis_aligned_obb_matches_rect() {
        let bb = Aabb::from_rounded_obb(Vec2::new(0.0, 16.0), Vec2::new(64.0, 16.0), 8.0, 0.0);
        assert!((bb.min.y - 12.0).abs() < 1e-4);
        assert!((bb.max.y - 20.0).abs() < 1e-4);
        assert!((bb.min.x - 0.0).abs() < 1e-4);
        assert!((bb.max.x - 64.0).abs() < 1e-4);
    }

    #[test]
    fn grow_expands_both_corners() {
        let mut bb = Aabb::new(Vec2::new(4.0, 6.0), Vec2::new(8.0, 10.0));
        bb.grow(Vec2::splat(2.0));
        assert_eq!(bb.min, Vec2::new(2.0, 4.0));
        assert_eq!(bb.max, Vec2::new(10.0, 12.0));
    }
}
