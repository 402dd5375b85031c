//! Overlap tests and rectangles.
//!
//! Collision is circle or axis-aligned box overlap only; nothing here
//! integrates forces.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Smallest distance treated as non-zero before dividing by it.
pub const EPSILON: f32 = 1e-4;

/// Check if two circles overlap.
#[inline]
pub fn circles_overlap(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> bool {
    let combined = radius_a + radius_b;
    pos_a.distance_squared(pos_b) <= combined * combined
}

/// Check if two axis-aligned squares (given by center and half extent) overlap.
#[inline]
pub fn aabb_overlap(pos_a: Vec2, half_a: f32, pos_b: Vec2, half_b: f32) -> bool {
    let reach = half_a + half_b;
    (pos_a.x - pos_b.x).abs() < reach && (pos_a.y - pos_b.y).abs() < reach
}

/// Unit direction from `from` to `to`, or `None` when the points coincide.
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> Option<Vec2> {
    let delta = to - from;
    let length = delta.length();
    if length < EPSILON {
        None
    } else {
        Some(delta / length)
    }
}

/// Axis-aligned rectangle used for world bounds and the boss arena.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Rect {
    /// Rectangle centered on `center` with the given half extents.
    pub fn centered(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half extents.
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Whether the point lies inside (edges inclusive).
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Clamp a circle's center so the whole circle stays inside.
    ///
    /// If the rectangle is narrower than the circle, the center is pinned to
    /// the rectangle's middle on that axis.
    pub fn clamp_circle(&self, point: Vec2, radius: f32) -> Vec2 {
        let lo = self.min + Vec2::splat(radius);
        let hi = self.max - Vec2::splat(radius);
        let center = self.center();
        Vec2::new(
            if lo.x <= hi.x { point.x.clamp(lo.x, hi.x) } else { center.x },
            if lo.y <= hi.y { point.y.clamp(lo.y, hi.y) } else { center.y },
        )
    }

    /// Shift this rectangle so it lies inside `outer`, shrinking it if it
    /// is larger than `outer` on some axis.
    pub fn fit_within(&self, outer: &Rect) -> Rect {
        let half = self.half_extents().min(outer.half_extents());
        let center = outer.clamp_circle(self.center(), 0.0);
        let lo = outer.min + half;
        let hi = outer.max - half;
        let center = Vec2::new(center.x.clamp(lo.x, hi.x), center.y.clamp(lo.y, hi.y));
        Rect::centered(center, half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circles_overlap() {
        let a = Vec2::ZERO;
        let b = Vec2::new(1.0, 0.0);

        // Distance 1.0, combined radius 1.2
        assert!(circles_overlap(a, 0.6, b, 0.6));

        let c = Vec2::new(2.0, 0.0);
        assert!(!circles_overlap(a, 0.6, c, 0.6));
    }

    #[test]
    fn test_aabb_overlap_is_per_axis() {
        // Diagonal distance larger than the sum of radii, but boxes overlap
        let a = Vec2::ZERO;
        let b = Vec2::new(9.0, 9.0);
        assert!(aabb_overlap(a, 5.0, b, 5.0));
        assert!(!circles_overlap(a, 5.0, b, 5.0));

        assert!(!aabb_overlap(a, 5.0, Vec2::new(10.5, 0.0), 5.0));
    }

    #[test]
    fn test_direction_to_degenerate() {
        assert!(direction_to(Vec2::ONE, Vec2::ONE).is_none());
        let d = direction_to(Vec2::ZERO, Vec2::new(0.0, 3.0)).unwrap();
        assert!((d - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn test_rect_clamp_circle() {
        let rect = Rect::centered(Vec2::ZERO, Vec2::new(100.0, 50.0));
        let p = rect.clamp_circle(Vec2::new(500.0, -500.0), 10.0);
        assert_eq!(p, Vec2::new(90.0, -40.0));
        assert!(rect.contains(p));
    }

    #[test]
    fn test_rect_fit_within() {
        let world = Rect::centered(Vec2::ZERO, Vec2::new(1000.0, 1000.0));

        // Arena hanging off the right edge is shifted back inside
        let arena = Rect::centered(Vec2::new(950.0, 0.0), Vec2::new(400.0, 300.0));
        let fitted = arena.fit_within(&world);
        assert_eq!(fitted.half_extents(), Vec2::new(400.0, 300.0));
        assert!(fitted.max.x <= 1000.0);
        assert_eq!(fitted.center(), Vec2::new(600.0, 0.0));

        // Arena larger than the world shrinks to it
        let huge = Rect::centered(Vec2::ZERO, Vec2::new(5000.0, 10.0));
        let fitted = huge.fit_within(&world);
        assert_eq!(fitted.half_extents().x, 1000.0);
    }
}
