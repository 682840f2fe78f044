//! Compact triangle encoding and ray intersection.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use helio_core::TrianglePositions;
use helio_math::{Interval, Ray, Vec3};

/// Intersection-optimized triangle: one vertex plus two edge vectors.
///
/// Precomputing the edges once avoids redoing the subtraction in every
/// intersection test. Triangles are immutable after construction and live in
/// the spatial index's leaf-ordered primitive array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    v0: Vec3,
    e1: Vec3,
    e2: Vec3,
}

/// Barycentric hit of a single triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Ray parameter at the hit
    pub t: f32,
    /// Barycentric coordinate along the first edge
    pub u: f32,
    /// Barycentric coordinate along the second edge
    pub v: f32,
}

impl Triangle {
    /// Build the compact encoding from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            v0,
            e1: v1 - v0,
            e2: v2 - v0,
        }
    }

    /// First vertex of the triangle.
    #[inline]
    pub fn v0(&self) -> Vec3 {
        self.v0
    }

    /// Edge from the first to the second vertex.
    #[inline]
    pub fn edge1(&self) -> Vec3 {
        self.e1
    }

    /// Edge from the first to the third vertex.
    #[inline]
    pub fn edge2(&self) -> Vec3 {
        self.e2
    }

    /// Geometric normal (unit length, right-handed winding).
    ///
    /// Zero for degenerate triangles.
    pub fn geometric_normal(&self) -> Vec3 {
        self.e1.cross(self.e2).normalize_or_zero()
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns a hit only for `t` strictly inside `t_range`, so the caller's
    /// self-intersection epsilon and current-best distance both prune here.
    pub fn intersect(&self, ray: &Ray, t_range: Interval) -> Option<TriangleHit> {
        const EPSILON: f32 = 1e-5;

        let h = ray.direction.cross(self.e2);
        let det = self.e1.dot(h);

        // Ray is parallel to the triangle plane
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let u = inv_det * s.dot(h);

        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.e1);
        let v = inv_det * ray.direction.dot(q);

        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * self.e2.dot(q);

        if !t_range.surrounds(t) {
            return None;
        }

        Some(TriangleHit { t, u, v })
    }
}

impl From<&TrianglePositions> for Triangle {
    fn from(positions: &TrianglePositions) -> Self {
        Self::new(positions.v0, positions.v1, positions.v2)
    }
}
