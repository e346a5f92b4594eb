//! # Geometry Utilities
//!
//! Bounding boxes, rays and the two intersection tests the voxelizer leans on:
//!
//! - [`Ray3d::triangle_intersection`]: Möller–Trumbore ray/triangle test
//! - [`tri_box_overlap`]: separating-axis triangle/box overlap
//!
//! Everything here is a pure function of its inputs.

use std::fmt;

use crate::math::Vec3d;

/// Axis-aligned bounding box in double precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox3d {
    min: Vec3d,
    max: Vec3d,
}

impl BBox3d {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(min: Vec3d, max: Vec3d) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point will extend.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            min: Vec3d::splat(f64::INFINITY),
            max: Vec3d::splat(f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing every point of `points`.
    ///
    /// Returns an empty box for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Vec3d>>(points: I) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.extend_by(p);
        }
        bbox
    }

    /// Minimum corner
    #[inline]
    #[must_use]
    pub const fn min(&self) -> Vec3d {
        self.min
    }

    /// Maximum corner
    #[inline]
    #[must_use]
    pub const fn max(&self) -> Vec3d {
        self.max
    }

    /// True until at least one point has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3d {
        self.max - self.min
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec3d {
        (self.min + self.max) * 0.5
    }

    /// Grows the box to include `point`.
    pub fn extend_by(&mut self, point: Vec3d) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grows the box to include `other`.
    pub fn extend_by_box(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Inclusive point containment.
    #[must_use]
    pub fn contains(&self, p: Vec3d) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Inclusive overlap test: touching boxes intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let t = (other.center() - self.center()).abs();
        let reach = (self.size() + other.size()) * 0.5;
        t.x <= reach.x && t.y <= reach.y && t.z <= reach.z
    }

    /// Exact triangle overlap (separating axis theorem).
    #[must_use]
    pub fn intersects_triangle(&self, tri: [Vec3d; 3]) -> bool {
        tri_box_overlap(self.center(), self.size() * 0.5, tri)
    }
}

impl Default for BBox3d {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for BBox3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}

/// A ray with an unnormalized direction.
///
/// Intersection depths are reported in units of `direction`, so a direction
/// spanning exactly one voxel yields depths in `[0, 1)` for hits inside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray3d {
    /// Ray origin
    pub origin: Vec3d,
    /// Ray direction (length defines the depth unit)
    pub direction: Vec3d,
}

impl Ray3d {
    /// Creates a new ray.
    #[must_use]
    pub const fn new(origin: Vec3d, direction: Vec3d) -> Self {
        Self { origin, direction }
    }

    /// Point along the ray at depth `t`.
    #[must_use]
    pub fn at(&self, t: f64) -> Vec3d {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// Returns the depth of the hit, which may be negative (behind the origin).
    /// The parallel test compares the normalized triple product against
    /// `epsilon`, which keeps it independent of mesh scale. Barycentric bounds
    /// are widened by `epsilon` so hits on a shared edge are not lost.
    #[must_use]
    pub fn triangle_intersection(&self, tri: [Vec3d; 3], epsilon: f64) -> Option<f64> {
        let [v0, v1, v2] = tri;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);

        let scale = self.direction.length() * edge1.length() * edge2.length();
        if scale == 0.0 || (det / scale).abs() < epsilon {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = self.origin - v0;
        let u = tvec.dot(pvec) * inv_det;
        if u < -epsilon || u > 1.0 + epsilon {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = self.direction.dot(qvec) * inv_det;
        if v < -epsilon || u + v > 1.0 + epsilon {
            return None;
        }

        Some(edge2.dot(qvec) * inv_det)
    }
}

/// Separating-axis triangle/box overlap test.
///
/// `center`/`half_size` describe the box. Touching counts as overlap.
#[must_use]
pub fn tri_box_overlap(center: Vec3d, half_size: Vec3d, tri: [Vec3d; 3]) -> bool {
    let v = [tri[0] - center, tri[1] - center, tri[2] - center];
    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];
    let basis = [
        Vec3d::X,
        Vec3d::new(0.0, 1.0, 0.0),
        Vec3d::new(0.0, 0.0, 1.0),
    ];

    let separated_on = |axis: Vec3d| -> bool {
        let p0 = axis.dot(v[0]);
        let p1 = axis.dot(v[1]);
        let p2 = axis.dot(v[2]);
        let lo = p0.min(p1).min(p2);
        let hi = p0.max(p1).max(p2);
        let a = axis.abs();
        let r = half_size.x * a.x + half_size.y * a.y + half_size.z * a.z;
        lo > r || hi < -r
    };

    // 9 edge/axis cross products
    for edge in edges {
        for unit in basis {
            let axis = unit.cross(edge);
            if axis.length_squared() > 0.0 && separated_on(axis) {
                return false;
            }
        }
    }

    // Box face normals
    for unit in basis {
        if separated_on(unit) {
            return false;
        }
    }

    // Triangle plane
    let normal = edges[0].cross(edges[1]);
    if normal.length_squared() > 0.0 && separated_on(normal) {
        return false;
    }

    true
}
