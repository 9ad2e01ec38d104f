//! Bounding volumes used for culling, sorting and picking
//!
//! Provides the axis-aligned box, plane and view frustum the scene and the
//! renderer share.

use crate::foundation::math::{Mat4, Point3, Ray, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABox {
    /// Box that contains nothing; extending it with any point yields that point
    pub const EMPTY: Self = Self {
        min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
        max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// Box containing all of space
    pub const INFINITE: Self = Self {
        min: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        max: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
    };

    /// Create a new box from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut acc, p| {
            acc.expand_to(p);
            acc
        })
    }

    /// Grow the box to contain `point`
    pub fn expand_to(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// `false` for [`AABox::EMPTY`] and other inverted boxes
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Box enclosing this box after transformation by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if !self.is_valid() {
            return *self;
        }
        let corners = self
            .corners()
            .map(|c| matrix.transform_point(&Point3::from(c)).coords);
        Self::from_points(corners.iter())
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Corner of the box reached first when travelling along `direction`
    pub fn closest_point_along(&self, direction: &Vec3) -> Vec3 {
        Vec3::new(
            if direction.x >= 0.0 { self.min.x } else { self.max.x },
            if direction.y >= 0.0 { self.min.y } else { self.max.y },
            if direction.z >= 0.0 { self.min.z } else { self.max.z },
        )
    }

    /// Test ray intersection with this box using the slab method.
    ///
    /// Returns the ray parameter of the entry point (0 when the origin is
    /// inside the box), or `None` on a miss.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if !self.is_valid() {
            return None;
        }
        let inv_dir = Vec3::new(
            if ray.direction.x != 0.0 { 1.0 / ray.direction.x } else { f32::INFINITY },
            if ray.direction.y != 0.0 { 1.0 / ray.direction.y } else { f32::INFINITY },
            if ray.direction.z != 0.0 { 1.0 / ray.direction.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray.origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray.origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray.origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray.origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray.origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray.origin.z) * inv_dir.z;

        // NaN from 0 * inf means the origin sits on a slab plane of a parallel
        // axis; f32::min/max drop NaN operands, which keeps that axis neutral
        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized, points into the frustum)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from the raw `ax + by + cz + d` coefficients
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.norm();
        if length > f32::EPSILON {
            Self { normal: normal / length, distance: d / length }
        } else {
            Self { normal: Vec3::zeros(), distance: 0.0 }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// A frustum that accepts every box
    pub fn everything() -> Self {
        let open = Plane { normal: Vec3::zeros(), distance: 0.0 };
        Self { planes: [open; 6] }
    }

    /// Extract frustum planes from a view-projection matrix (Gribb-Hartmann).
    ///
    /// Expects a projection with clip-space depth in `[-w, w]`.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row = |i: usize| vp.row(i).transpose();
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let plane = |v: nalgebra::Vector4<f32>| Plane::from_coefficients(v.x, v.y, v.z, v.w);
        Self {
            planes: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
                plane(r3 + r2),
                plane(r3 - r2),
            ],
        }
    }

    /// Check if a box is inside or intersects the frustum
    pub fn box_in_frustum(&self, aabox: &AABox) -> bool {
        if !aabox.is_valid() {
            return false;
        }
        for plane in &self.planes {
            // Corner furthest along the plane normal
            let mut p = aabox.min;
            if plane.normal.x >= 0.0 {
                p.x = aabox.max.x;
            }
            if plane.normal.y >= 0.0 {
                p.y = aabox.max.y;
            }
            if plane.normal.z >= 0.0 {
                p.z = aabox.max.z;
            }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}
