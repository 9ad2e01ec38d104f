//! # 3D Camera
//!
//! Perspective camera used for bucket sorting, frustum culling and picking.
//! The renderer only reads from it; it never moves the camera.
//!
//! ## Coordinate System
//! Right-handed, Y-up world space. Projection uses clip-space depth in
//! `[-w, w]`, which is what [`Frustum::from_view_projection`] expects.

use crate::foundation::math::{utils, Mat4, Point3, Ray, Vec3, Vec4};
use crate::scene::bounds::Frustum;

/// 3D perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Point the camera at `target` with a custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
    }

    /// Update the aspect ratio after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Normalized view direction
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// World-to-camera matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// View matrix with the translation removed, for skyboxes
    pub fn rotation_only_view(&self) -> Mat4 {
        let mut view = self.view_matrix();
        view[(0, 3)] = 0.0;
        view[(1, 3)] = 0.0;
        view[(2, 3)] = 0.0;
        view
    }

    /// Perspective projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        nalgebra::Perspective3::new(self.aspect, self.fov, self.near, self.far).to_homogeneous()
    }

    /// Combined projection × view
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// View frustum in world space
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }

    /// World-space picking ray through a point in normalized device coordinates
    ///
    /// `ndc_x` runs -1 (left) to 1 (right), `ndc_y` -1 (bottom) to 1 (top).
    /// Returns `None` if the view-projection matrix is singular.
    pub fn ray_from_ndc(&self, ndc_x: f32, ndc_y: f32) -> Option<Ray> {
        let inverse = self.view_projection().try_inverse()?;
        let unproject = |z: f32| {
            let p = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            p.xyz() / p.w
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);
        Some(Ray::new(near, far - near))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 10.0), 55.0, 16.0 / 9.0, 0.1, 4096.0)
    }
}
