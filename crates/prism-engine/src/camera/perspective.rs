use glam::Mat4;

use super::Camera;
use super::pose::Pose;

/// Perspective camera.
///
/// `fov` is the vertical field of view in degrees.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Mat4,
    pose: Pose,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            projection: Mat4::perspective_rh(fov.to_radians(), aspect, near, far),
            pose: Pose::new(),
        }
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Rebuilds the projection for a new aspect ratio; the transform is kept.
    ///
    /// Non-positive or non-finite ratios (minimized window) are ignored.
    pub fn set_aspect(&mut self, aspect: f32) {
        if !(aspect.is_finite() && aspect > 0.0) {
            return;
        }
        self.aspect = aspect;
        self.projection = Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far);
    }
}

impl Camera for PerspectiveCamera {
    #[inline]
    fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    fn transform(&self) -> Mat4 {
        self.pose.transform()
    }

    #[inline]
    fn set_transform(&mut self, transform: Mat4) {
        self.pose.set_transform(transform);
    }

    #[inline]
    fn view(&self) -> Mat4 {
        self.pose.view()
    }

    fn update(&mut self) {
        self.pose.recompute();
    }
}
