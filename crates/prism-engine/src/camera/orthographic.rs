use glam::Mat4;

use super::Camera;
use super::pose::Pose;

/// Orthographic camera over an explicit view volume.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    projection: Mat4,
    pose: Pose,
}

impl OrthographicCamera {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Mat4::orthographic_rh(left, right, bottom, top, near, far),
            pose: Pose::new(),
        }
    }
}

impl Camera for OrthographicCamera {
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
