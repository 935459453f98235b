use std::cell::Cell;

use glam::Mat4;

/// World transform plus the view matrix derived from it.
///
/// The view is recomputed lazily: writes to the transform only mark it stale,
/// and the next read of [`Pose::view`] inverts the transform.
#[derive(Debug, Clone)]
pub(crate) struct Pose {
    transform: Mat4,
    view: Cell<Mat4>,
    dirty: Cell<bool>,
}

impl Pose {
    pub(crate) fn new() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            view: Cell::new(Mat4::IDENTITY),
            dirty: Cell::new(false),
        }
    }

    #[inline]
    pub(crate) fn transform(&self) -> Mat4 {
        self.transform
    }

    #[inline]
    pub(crate) fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.dirty.set(true);
    }

    pub(crate) fn view(&self) -> Mat4 {
        if self.dirty.get() {
            self.recompute();
        }
        self.view.get()
    }

    /// Inverts the transform now, regardless of the stale flag.
    pub(crate) fn recompute(&self) {
        let det = self.transform.determinant();
        if det != 0.0 && det.is_finite() {
            self.view.set(self.transform.inverse());
        } else {
            log::warn!("camera transform is not invertible (det = {det}); keeping previous view");
        }
        self.dirty.set(false);
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn small_uniform_scale_is_still_inverted() {
        // det = 0.004^3, far below f32::EPSILON.
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(0.004),
            glam::Quat::IDENTITY,
            Vec3::new(1.0, 2.0, 3.0),
        );
        let mut pose = Pose::new();
        pose.set_transform(transform);
        assert!(pose.view().abs_diff_eq(transform.inverse(), 1e-3));
        assert!((pose.view() * transform).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn singular_transform_keeps_previous_view() {
        let mut pose = Pose::new();
        let good = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        pose.set_transform(good);
        assert_eq!(pose.view(), good.inverse());

        pose.set_transform(Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)));
        assert_eq!(pose.view(), good.inverse());

        pose.set_transform(Mat4::from_scale(Vec3::splat(f32::NAN)));
        assert_eq!(pose.view(), good.inverse());
    }
}
