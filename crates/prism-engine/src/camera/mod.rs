//! Camera projections.
//!
//! A camera owns a projection matrix (fixed at construction, rebuilt only on
//! explicit request) and a world transform. The view matrix is the inverse of
//! the transform and is recomputed on demand whenever the transform changed.

mod orthographic;
mod perspective;
mod pose;

pub use orthographic::OrthographicCamera;
pub use perspective::PerspectiveCamera;

use glam::{Mat4, Vec3};

/// Behaviour shared by every camera kind.
pub trait Camera {
    fn projection(&self) -> Mat4;

    /// Model-to-world transform of the camera itself.
    fn transform(&self) -> Mat4;

    /// Replaces the world transform; the view follows on the next read.
    fn set_transform(&mut self, transform: Mat4);

    /// `inverse(transform)`, recomputed lazily after a transform change.
    fn view(&self) -> Mat4;

    /// Recomputes the view immediately.
    fn update(&mut self);

    /// World-space position (translation column of the transform).
    fn position(&self) -> Vec3 {
        self.transform().w_axis.truncate()
    }

    fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}
