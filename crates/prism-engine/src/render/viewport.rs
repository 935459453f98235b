/// Drawable size of the current frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// `width / height`, or `None` for an empty viewport.
    #[inline]
    pub fn aspect(self) -> Option<f32> {
        self.is_valid().then(|| self.width / self.height)
    }
}
