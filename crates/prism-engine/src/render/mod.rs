//! Per-frame render context.
//!
//! `FrameCtx::render` builds a [`RenderCtx`] for each frame and lends it, with
//! the open render pass, to the draw callback.

mod ctx;
mod viewport;

pub use ctx::RenderCtx;
pub use viewport::Viewport;
