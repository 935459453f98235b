//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, wires them to the GPU layer and
//! publishes their input on an [`crate::events::EventDispatcher`].

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
