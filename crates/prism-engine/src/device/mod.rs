//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain) and its depth buffer
//! - acquiring frames and providing encoders/views for rendering

mod context;
mod depth;
mod init;
mod surface;

pub use context::{Gpu, GpuFrame};
pub use depth::DEPTH_FORMAT;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
