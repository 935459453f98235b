//! Prism engine crate.
//!
//! A small real-time 3D scaffold over wgpu + winit:
//! - `events`: channel dispatcher holding listeners weakly
//! - `camera` / `controls`: perspective and orthographic cameras, orbit controls
//! - `geometry`: procedural plane and box meshes
//! - `gpu`: shader programs with reflected uniforms, mesh buffers, 2D textures
//! - `loaders`: file loaders with sync and background-thread entry points
//! - `window` / `core`: the event loop and the per-frame application contract

pub mod camera;
pub mod controls;
pub mod core;
pub mod device;
pub mod events;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod loaders;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
