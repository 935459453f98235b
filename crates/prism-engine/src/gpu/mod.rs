//! GPU resource wrappers: shader programs, mesh buffers and textures.
//!
//! Conventions shared by every pipeline built here:
//! - vertex buffer 0 is the interleaved mesh layout (position, normal, uv)
//! - bind group 0 holds all `var<uniform>` blocks, bound with one dynamic offset per draw
//! - bind group 1, when used, holds a `texture_2d<f32>` (binding 0) and its sampler (binding 1)
//! - colour target is the surface format, depth target is the runtime depth format

mod error;
mod geometry;
mod program;
mod shader;
mod texture;
mod uniforms;
mod vertex;

pub use error::{ShaderError, ShaderStage};
pub use geometry::Geometry;
pub use program::{ShaderInfo, TEXTURE_GROUP};
pub use shader::Shader;
pub use texture::Texture2D;
pub(crate) use uniforms::advance_frame;
pub use uniforms::{UNIFORM_GROUP, UniformLayout, UniformSlot, UniformType, UniformValue};
pub use vertex::{VERTEX_STRIDE, mesh_vertex_layout};
