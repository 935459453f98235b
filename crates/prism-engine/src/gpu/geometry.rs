use wgpu::util::DeviceExt;

use crate::geometry::{FLOATS_PER_VERTEX, MeshData};
use crate::render::RenderCtx;

use super::shader::Shader;

/// Vertex buffer plus optional index buffer in the interleaved mesh layout.
pub struct Geometry {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    index_buffer: Option<(wgpu::Buffer, u32)>,
}

impl Geometry {
    /// Uploads interleaved `vertices` (8 floats each) and, when non-empty, `indices`.
    pub fn new(ctx: &RenderCtx<'_>, vertices: &[f32], indices: &[u32]) -> Self {
        if vertices.len() % FLOATS_PER_VERTEX != 0 {
            log::warn!(
                "vertex data length {} is not a multiple of {FLOATS_PER_VERTEX}; trailing floats ignored",
                vertices.len()
            );
        }
        let vertex_count = (vertices.len() / FLOATS_PER_VERTEX) as u32;

        let vertex_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("prism geometry vbo"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = (!indices.is_empty()).then(|| {
            let buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("prism geometry ibo"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });

        Self {
            vertex_buffer,
            vertex_count,
            index_buffer,
        }
    }

    pub fn from_mesh(ctx: &RenderCtx<'_>, mesh: &MeshData) -> Self {
        Self::new(ctx, &mesh.vertices, &mesh.indices)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> Option<u32> {
        self.index_buffer.as_ref().map(|(_, n)| *n)
    }

    /// Activates `shader`, binds the buffers and issues one draw call.
    ///
    /// Indexed when indices were supplied, otherwise every vertex in order.
    pub fn draw(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>, shader: &Shader) {
        if self.vertex_count == 0 {
            return;
        }

        shader.use_program(queue, pass);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        match &self.index_buffer {
            Some((buffer, count)) => {
                pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..*count, 0, 0..1);
            }
            None => pass.draw(0..self.vertex_count, 0..1),
        }
    }
}
