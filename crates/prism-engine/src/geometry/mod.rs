//! CPU-side mesh builders.
//!
//! Builders emit interleaved vertex data in the layout expected by
//! [`crate::gpu::Geometry`]: position (3), normal (3), uv (2), all `f32`.

mod cuboid;
mod plane;

pub use cuboid::{BoxGeometry, BoxParams};
pub use plane::{PlaneGeometry, PlaneParams};

/// Floats per interleaved vertex.
pub const FLOATS_PER_VERTEX: usize = 8;

/// Interleaved vertices plus triangle-list indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    /// Vertex `i` as `(position, normal, uv)`.
    pub fn vertex(&self, i: usize) -> Option<([f32; 3], [f32; 3], [f32; 2])> {
        let v = self
            .vertices
            .get(i * FLOATS_PER_VERTEX..(i + 1) * FLOATS_PER_VERTEX)?;
        Some(([v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7]]))
    }
}

/// Emits the two-triangle quads of a `grid_x` by `grid_y` vertex lattice whose
/// first vertex has index `base`.
fn grid_indices(indices: &mut Vec<u32>, base: u32, grid_x: u32, grid_y: u32) {
    let row = grid_x + 1;
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = base + ix + row * iy;
            let b = base + ix + row * (iy + 1);
            let c = base + ix + 1 + row * (iy + 1);
            let d = base + ix + 1 + row * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
}
