use super::{FLOATS_PER_VERTEX, MeshData, grid_indices};

/// Size and tessellation of a [`PlaneGeometry`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaneParams {
    pub width: f32,
    pub height: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            width_segments: 1,
            height_segments: 1,
        }
    }
}

/// Segmented plane centred on the origin in the XY plane, facing +Z.
pub struct PlaneGeometry;

impl PlaneGeometry {
    /// Zero segment counts are treated as one.
    pub fn build(params: &PlaneParams) -> MeshData {
        let grid_x = params.width_segments.max(1);
        let grid_y = params.height_segments.max(1);

        let half_w = params.width / 2.0;
        let half_h = params.height / 2.0;
        let segment_w = params.width / grid_x as f32;
        let segment_h = params.height / grid_y as f32;

        let count = ((grid_x + 1) * (grid_y + 1)) as usize;
        let mut vertices = Vec::with_capacity(count * FLOATS_PER_VERTEX);
        for iy in 0..=grid_y {
            let y = iy as f32 * segment_h - half_h;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_w - half_w;
                let u = ix as f32 / grid_x as f32;
                let v = 1.0 - iy as f32 / grid_y as f32;
                vertices.extend_from_slice(&[x, -y, 0.0, 0.0, 0.0, 1.0, u, v]);
            }
        }

        let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
        grid_indices(&mut indices, 0, grid_x, grid_y);

        MeshData { vertices, indices }
    }
}
