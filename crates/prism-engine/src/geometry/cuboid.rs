use glam::Vec3;

use super::{FLOATS_PER_VERTEX, MeshData, grid_indices};

/// Size and tessellation of a [`BoxGeometry`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoxParams {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub depth_segments: u32,
}

impl Default for BoxParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
            width_segments: 1,
            height_segments: 1,
            depth_segments: 1,
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn set(self, v: &mut Vec3, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
    }
}

/// One face: `u`/`v` span the face, `w` is its normal axis.
struct Face {
    u: Axis,
    v: Axis,
    w: Axis,
    u_dir: f32,
    v_dir: f32,
    width: f32,
    height: f32,
    depth: f32,
    grid_x: u32,
    grid_y: u32,
}

/// Axis-aligned box centred on the origin, six independently-shaded faces.
pub struct BoxGeometry;

impl BoxGeometry {
    /// Zero segment counts are treated as one.
    pub fn build(params: &BoxParams) -> MeshData {
        let &BoxParams {
            width: w,
            height: h,
            depth: d,
            ..
        } = params;
        let ws = params.width_segments.max(1);
        let hs = params.height_segments.max(1);
        let ds = params.depth_segments.max(1);

        use Axis::{X, Y, Z};
        let faces = [
            face(Z, Y, X, -1.0, -1.0, d, h, w, ds, hs),
            face(Z, Y, X, 1.0, -1.0, d, h, -w, ds, hs),
            face(X, Z, Y, 1.0, 1.0, w, d, h, ws, ds),
            face(X, Z, Y, 1.0, -1.0, w, d, -h, ws, ds),
            face(X, Y, Z, 1.0, -1.0, w, h, d, ws, hs),
            face(X, Y, Z, -1.0, -1.0, w, h, -d, ws, hs),
        ];

        let mut mesh = MeshData::default();
        for f in &faces {
            push_face(&mut mesh, f);
        }
        mesh
    }
}

#[allow(clippy::too_many_arguments)]
fn face(
    u: Axis,
    v: Axis,
    w: Axis,
    u_dir: f32,
    v_dir: f32,
    width: f32,
    height: f32,
    depth: f32,
    grid_x: u32,
    grid_y: u32,
) -> Face {
    Face {
        u,
        v,
        w,
        u_dir,
        v_dir,
        width,
        height,
        depth,
        grid_x,
        grid_y,
    }
}

fn push_face(mesh: &mut MeshData, f: &Face) {
    let base = mesh.vertex_count() as u32;

    let half_w = f.width / 2.0;
    let half_h = f.height / 2.0;
    let half_d = f.depth / 2.0;
    let segment_w = f.width / f.grid_x as f32;
    let segment_h = f.height / f.grid_y as f32;
    let facing = if f.depth > 0.0 { 1.0 } else { -1.0 };

    mesh.vertices
        .reserve(((f.grid_x + 1) * (f.grid_y + 1)) as usize * FLOATS_PER_VERTEX);

    for iy in 0..=f.grid_y {
        let y = iy as f32 * segment_h - half_h;
        for ix in 0..=f.grid_x {
            let x = ix as f32 * segment_w - half_w;

            let mut pos = Vec3::ZERO;
            f.u.set(&mut pos, x * f.u_dir);
            f.v.set(&mut pos, y * f.v_dir);
            f.w.set(&mut pos, half_d);

            let mut normal = Vec3::ZERO;
            f.w.set(&mut normal, facing);

            let u = ix as f32 / f.grid_x as f32;
            let v = 1.0 - iy as f32 / f.grid_y as f32;

            mesh.vertices.extend_from_slice(&pos.to_array());
            mesh.vertices.extend_from_slice(&normal.to_array());
            mesh.vertices.extend_from_slice(&[u, v]);
        }
    }

    grid_indices(&mut mesh.indices, base, f.grid_x, f.grid_y);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_box_counts() {
        let mesh = BoxGeometry::build(&BoxParams::default());
        assert_eq!(mesh.vertex_count(), 6 * 4);
        assert_eq!(mesh.indices.len(), 6 * 6);
        assert_eq!(*mesh.indices.iter().max().unwrap(), 23);
    }

    #[test]
    fn segmented_counts() {
        let mesh = BoxGeometry::build(&BoxParams {
            width_segments: 2,
            height_segments: 3,
            depth_segments: 4,
            ..BoxParams::default()
        });
        // (ds,hs) twice, (ws,ds) twice, (ws,hs) twice.
        let verts = 2 * (5 * 4) + 2 * (3 * 5) + 2 * (3 * 4);
        let quads = 2 * (4 * 3) + 2 * (2 * 4) + 2 * (2 * 3);
        assert_eq!(mesh.vertex_count(), verts);
        assert_eq!(mesh.indices.len(), quads * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < verts));
    }

    #[test]
    fn every_face_lies_on_its_side() {
        let mesh = BoxGeometry::build(&BoxParams {
            width: 2.0,
            height: 4.0,
            depth: 6.0,
            ..BoxParams::default()
        });

        let expected_normals = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        let half = [1.0, 2.0, 3.0];

        for (face, normal) in expected_normals.iter().enumerate() {
            let axis = normal.iter().position(|c| *c != 0.0).unwrap();
            for i in face * 4..face * 4 + 4 {
                let (pos, n, _) = mesh.vertex(i).unwrap();
                assert_eq!(&n, normal, "vertex {i}");
                assert_eq!(pos[axis], normal[axis] * half[axis], "vertex {i}");
            }
        }
    }

    #[test]
    fn uvs_span_unit_square() {
        let mesh = BoxGeometry::build(&BoxParams::default());
        for i in 0..mesh.vertex_count() {
            let (_, _, uv) = mesh.vertex(i).unwrap();
            assert!((0.0..=1.0).contains(&uv[0]));
            assert!((0.0..=1.0).contains(&uv[1]));
        }
    }
}
