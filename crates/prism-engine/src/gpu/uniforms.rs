//! Uniform reflection and CPU-side staging.
//!
//! Uniforms live in bind group 0. Each `var<uniform>` binding is one block; a
//! block holding a struct exposes every supported member by name, a block
//! holding a bare value exposes the variable name.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Bind group that carries every uniform block.
pub const UNIFORM_GROUP: u32 = 0;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformType {
    Int,
    UInt,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Bytes occupied in a uniform block (`mat3x3<f32>` columns are padded to 16).
    pub const fn size(self) -> usize {
        match self {
            UniformType::Int | UniformType::UInt | UniformType::Float => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat3 => 48,
            UniformType::Mat4 => 64,
        }
    }

    fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        use naga::{ScalarKind, TypeInner, VectorSize};

        let float = |s: naga::Scalar| s.kind == ScalarKind::Float && s.width == 4;

        match *inner {
            TypeInner::Scalar(s) if s.width == 4 => match s.kind {
                ScalarKind::Sint => Some(UniformType::Int),
                ScalarKind::Uint => Some(UniformType::UInt),
                ScalarKind::Float => Some(UniformType::Float),
                _ => None,
            },
            TypeInner::Vector { size, scalar } if float(scalar) => Some(match size {
                VectorSize::Bi => UniformType::Vec2,
                VectorSize::Tri => UniformType::Vec3,
                VectorSize::Quad => UniformType::Vec4,
            }),
            TypeInner::Matrix {
                columns: VectorSize::Tri,
                rows: VectorSize::Tri,
                scalar,
            } if float(scalar) => Some(UniformType::Mat3),
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if float(scalar) => Some(UniformType::Mat4),
            _ => None,
        }
    }
}

/// Location of one named uniform inside group 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub binding: u32,
    pub offset: u32,
    pub ty: UniformType,
}

/// Named uniforms and block sizes of a program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    slots: BTreeMap<String, UniformSlot>,
    blocks: BTreeMap<u32, u64>,
}

impl UniformLayout {
    /// Collects the uniform declarations of one stage.
    pub fn reflect(module: &naga::Module) -> Result<Self, String> {
        let mut layout = Self::default();

        for (_, var) in module.global_variables.iter() {
            if var.space != naga::AddressSpace::Uniform {
                continue;
            }
            let var_name = var.name.as_deref().unwrap_or("<unnamed>");
            let Some(binding) = &var.binding else {
                continue;
            };
            if binding.group != UNIFORM_GROUP {
                return Err(format!(
                    "uniform '{var_name}' is in group {}, uniforms must use group {UNIFORM_GROUP}",
                    binding.group
                ));
            }

            let inner = &module.types[var.ty].inner;
            let size = u64::from(inner.size(module.to_ctx())).next_multiple_of(16);
            layout.blocks.insert(binding.binding, size);

            match inner {
                naga::TypeInner::Struct { members, .. } => {
                    for member in members {
                        let Some(name) = &member.name else { continue };
                        let member_inner = &module.types[member.ty].inner;
                        match UniformType::from_naga(member_inner) {
                            Some(ty) => {
                                layout.slots.insert(
                                    name.clone(),
                                    UniformSlot {
                                        binding: binding.binding,
                                        offset: member.offset,
                                        ty,
                                    },
                                );
                            }
                            None => log::debug!(
                                "uniform member '{var_name}.{name}' has an unsupported type; not settable"
                            ),
                        }
                    }
                }
                other => match UniformType::from_naga(other) {
                    Some(ty) => {
                        layout.slots.insert(
                            var_name.to_owned(),
                            UniformSlot {
                                binding: binding.binding,
                                offset: 0,
                                ty,
                            },
                        );
                    }
                    None => log::debug!("uniform '{var_name}' has an unsupported type; not settable"),
                },
            }
        }

        Ok(layout)
    }

    /// Folds another stage's declarations into this one.
    ///
    /// The same name must resolve to the same slot in every stage.
    pub fn merge(&mut self, other: UniformLayout) -> Result<(), String> {
        for (name, slot) in other.slots {
            match self.slots.get(&name) {
                Some(existing) if *existing != slot => {
                    return Err(format!(
                        "conflicting declarations of uniform '{name}': {existing:?} vs {slot:?}"
                    ));
                }
                Some(_) => {}
                None => {
                    self.slots.insert(name, slot);
                }
            }
        }
        for (binding, size) in other.blocks {
            let entry = self.blocks.entry(binding).or_insert(size);
            *entry = (*entry).max(size);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// `(binding, size in bytes)` of every block, ordered by binding.
    pub fn blocks(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.blocks.iter().map(|(b, s)| (*b, *s))
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Value accepted by [`crate::gpu::Shader::set_uniform`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::UInt(_) => UniformType::UInt,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Writes the std140-compatible representation into `dst`.
    fn write(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Int(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::UInt(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Float(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => dst[..8].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec3(v) => dst[..12].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => dst[..16].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat3(m) => {
                for (i, col) in m.to_cols_array_2d().iter().enumerate() {
                    let at = i * 16;
                    dst[at..at + 12].copy_from_slice(bytemuck::cast_slice(col));
                }
            }
            UniformValue::Mat4(m) => {
                dst[..64].copy_from_slice(bytemuck::cast_slice(&m.to_cols_array()))
            }
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::UInt(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Draw slots reserved per uniform buffer before it has to grow.
pub(crate) const INITIAL_SLOTS: u32 = 64;

static FRAME_EPOCH: AtomicU64 = AtomicU64::new(0);

/// Marks the end of a frame: the next draw of every shader starts again at slot 0.
pub(crate) fn advance_frame() {
    FRAME_EPOCH.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn frame_epoch() -> u64 {
    FRAME_EPOCH.load(Ordering::Relaxed)
}

/// CPU copy of one uniform block.
#[derive(Debug, Clone)]
pub(crate) struct StagedBlock {
    pub binding: u32,
    pub data: Vec<u8>,
    /// Distance between consecutive draw slots in the GPU buffer.
    pub stride: u32,
    pub dirty: bool,
}

/// Slot chosen for the next draw by [`UniformStaging::begin_draw`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct DrawSlot {
    pub slot: u32,
    /// Every block must be written at `slot` before the draw.
    pub upload: bool,
}

/// Staging memory for every block of a layout.
///
/// Queue writes all land before the frame's command buffer runs, so each
/// draw whose uniforms changed gets a fresh slot of the block buffers and
/// binds it through a dynamic offset. Draws that changed nothing reuse the
/// previous slot.
#[derive(Debug, Clone, Default)]
pub(crate) struct UniformStaging {
    blocks: Vec<StagedBlock>,
    epoch: Option<u64>,
    next_slot: u32,
    current_slot: u32,
}

impl UniformStaging {
    /// `alignment` is the device's `min_uniform_buffer_offset_alignment`.
    pub fn new(layout: &UniformLayout, alignment: u32) -> Self {
        let alignment = u64::from(alignment.max(1));
        let blocks = layout
            .blocks()
            .map(|(binding, size)| StagedBlock {
                binding,
                data: vec![0; size as usize],
                stride: size.next_multiple_of(alignment) as u32,
                dirty: true,
            })
            .collect();
        Self {
            blocks,
            ..Self::default()
        }
    }

    pub fn write(&mut self, slot: UniformSlot, value: &UniformValue) {
        let Some(block) = self.blocks.iter_mut().find(|b| b.binding == slot.binding) else {
            return;
        };
        let start = slot.offset as usize;
        let end = start + slot.ty.size();
        if end > block.data.len() {
            log::error!("uniform write out of bounds ({start}..{end} in {})", block.data.len());
            return;
        }
        value.write(&mut block.data[start..end]);
        block.dirty = true;
    }

    /// Picks the slot the next draw in frame `epoch` reads from.
    pub fn begin_draw(&mut self, epoch: u64) -> DrawSlot {
        if self.epoch != Some(epoch) {
            // Last frame's slots are about to be reused from the start.
            self.epoch = Some(epoch);
            self.next_slot = 0;
            self.blocks.iter_mut().for_each(|b| b.dirty = true);
        }

        if !self.blocks.iter().any(|b| b.dirty) {
            return DrawSlot {
                slot: self.current_slot,
                upload: false,
            };
        }

        self.current_slot = self.next_slot;
        self.next_slot += 1;
        self.blocks.iter_mut().for_each(|b| b.dirty = false);
        DrawSlot {
            slot: self.current_slot,
            upload: true,
        }
    }

    /// Dynamic offsets for `slot`, in binding order.
    pub fn offsets(&self, slot: u32) -> Vec<u32> {
        self.blocks.iter().map(|b| slot * b.stride).collect()
    }

    pub fn blocks(&self) -> &[StagedBlock] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> naga::Module {
        naga::front::wgsl::parse_str(src).unwrap()
    }

    const STRUCT_SRC: &str = r#"
        struct Matrices {
            projection: mat4x4<f32>,
            view: mat4x4<f32>,
            normal: mat3x3<f32>,
            tint: vec3<f32>,
            level: i32,
        };
        @group(0) @binding(0) var<uniform> u: Matrices;
        @group(0) @binding(1) var<uniform> time: f32;

        @vertex
        fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
            return u.projection * u.view * vec4<f32>(p * time, 1.0);
        }
    "#;

    // ── reflection ────────────────────────────────────────────────────────

    #[test]
    fn reflects_struct_members_and_plain_vars() {
        let layout = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();

        let proj = layout.get("projection").unwrap();
        assert_eq!(proj, UniformSlot { binding: 0, offset: 0, ty: UniformType::Mat4 });
        assert_eq!(layout.get("view").unwrap().offset, 64);
        assert_eq!(layout.get("normal").unwrap().offset, 128);
        assert_eq!(layout.get("normal").unwrap().ty, UniformType::Mat3);
        assert_eq!(layout.get("tint").unwrap().offset, 176);
        assert_eq!(layout.get("level").unwrap().ty, UniformType::Int);

        let time = layout.get("time").unwrap();
        assert_eq!(time, UniformSlot { binding: 1, offset: 0, ty: UniformType::Float });

        let blocks: Vec<_> = layout.blocks().collect();
        assert_eq!(blocks[0].0, 0);
        assert_eq!(blocks[0].1 % 16, 0);
        assert!(blocks[0].1 >= 192);
        assert_eq!(blocks[1], (1, 16));
    }

    #[test]
    fn uniform_outside_group_zero_is_rejected() {
        let src = r#"
            @group(2) @binding(0) var<uniform> m: mat4x4<f32>;
            @vertex
            fn vs_main() -> @builtin(position) vec4<f32> { return m[0]; }
        "#;
        let err = UniformLayout::reflect(&parse(src)).unwrap_err();
        assert!(err.contains("group 2"));
    }

    // ── merge ─────────────────────────────────────────────────────────────

    #[test]
    fn merge_accepts_identical_declarations() {
        let mut a = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let b = a.clone();
        a.merge(b).unwrap();
        assert_eq!(a.names().count(), 6);
    }

    #[test]
    fn merge_rejects_conflicts() {
        let mut a = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let src = r#"
            @group(0) @binding(3) var<uniform> time: vec4<f32>;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return time; }
        "#;
        let b = UniformLayout::reflect(&parse(src)).unwrap();
        let err = a.merge(b).unwrap_err();
        assert!(err.contains("'time'"));
    }

    // ── staging ───────────────────────────────────────────────────────────

    #[test]
    fn staging_writes_at_slot_offset() {
        let layout = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let mut staging = UniformStaging::new(&layout, 256);
        staging.begin_draw(0);

        staging.write(layout.get("level").unwrap(), &UniformValue::Int(7));
        let slot = layout.get("level").unwrap();
        let block = &staging.blocks()[0];
        let at = slot.offset as usize;
        assert_eq!(&block.data[at..at + 4], &7i32.to_ne_bytes());
        assert!(block.dirty);
        assert!(!staging.blocks()[1].dirty);
    }

    #[test]
    fn strides_follow_offset_alignment() {
        let layout = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let staging = UniformStaging::new(&layout, 256);
        assert!(staging.blocks().iter().all(|b| b.stride % 256 == 0));
        assert_eq!(staging.blocks()[1].stride, 256);
        assert_eq!(staging.offsets(0), vec![0, 0]);
        assert_eq!(staging.offsets(2), vec![2 * staging.blocks()[0].stride, 512]);
    }

    #[test]
    fn changed_uniforms_between_draws_get_distinct_slots() {
        let layout = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let mut staging = UniformStaging::new(&layout, 256);
        let level = layout.get("level").unwrap();

        staging.write(level, &UniformValue::Int(1));
        let first = staging.begin_draw(7);
        staging.write(level, &UniformValue::Int(2));
        let second = staging.begin_draw(7);

        assert!(first.upload && second.upload);
        assert_ne!(first.slot, second.slot);
        assert_ne!(staging.offsets(first.slot), staging.offsets(second.slot));
    }

    #[test]
    fn unchanged_uniforms_reuse_the_slot() {
        let layout = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let mut staging = UniformStaging::new(&layout, 256);

        let first = staging.begin_draw(3);
        let again = staging.begin_draw(3);
        assert!(first.upload);
        assert_eq!(again, DrawSlot { slot: first.slot, upload: false });
    }

    #[test]
    fn new_frame_restarts_at_slot_zero_and_reuploads() {
        let layout = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let mut staging = UniformStaging::new(&layout, 256);
        let level = layout.get("level").unwrap();

        staging.begin_draw(1);
        staging.write(level, &UniformValue::Int(5));
        assert_eq!(staging.begin_draw(1).slot, 1);

        // Nothing changed, but the slot from the previous frame may be overwritten.
        assert_eq!(staging.begin_draw(2), DrawSlot { slot: 0, upload: true });
    }

    #[test]
    fn mat3_columns_are_padded() {
        let layout = UniformLayout::reflect(&parse(STRUCT_SRC)).unwrap();
        let mut staging = UniformStaging::new(&layout, 256);
        let m = Mat3::from_cols(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0), Vec3::new(7.0, 8.0, 9.0));
        let slot = layout.get("normal").unwrap();
        staging.write(slot, &m.into());

        let data = &staging.blocks()[0].data[slot.offset as usize..][..48];
        let floats: Vec<f32> = data
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&floats[4..7], &[4.0, 5.0, 6.0]);
        assert_eq!(&floats[8..11], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn value_types() {
        assert_eq!(UniformValue::from(1i32).ty(), UniformType::Int);
        assert_eq!(UniformValue::from(1.0f32).ty(), UniformType::Float);
        assert_eq!(UniformValue::from(Vec3::ONE).ty(), UniformType::Vec3);
        assert_eq!(UniformValue::from(Mat4::IDENTITY).ty(), UniformType::Mat4);
    }
}
