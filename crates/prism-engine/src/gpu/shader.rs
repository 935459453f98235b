use std::borrow::Cow;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::render::RenderCtx;

use super::error::ShaderError;
use super::program::{self, CompiledStage, LinkedProgram, ShaderInfo, TEXTURE_GROUP};
use super::texture::GpuTexture;
use super::uniforms::{
    self, INITIAL_SLOTS, UNIFORM_GROUP, UniformLayout, UniformSlot, UniformStaging, UniformValue,
};
use super::vertex::mesh_vertex_layout;

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// One GPU buffer per uniform block, each holding `capacity` draw slots.
struct UniformRing {
    capacity: u32,
    buffers: Vec<wgpu::Buffer>,
    bind_group: wgpu::BindGroup,
}

impl UniformRing {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        staging: &UniformStaging,
        capacity: u32,
    ) -> Self {
        let buffers: Vec<wgpu::Buffer> = staging
            .blocks()
            .iter()
            .map(|block| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("prism uniform block {}", block.binding)),
                    size: u64::from(block.stride) * u64::from(capacity),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let entries: Vec<wgpu::BindGroupEntry> = staging
            .blocks()
            .iter()
            .zip(&buffers)
            .map(|(block, buffer)| wgpu::BindGroupEntry {
                binding: block.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(block.data.len() as u64),
                }),
            })
            .collect();

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism uniform bind group"),
            layout,
            entries: &entries,
        });

        Self {
            capacity,
            buffers,
            bind_group,
        }
    }
}

/// Linked vertex + fragment program with its uniform storage.
///
/// Uniform writes are staged on the CPU. [`Shader::use_program`] copies them
/// into a fresh slot of the uniform buffers whenever they changed since the
/// previous draw, so every draw sees the values set before it.
pub struct Shader {
    id: u64,
    device: wgpu::Device,
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformLayout,
    staging: RefCell<UniformStaging>,
    uniform_layout: wgpu::BindGroupLayout,
    ring: RefCell<UniformRing>,

    texture_layout: Option<wgpu::BindGroupLayout>,
    /// Texture bound by the last `Texture2D::bind`, else a 1x1 white fallback.
    texture_bind_group: RefCell<Option<wgpu::BindGroup>>,
}

impl Shader {
    /// Compiles and links `stages`, then builds the render pipeline.
    ///
    /// Compile and link failures are logged and returned.
    pub fn new(ctx: &RenderCtx<'_>, stages: &[ShaderInfo<'_>]) -> Result<Self, ShaderError> {
        let program = program::build(stages).inspect_err(|e| log::error!("{e}"))?;
        Ok(Self::from_program(ctx, program))
    }

    fn from_program(ctx: &RenderCtx<'_>, program: LinkedProgram) -> Self {
        let id = NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed);
        let device = ctx.device;

        let LinkedProgram {
            vertex,
            fragment,
            uniforms,
            textured,
        } = program;

        // ── group 0: uniform blocks ──────────────────────────────────────
        let uniform_entries: Vec<wgpu::BindGroupLayoutEntry> = uniforms
            .blocks()
            .map(|(binding, size)| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(size),
                },
                count: None,
            })
            .collect();

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("prism uniform bgl"),
            entries: &uniform_entries,
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let staging = UniformStaging::new(&uniforms, alignment);
        let ring = UniformRing::new(device, &uniform_layout, &staging, INITIAL_SLOTS);

        // ── group 1: optional texture + sampler ──────────────────────────
        let texture_layout = textured.then(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("prism texture bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
        });

        let fallback = texture_layout.as_ref().map(|layout| {
            GpuTexture::upload(device, ctx.queue, "prism fallback texture", 1, 1, &[255; 4])
                .bind_group(device, layout)
        });

        // ── pipeline ─────────────────────────────────────────────────────
        let mut layouts = vec![&uniform_layout];
        if let Some(layout) = &texture_layout {
            layouts.push(layout);
        }

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("prism shader pipeline layout"),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let CompiledStage {
            module: vs_module,
            entry_point: vs_entry,
            ..
        } = vertex;
        let CompiledStage {
            module: fs_module,
            entry_point: fs_entry,
            ..
        } = fragment;

        let vs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism vertex shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(vs_module)),
        });
        let fs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism fragment shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(fs_module)),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("prism shader pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vs,
                entry_point: Some(vs_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &[mesh_vertex_layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &fs,
                entry_point: Some(fs_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: ctx.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "shader {id} linked: uniforms [{}], textured: {textured}",
            uniforms.names().collect::<Vec<_>>().join(", ")
        );

        Self {
            id,
            device: device.clone(),
            pipeline,
            uniforms,
            staging: RefCell::new(staging),
            uniform_layout,
            ring: RefCell::new(ring),
            texture_layout,
            texture_bind_group: RefCell::new(fallback),
        }
    }

    /// Process-unique identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Reflected location of `name`, if the program declares it.
    pub fn get_uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name)
    }

    pub fn uniforms(&self) -> &UniformLayout {
        &self.uniforms
    }

    /// Stages a uniform value; it reaches the GPU on the next [`Shader::use_program`].
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<(), ShaderError> {
        let value = value.into();
        let slot = check_uniform(&self.uniforms, name, &value).inspect_err(|e| log::error!("{e}"))?;
        self.staging.get_mut().write(slot, &value);
        Ok(())
    }

    /// Uploads changed uniforms into a new slot, then binds the pipeline and its groups.
    pub fn use_program(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>) {
        let mut staging = self.staging.borrow_mut();
        let mut ring = self.ring.borrow_mut();

        let draw = staging.begin_draw(uniforms::frame_epoch());
        if draw.slot >= ring.capacity {
            let capacity = (ring.capacity * 2).max(draw.slot + 1);
            log::debug!("shader {}: growing uniform buffers to {capacity} draws", self.id);
            // Draws already recorded keep the old buffers alive through their bind group.
            *ring = UniformRing::new(&self.device, &self.uniform_layout, &staging, capacity);
        }
        if draw.upload {
            for (block, buffer) in staging.blocks().iter().zip(&ring.buffers) {
                let offset = u64::from(draw.slot) * u64::from(block.stride);
                queue.write_buffer(buffer, offset, &block.data);
            }
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(UNIFORM_GROUP, &ring.bind_group, &staging.offsets(draw.slot));
        if let Some(bg) = self.texture_bind_group.borrow().as_ref() {
            pass.set_bind_group(TEXTURE_GROUP, bg, &[]);
        }
    }

    pub(crate) fn texture_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.texture_layout.as_ref()
    }

    pub(crate) fn attach_texture(&self, bind_group: wgpu::BindGroup) {
        *self.texture_bind_group.borrow_mut() = Some(bind_group);
    }
}

fn check_uniform(
    layout: &UniformLayout,
    name: &str,
    value: &UniformValue,
) -> Result<UniformSlot, ShaderError> {
    let slot = layout
        .get(name)
        .ok_or_else(|| ShaderError::UniformNotFound(name.to_owned()))?;
    if slot.ty != value.ty() {
        return Err(ShaderError::UniformType {
            name: name.to_owned(),
            expected: slot.ty,
            actual: value.ty(),
        });
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::UniformType;
    use glam::{Mat4, Vec3};

    fn layout() -> UniformLayout {
        let src = r#"
            struct U { model: mat4x4<f32>, tint: vec3<f32>, count: i32 };
            @group(0) @binding(0) var<uniform> u: U;
            @vertex
            fn vs_main() -> @builtin(position) vec4<f32> { return u.model[0]; }
        "#;
        UniformLayout::reflect(&naga::front::wgsl::parse_str(src).unwrap()).unwrap()
    }

    #[test]
    fn unknown_uniform_is_not_found() {
        let err = check_uniform(&layout(), "u_missing", &UniformValue::Float(1.0)).unwrap_err();
        assert_eq!(err.to_string(), "Uniform 'u_missing' not found");
    }

    #[test]
    fn mismatched_type_is_rejected() {
        let err = check_uniform(&layout(), "tint", &UniformValue::from(Mat4::IDENTITY)).unwrap_err();
        match err {
            ShaderError::UniformType { expected, actual, .. } => {
                assert_eq!(expected, UniformType::Vec3);
                assert_eq!(actual, UniformType::Mat4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn matching_type_resolves_slot() {
        let layout = layout();
        let slot = check_uniform(&layout, "tint", &UniformValue::from(Vec3::ONE)).unwrap();
        assert_eq!(slot.offset, 64);
        assert!(check_uniform(&layout, "count", &UniformValue::Int(3)).is_ok());
    }
}
