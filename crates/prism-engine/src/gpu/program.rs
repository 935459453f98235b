//! WGSL front-end: per-stage compilation and program linking.
//!
//! Everything here runs on the CPU through `naga`; no device is needed.

use super::error::{ShaderError, ShaderStage};
use super::uniforms::{UNIFORM_GROUP, UniformLayout};

/// Bind group holding the optional 2D texture (`binding 0`) and its sampler (`binding 1`).
pub const TEXTURE_GROUP: u32 = 1;

/// One stage's source.
#[derive(Debug, Copy, Clone)]
pub struct ShaderInfo<'a> {
    pub stage: ShaderStage,
    pub source: &'a str,
}

impl<'a> ShaderInfo<'a> {
    pub fn vertex(source: &'a str) -> Self {
        Self { stage: ShaderStage::Vertex, source }
    }

    pub fn fragment(source: &'a str) -> Self {
        Self { stage: ShaderStage::Fragment, source }
    }
}

/// Parsed and validated stage.
#[derive(Debug)]
pub(crate) struct CompiledStage {
    pub stage: ShaderStage,
    pub module: naga::Module,
    pub entry_point: String,
}

/// Vertex + fragment pair with merged resource declarations.
#[derive(Debug)]
pub(crate) struct LinkedProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    pub uniforms: UniformLayout,
    pub textured: bool,
}

fn compile_error(stage: ShaderStage, message: impl Into<String>) -> ShaderError {
    ShaderError::Compile {
        stage,
        message: message.into(),
    }
}

pub(crate) fn compile_stage(info: &ShaderInfo<'_>) -> Result<CompiledStage, ShaderError> {
    let naga_stage = match info.stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
        ShaderStage::Compute => return Err(ShaderError::UnsupportedStage(info.stage)),
    };

    let module = naga::front::wgsl::parse_str(info.source)
        .map_err(|e| compile_error(info.stage, e.emit_to_string(info.source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(info.stage, e.emit_to_string(info.source)))?;

    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage)
        .map(|ep| ep.name.clone())
        .ok_or_else(|| {
            compile_error(
                info.stage,
                format!("no {} entry point", info.stage.to_string().to_lowercase()),
            )
        })?;

    Ok(CompiledStage {
        stage: info.stage,
        module,
        entry_point,
    })
}

/// Checks group 1 of `module`; returns whether it samples a texture.
fn texture_usage(module: &naga::Module) -> Result<bool, String> {
    let mut textured = false;

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        let name = var.name.as_deref().unwrap_or("<unnamed>");
        let inner = &module.types[var.ty].inner;

        match binding.group {
            UNIFORM_GROUP => {}
            TEXTURE_GROUP => {
                let ok = match (binding.binding, inner) {
                    (
                        0,
                        naga::TypeInner::Image {
                            dim: naga::ImageDimension::D2,
                            arrayed: false,
                            class:
                                naga::ImageClass::Sampled {
                                    kind: naga::ScalarKind::Float,
                                    multi: false,
                                },
                        },
                    ) => true,
                    (1, naga::TypeInner::Sampler { comparison: false }) => true,
                    _ => false,
                };
                if !ok {
                    return Err(format!(
                        "'{name}' at @group({TEXTURE_GROUP}) @binding({}) must be texture_2d<f32> (binding 0) or sampler (binding 1)",
                        binding.binding
                    ));
                }
                textured = true;
            }
            other => return Err(format!("'{name}' uses bind group {other}, which is not supported")),
        }
    }

    Ok(textured)
}

pub(crate) fn link(stages: Vec<CompiledStage>) -> Result<LinkedProgram, ShaderError> {
    let mut vertex = None;
    let mut fragment = None;
    let mut uniforms = UniformLayout::default();
    let mut textured = false;

    for stage in stages {
        let reflected = UniformLayout::reflect(&stage.module).map_err(ShaderError::Link)?;
        uniforms.merge(reflected).map_err(ShaderError::Link)?;
        textured |= texture_usage(&stage.module).map_err(ShaderError::Link)?;

        let slot = match stage.stage {
            ShaderStage::Vertex => &mut vertex,
            ShaderStage::Fragment => &mut fragment,
            ShaderStage::Compute => return Err(ShaderError::UnsupportedStage(stage.stage)),
        };
        if slot.is_some() {
            return Err(ShaderError::Link(format!("more than one {} stage", stage.stage)));
        }
        *slot = Some(stage);
    }

    let vertex = vertex.ok_or_else(|| ShaderError::Link("missing Vertex stage".into()))?;
    let fragment = fragment.ok_or_else(|| ShaderError::Link("missing Fragment stage".into()))?;

    Ok(LinkedProgram {
        vertex,
        fragment,
        uniforms,
        textured,
    })
}

/// Compiles every stage, then links them.
pub(crate) fn build(stages: &[ShaderInfo<'_>]) -> Result<LinkedProgram, ShaderError> {
    let compiled = stages
        .iter()
        .map(compile_stage)
        .collect::<Result<Vec<_>, _>>()?;
    link(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::UniformType;

    const VERT: &str = r#"
        struct Camera {
            projection: mat4x4<f32>,
            view: mat4x4<f32>,
        };
        @group(0) @binding(0) var<uniform> camera: Camera;
        @group(0) @binding(1) var<uniform> model: mat4x4<f32>;

        struct VsOut {
            @builtin(position) clip: vec4<f32>,
            @location(0) uv: vec2<f32>,
        };

        @vertex
        fn vs_main(
            @location(0) position: vec3<f32>,
            @location(1) normal: vec3<f32>,
            @location(2) uv: vec2<f32>,
        ) -> VsOut {
            var out: VsOut;
            out.clip = camera.projection * camera.view * model * vec4<f32>(position, 1.0);
            out.uv = uv;
            return out;
        }
    "#;

    const FRAG: &str = r#"
        @group(1) @binding(0) var t_color: texture_2d<f32>;
        @group(1) @binding(1) var s_color: sampler;

        @fragment
        fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
            return textureSample(t_color, s_color, uv);
        }
    "#;

    const FRAG_FLAT: &str = r#"
        @group(0) @binding(2) var<uniform> color: vec3<f32>;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(color, 1.0);
        }
    "#;

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn compiles_valid_stage() {
        let stage = compile_stage(&ShaderInfo::vertex(VERT)).unwrap();
        assert_eq!(stage.stage, ShaderStage::Vertex);
        assert_eq!(stage.entry_point, "vs_main");
    }

    #[test]
    fn syntax_error_is_compile_error() {
        let err = compile_stage(&ShaderInfo::fragment("fn broken( {")).unwrap_err();
        match err {
            ShaderError::Compile { stage, message } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_error_is_compile_error() {
        let src = r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return 1.0; }
        "#;
        let err = compile_stage(&ShaderInfo::fragment(src)).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
    }

    #[test]
    fn missing_entry_point_for_stage() {
        // Valid WGSL, but only a vertex entry point.
        let err = compile_stage(&ShaderInfo::fragment(VERT)).unwrap_err();
        match err {
            ShaderError::Compile { message, .. } => assert!(message.contains("fragment")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn compute_is_unsupported() {
        let err = compile_stage(&ShaderInfo {
            stage: ShaderStage::Compute,
            source: "",
        })
        .unwrap_err();
        assert!(matches!(err, ShaderError::UnsupportedStage(ShaderStage::Compute)));
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn links_textured_program() {
        let program = build(&[ShaderInfo::vertex(VERT), ShaderInfo::fragment(FRAG)]).unwrap();
        assert!(program.textured);
        assert_eq!(program.vertex.entry_point, "vs_main");
        assert_eq!(program.fragment.entry_point, "fs_main");
        assert_eq!(program.uniforms.get("model").unwrap().ty, UniformType::Mat4);
        assert_eq!(program.uniforms.get("view").unwrap().offset, 64);
    }

    #[test]
    fn links_uniforms_from_both_stages() {
        let program = build(&[ShaderInfo::vertex(VERT), ShaderInfo::fragment(FRAG_FLAT)]).unwrap();
        assert!(!program.textured);
        assert_eq!(program.uniforms.get("color").unwrap().binding, 2);
        assert_eq!(program.uniforms.blocks().count(), 3);
    }

    #[test]
    fn missing_fragment_is_link_error() {
        let err = build(&[ShaderInfo::vertex(VERT)]).unwrap_err();
        assert!(matches!(err, ShaderError::Link(ref m) if m.contains("Fragment")));
    }

    #[test]
    fn duplicate_stage_is_link_error() {
        let err = build(&[
            ShaderInfo::vertex(VERT),
            ShaderInfo::vertex(VERT),
            ShaderInfo::fragment(FRAG),
        ])
        .unwrap_err();
        assert!(matches!(err, ShaderError::Link(_)));
    }

    #[test]
    fn conflicting_uniform_is_link_error() {
        let frag = r#"
            @group(0) @binding(1) var<uniform> model: vec4<f32>;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return model; }
        "#;
        let err = build(&[ShaderInfo::vertex(VERT), ShaderInfo::fragment(frag)]).unwrap_err();
        assert!(matches!(err, ShaderError::Link(ref m) if m.contains("'model'")));
    }

    #[test]
    fn unsupported_group_is_link_error() {
        let frag = r#"
            @group(3) @binding(0) var t: texture_2d<f32>;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return textureLoad(t, vec2<i32>(0, 0), 0); }
        "#;
        let err = build(&[ShaderInfo::vertex(VERT), ShaderInfo::fragment(frag)]).unwrap_err();
        assert!(matches!(err, ShaderError::Link(ref m) if m.contains("group 3")));
    }
}
