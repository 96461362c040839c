use std::borrow::Cow;
use std::fmt::Write as _;

use crate::batch::BatchError;
use crate::gfx::ShaderKind;

/// Bytes of the uniform block: one `mat4x4<f32>`.
const UNIFORM_SIZE: u64 = 64;

/// Compiled program plus the bind group layout its kind expects.
///
/// Binding 0 is always the uniform block holding the combined matrix.
#[derive(Debug, Clone)]
pub struct GpuShader {
    id: u32,
    kind: ShaderKind,
    label: String,
    module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniforms: wgpu::Buffer,
}

impl GpuShader {
    pub(crate) fn compile(
        device: &wgpu::Device,
        id: u32,
        kind: ShaderKind,
        label: &str,
        source: &str,
    ) -> Result<Self, BatchError> {
        validate_wgsl(label, source)?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        });
        let entries = layout_entries(kind);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::debug!("compiled shader '{label}' ({kind:?})");

        Ok(Self {
            id,
            kind,
            label: label.to_owned(),
            module,
            bind_group_layout,
            pipeline_layout,
            uniforms,
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub(crate) fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    #[inline]
    pub(crate) fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    #[inline]
    pub(crate) fn pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.pipeline_layout
    }

    #[inline]
    pub(crate) fn uniforms(&self) -> &wgpu::Buffer {
        &self.uniforms
    }
}

/// Built-in WGSL program for `kind`.
pub fn default_source(kind: ShaderKind) -> Cow<'static, str> {
    match kind {
        ShaderKind::Sprite => Cow::Borrowed(include_str!("shaders/sprite.wgsl")),
        ShaderKind::ArrayTexture => Cow::Borrowed(include_str!("shaders/array.wgsl")),
        ShaderKind::MultiTexture { units } => Cow::Owned(multi_texture_source(units)),
    }
}

/// Parses and validates WGSL before it reaches the device, whose own
/// validation failures are not recoverable.
pub(crate) fn validate_wgsl(label: &str, source: &str) -> Result<(), BatchError> {
    let compile_error = |log: String| BatchError::ShaderCompile {
        label: label.to_owned(),
        log,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.into_inner().to_string()))?;
    Ok(())
}

fn uniform_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
        },
        count: None,
    }
}

fn texture_entry(binding: u32, dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Binding of unit `unit`'s texture in a multi-texture shader.
#[inline]
pub(crate) fn unit_texture_binding(unit: u32) -> u32 {
    1 + 2 * unit
}

/// Binding of unit `unit`'s sampler, right after its texture.
#[inline]
pub(crate) fn unit_sampler_binding(unit: u32) -> u32 {
    2 + 2 * unit
}

// sprite:  0 uniforms, 1 texture, 2 sampler
// array:   0 uniforms, 1 texture array, 2 sampler
// multi:   0 uniforms, then a texture and sampler pair per unit
fn layout_entries(kind: ShaderKind) -> Vec<wgpu::BindGroupLayoutEntry> {
    match kind {
        ShaderKind::Sprite => vec![
            uniform_entry(),
            texture_entry(1, wgpu::TextureViewDimension::D2),
            sampler_entry(2),
        ],
        ShaderKind::ArrayTexture => vec![
            uniform_entry(),
            texture_entry(1, wgpu::TextureViewDimension::D2Array),
            sampler_entry(2),
        ],
        ShaderKind::MultiTexture { units } => {
            let mut entries = vec![uniform_entry()];
            for i in 0..units {
                entries.push(texture_entry(unit_texture_binding(i), wgpu::TextureViewDimension::D2));
                entries.push(sampler_entry(unit_sampler_binding(i)));
            }
            entries
        }
    }
}

/// Multi-texture program with a texture and sampler binding per unit.
///
/// Branches on a flat slot index, so sampling uses explicit gradients taken
/// in uniform control flow.
fn multi_texture_source(units: u32) -> String {
    let units = units.max(1);
    let mut src = String::from(
        "struct Uniforms {\n    proj_trans: mat4x4<f32>,\n};\n\n\
         @group(0) @binding(0) var<uniform> u: Uniforms;\n",
    );
    for i in 0..units {
        let _ = writeln!(
            src,
            "@group(0) @binding({}) var texture_{i}: texture_2d<f32>;\n\
             @group(0) @binding({}) var sampler_{i}: sampler;",
            unit_texture_binding(i),
            unit_sampler_binding(i),
        );
    }

    src.push_str(
        "\nstruct VsIn {\n\
         \x20   @location(0) position: vec2<f32>,\n\
         \x20   @location(1) color: vec4<f32>,\n\
         \x20   @location(2) uv: vec2<f32>,\n\
         \x20   @location(3) slot: f32,\n\
         };\n\n\
         struct VsOut {\n\
         \x20   @builtin(position) position: vec4<f32>,\n\
         \x20   @location(0) color: vec4<f32>,\n\
         \x20   @location(1) uv: vec2<f32>,\n\
         \x20   @location(2) @interpolate(flat) slot: i32,\n\
         };\n\n\
         @vertex\n\
         fn vs_main(in: VsIn) -> VsOut {\n\
         \x20   var out: VsOut;\n\
         \x20   out.position = u.proj_trans * vec4<f32>(in.position, 0.0, 1.0);\n\
         \x20   out.color = vec4<f32>(in.color.rgb, in.color.a * (255.0 / 254.0));\n\
         \x20   out.uv = in.uv;\n\
         \x20   out.slot = i32(in.slot);\n\
         \x20   return out;\n\
         }\n\n\
         @fragment\n\
         fn fs_main(in: VsOut) -> @location(0) vec4<f32> {\n\
         \x20   let ddx = dpdx(in.uv);\n\
         \x20   let ddy = dpdy(in.uv);\n\
         \x20   var texel: vec4<f32>;\n\
         \x20   switch in.slot {\n",
    );
    for i in 1..units {
        let _ = writeln!(
            src,
            "        case {i}: {{ texel = textureSampleGrad(texture_{i}, sampler_{i}, in.uv, ddx, ddy); }}"
        );
    }
    src.push_str(
        "        default: { texel = textureSampleGrad(texture_0, sampler_0, in.uv, ddx, ddy); }\n\
         \x20   }\n\
         \x20   return in.color * texel;\n\
         }\n",
    );
    src
}
