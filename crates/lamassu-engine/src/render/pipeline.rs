use std::collections::HashMap;

use crate::gfx::{BlendFactor, BlendFunc, Primitive, VertexFormat};

use super::shader::GpuShader;

/// What a render pipeline is specialised on besides the target format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub shader: u32,
    pub blend: Option<BlendFunc>,
    pub primitive: Primitive,
    pub format: VertexFormat,
}

/// Render pipelines built on demand, one per key.
pub(crate) struct PipelineCache {
    target_format: wgpu::TextureFormat,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(target_format: wgpu::TextureFormat) -> Self {
        Self {
            target_format,
            pipelines: HashMap::new(),
        }
    }

    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        shader: &GpuShader,
        blend: Option<BlendFunc>,
        primitive: Primitive,
    ) -> &wgpu::RenderPipeline {
        let key = PipelineKey {
            shader: shader.id(),
            blend,
            primitive,
            format: shader.kind().vertex_format(),
        };
        let target_format = self.target_format;
        self.pipelines.entry(key).or_insert_with(|| {
            log::debug!("building pipeline for {key:?}");
            create_pipeline(device, target_format, shader, &key)
        })
    }

    /// Drops every pipeline built for `shader`.
    pub fn evict_shader(&mut self, shader: u32) {
        self.pipelines.retain(|key, _| key.shader != shader);
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    target_format: wgpu::TextureFormat,
    shader: &GpuShader,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    let attributes = vertex_attributes(key.format);
    let layout = wgpu::VertexBufferLayout {
        array_stride: key.format.stride_bytes(),
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(shader.label()),
        layout: Some(shader.pipeline_layout()),

        vertex: wgpu::VertexState {
            module: shader.module(),
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[layout],
        },

        fragment: Some(wgpu::FragmentState {
            module: shader.module(),
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: key.blend.map(blend_state),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: match key.primitive {
                Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
                Primitive::Lines => wgpu::PrimitiveTopology::LineList,
            },
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

const SPRITE_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Unorm8x4,  // packed color
    2 => Float32x2  // uv
];

const SLOTTED_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Unorm8x4,
    2 => Float32x2,
    3 => Float32    // unit or layer
];

pub(crate) fn vertex_attributes(format: VertexFormat) -> &'static [wgpu::VertexAttribute] {
    match format {
        VertexFormat::Sprite => &SPRITE_ATTRS,
        VertexFormat::Slotted => &SLOTTED_ATTRS,
    }
}

pub(crate) fn blend_state(func: BlendFunc) -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: blend_factor(func.src_color),
            dst_factor: blend_factor(func.dst_color),
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: blend_factor(func.src_alpha),
            dst_factor: blend_factor(func.dst_alpha),
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::SrcAlphaSaturated => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_offsets_follow_the_vertex_records() {
        let sprite = vertex_attributes(VertexFormat::Sprite);
        let offsets: Vec<u64> = sprite.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 8, 12]);
        let last = sprite[2].offset + sprite[2].format.size();
        assert_eq!(last, VertexFormat::Sprite.stride_bytes());

        let slotted = vertex_attributes(VertexFormat::Slotted);
        assert_eq!(slotted[3].offset, 20);
        assert_eq!(slotted[3].shader_location, 3);
        assert_eq!(slotted[3].offset + 4, VertexFormat::Slotted.stride_bytes());
    }

    #[test]
    fn alpha_blend_maps_to_over() {
        let state = blend_state(BlendFunc::ALPHA);
        assert_eq!(state.color, wgpu::BlendState::ALPHA_BLENDING.color);
        assert_eq!(state.alpha.src_factor, wgpu::BlendFactor::SrcAlpha);
    }

    #[test]
    fn separate_alpha_factors_are_kept() {
        let func = BlendFunc::separate(
            BlendFactor::One,
            BlendFactor::OneMinusSrcColor,
            BlendFactor::DstAlpha,
            BlendFactor::Zero,
        );
        let state = blend_state(func);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::OneMinusSrc);
        assert_eq!(state.alpha.src_factor, wgpu::BlendFactor::DstAlpha);
        assert_eq!(state.alpha.dst_factor, wgpu::BlendFactor::Zero);
    }
}
