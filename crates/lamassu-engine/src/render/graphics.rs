use std::sync::atomic::{AtomicU32, Ordering};

use glam::Mat4;

use crate::batch::BatchError;
use crate::coords::Viewport;
use crate::gfx::{
    ArrayTextureDesc, BlendFunc, Graphics, MeshDesc, Primitive, ShaderKind, Texture,
    TextureFilter, VertexFormat, U_PROJ_TRANS, U_TEXTURE, U_TEXTURES,
};

use super::array::GpuArrayTexture;
use super::limits::{max_texture_units, MAX_SHADER_UNITS};
use super::mipmap::Mipmapper;
use super::pipeline::PipelineCache;
use super::shader::{default_source, unit_sampler_binding, unit_texture_binding, GpuShader};
use super::target::{RenderCtx, RenderTarget};
use super::texture::GpuTexture;

static NEXT_OBJECT_ID: AtomicU32 = AtomicU32::new(1);

fn next_id() -> u32 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Vertex and index buffers sized for one batch.
#[derive(Debug)]
pub struct GpuMesh {
    id: u32,
    format: VertexFormat,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    max_vertices: u32,
    max_indices: u32,
}

impl GpuMesh {
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn max_vertices(&self) -> u32 {
        self.max_vertices
    }

    #[inline]
    pub fn max_indices(&self) -> u32 {
        self.max_indices
    }
}

/// Array texture currently bound for sampling.
struct ArrayBinding {
    id: u32,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// [`Graphics`] backend on wgpu.
///
/// Each `render` records one pass into the current [`RenderTarget`] with
/// `LoadOp::Load` and submits it, so uploads made between draws are ordered
/// correctly. Without a target, draws are dropped with a warning.
pub struct WgpuGraphics {
    device: wgpu::Device,
    queue: wgpu::Queue,
    viewport: Viewport,
    target: Option<RenderTarget>,

    pipelines: PipelineCache,
    mipmapper: Option<Mipmapper>,

    placeholder: GpuTexture,
    units: Vec<Option<GpuTexture>>,
    array: Option<ArrayBinding>,

    active_shader: Option<u32>,
    blend: Option<BlendFunc>,
    depth_mask: bool,
}

impl WgpuGraphics {
    /// `format` is the color format of every target this backend draws into.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Self {
        let placeholder = GpuTexture::solid(&device, &queue, "lamassu white", [255; 4]);
        Self {
            device,
            queue,
            viewport,
            target: None,
            pipelines: PipelineCache::new(format),
            mipmapper: None,
            placeholder,
            units: vec![None; MAX_SHADER_UNITS as usize],
            array: None,
            active_shader: None,
            blend: None,
            depth_mask: true,
        }
    }

    pub fn from_ctx(ctx: &RenderCtx<'_>) -> Self {
        Self::new(ctx.device.clone(), ctx.queue.clone(), ctx.surface_format, ctx.viewport)
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Directs subsequent draws into `target`.
    pub fn set_target(&mut self, target: RenderTarget) {
        self.viewport = target.viewport();
        self.target = Some(target);
    }

    /// Drops the target, typically after the frame was presented.
    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Compiles a caller-supplied WGSL program.
    ///
    /// The program must follow the bind group layout and vertex inputs of
    /// `kind` and is only usable with batches of that kind.
    pub fn create_shader(
        &self,
        label: &str,
        kind: ShaderKind,
        source: &str,
    ) -> Result<GpuShader, BatchError> {
        GpuShader::compile(&self.device, next_id(), kind, label, source)
    }

    pub fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: TextureFilter,
    ) -> Result<GpuTexture, BatchError> {
        GpuTexture::from_rgba8(&self.device, &self.queue, label, width, height, pixels, filter)
    }

    #[inline]
    pub fn depth_mask(&self) -> bool {
        self.depth_mask
    }

    fn bind_group_for(&self, shader: &GpuShader) -> Option<wgpu::BindGroup> {
        let uniforms = wgpu::BindGroupEntry {
            binding: 0,
            resource: shader.uniforms().as_entire_binding(),
        };

        let group = match shader.kind() {
            ShaderKind::Sprite => {
                let texture = self.units[0].as_ref().unwrap_or(&self.placeholder);
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("lamassu sprite bind group"),
                    layout: shader.bind_group_layout(),
                    entries: &[
                        uniforms,
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(texture.view()),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(texture.sampler()),
                        },
                    ],
                })
            }
            ShaderKind::ArrayTexture => {
                let Some(array) = self.array.as_ref() else {
                    log::warn!("array-texture draw without a bound array; skipped");
                    return None;
                };
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("lamassu array bind group"),
                    layout: shader.bind_group_layout(),
                    entries: &[
                        uniforms,
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&array.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&array.sampler),
                        },
                    ],
                })
            }
            ShaderKind::MultiTexture { units } => {
                let bound = &self.units[..(units as usize).min(self.units.len())];
                let mut entries = Vec::with_capacity(2 * bound.len() + 1);
                entries.push(uniforms);
                for (i, texture) in bound.iter().enumerate() {
                    let texture = texture.as_ref().unwrap_or(&self.placeholder);
                    entries.push(wgpu::BindGroupEntry {
                        binding: unit_texture_binding(i as u32),
                        resource: wgpu::BindingResource::TextureView(texture.view()),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: unit_sampler_binding(i as u32),
                        resource: wgpu::BindingResource::Sampler(texture.sampler()),
                    });
                }
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("lamassu multi-texture bind group"),
                    layout: shader.bind_group_layout(),
                    entries: &entries,
                })
            }
        };
        Some(group)
    }
}

impl Graphics for WgpuGraphics {
    type Texture = GpuTexture;
    type ArrayTexture = GpuArrayTexture;
    type Shader = GpuShader;
    type Mesh = GpuMesh;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn max_texture_units(&self) -> u32 {
        max_texture_units(&self.device)
    }

    // ── mesh ──────────────────────────────────────────────────────────────

    fn create_mesh(&mut self, desc: &MeshDesc) -> Result<GpuMesh, BatchError> {
        let vertex_bytes = desc.max_vertices as u64 * desc.format.stride_bytes();
        // write_buffer needs 4-byte multiples: round u16 indices up to even
        let index_bytes = (desc.max_indices as u64).next_multiple_of(2) * 2;

        let max = self.device.limits().max_buffer_size;
        if vertex_bytes == 0 || vertex_bytes > max || index_bytes > max {
            return Err(BatchError::Resource(format!(
                "{}: mesh of {} vertices / {} indices does not fit a {max}-byte buffer",
                desc.label, desc.max_vertices, desc.max_indices
            )));
        }

        let vertices = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indices = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: index_bytes.max(4),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(GpuMesh {
            id: next_id(),
            format: desc.format,
            vertices,
            indices,
            max_vertices: desc.max_vertices,
            max_indices: desc.max_indices,
        })
    }

    fn upload_vertices(&mut self, mesh: &mut GpuMesh, vertices: &[f32]) {
        let capacity = mesh.max_vertices as usize * mesh.format.stride();
        let data = if vertices.len() > capacity {
            log::warn!(
                "mesh {}: {} floats exceed capacity {capacity}; truncated",
                mesh.id,
                vertices.len()
            );
            &vertices[..capacity]
        } else {
            vertices
        };
        if data.is_empty() {
            return;
        }
        self.queue
            .write_buffer(&mesh.vertices, 0, bytemuck::cast_slice(data));
    }

    fn upload_indices(&mut self, mesh: &mut GpuMesh, indices: &[u16]) {
        let capacity = mesh.max_indices as usize;
        let data = if indices.len() > capacity {
            log::warn!(
                "mesh {}: {} indices exceed capacity {capacity}; truncated",
                mesh.id,
                indices.len()
            );
            &indices[..capacity]
        } else {
            indices
        };
        if data.is_empty() {
            return;
        }

        if data.len() % 2 == 0 {
            self.queue
                .write_buffer(&mesh.indices, 0, bytemuck::cast_slice(data));
        } else {
            let mut padded = Vec::with_capacity(data.len() + 1);
            padded.extend_from_slice(data);
            padded.push(0);
            self.queue
                .write_buffer(&mesh.indices, 0, bytemuck::cast_slice(padded.as_slice()));
        }
    }

    fn render(
        &mut self,
        mesh: &GpuMesh,
        shader: &GpuShader,
        primitive: Primitive,
        offset: u32,
        count: u32,
    ) {
        if count == 0 {
            return;
        }
        let Some(target) = self.target.as_ref() else {
            log::warn!("{}: draw without a render target; skipped", shader.label());
            return;
        };
        if self.active_shader != Some(shader.id()) {
            log::trace!("{}: drawing with a shader that was not begun", shader.label());
        }
        let Some(bind_group) = self.bind_group_for(shader) else {
            return;
        };

        let pipeline = self
            .pipelines
            .get_or_create(&self.device, shader, self.blend, primitive);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lamassu batch encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lamassu batch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
            rpass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(offset..offset + count, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn dispose_mesh(&mut self, mesh: GpuMesh) {
        mesh.vertices.destroy();
        mesh.indices.destroy();
    }

    // ── shader ────────────────────────────────────────────────────────────

    fn create_default_shader(&mut self, kind: ShaderKind) -> Result<GpuShader, BatchError> {
        let label = match kind {
            ShaderKind::Sprite => "lamassu sprite shader",
            ShaderKind::MultiTexture { .. } => "lamassu multi-texture shader",
            ShaderKind::ArrayTexture => "lamassu array-texture shader",
        };
        let source = default_source(kind);
        GpuShader::compile(&self.device, next_id(), kind, label, &source)
    }

    fn begin_shader(&mut self, shader: &GpuShader) {
        self.active_shader = Some(shader.id());
    }

    fn end_shader(&mut self, shader: &GpuShader) {
        if self.active_shader == Some(shader.id()) {
            self.active_shader = None;
        }
    }

    fn set_uniform_matrix(&mut self, shader: &GpuShader, name: &str, value: &Mat4) {
        if name != U_PROJ_TRANS {
            log::warn!("{}: unknown matrix uniform '{name}'", shader.label());
            return;
        }
        let cols = value.to_cols_array();
        self.queue
            .write_buffer(shader.uniforms(), 0, bytemuck::bytes_of(&cols));
    }

    fn set_uniform_int(&mut self, shader: &GpuShader, name: &str, value: i32) {
        // sampler units are fixed by the bind group layout
        if name == U_TEXTURE {
            log::trace!("{}: {name} = {value}", shader.label());
        } else {
            log::warn!("{}: unknown int uniform '{name}'", shader.label());
        }
    }

    fn set_uniform_ints(&mut self, shader: &GpuShader, name: &str, values: &[i32]) {
        if name == U_TEXTURES {
            log::trace!("{}: {name} = {values:?}", shader.label());
        } else {
            log::warn!("{}: unknown int array uniform '{name}'", shader.label());
        }
    }

    fn dispose_shader(&mut self, shader: GpuShader) {
        self.pipelines.evict_shader(shader.id());
        log::debug!(
            "disposed shader '{}', {} pipelines cached",
            shader.label(),
            self.pipelines.len()
        );
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn bind_texture(&mut self, unit: u32, texture: &GpuTexture) {
        match self.units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture.clone()),
            None => log::warn!("texture unit {unit} out of range"),
        }
    }

    fn create_array_texture(
        &mut self,
        desc: &ArrayTextureDesc,
    ) -> Result<GpuArrayTexture, BatchError> {
        GpuArrayTexture::new(&self.device, next_id(), desc)
    }

    fn copy_to_layer(&mut self, array: &GpuArrayTexture, layer: u32, texture: &GpuTexture) {
        let desc = array.desc();
        if layer >= desc.layers {
            log::warn!("{}: layer {layer} out of range", desc.label);
            return;
        }
        let width = texture.width().min(desc.layer_width);
        let height = texture.height().min(desc.layer_height);
        if width < texture.width() || height < texture.height() {
            log::warn!(
                "{}: {}x{} texture clipped to its {}x{} layer",
                desc.label,
                texture.width(),
                texture.height(),
                desc.layer_width,
                desc.layer_height
            );
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lamassu layer copy"),
            });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: texture.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: array.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn generate_mipmaps(&mut self, array: &GpuArrayTexture, layers: &[u32]) {
        if array.mip_levels() <= 1 {
            return;
        }
        let mipmapper = self
            .mipmapper
            .get_or_insert_with(|| Mipmapper::new(&self.device));
        mipmapper.generate(&self.device, &self.queue, array, layers);
    }

    fn set_array_filter(
        &mut self,
        array: &mut GpuArrayTexture,
        mag: TextureFilter,
        min: TextureFilter,
    ) {
        array.set_filter(&self.device, mag, min);
        if let Some(bound) = self.array.as_mut().filter(|b| b.id == array.id()) {
            bound.sampler = array.sampler().clone();
        }
    }

    fn bind_array_texture(&mut self, unit: u32, array: &GpuArrayTexture) {
        if unit != 0 {
            log::warn!("array textures bind at unit 0 only, got {unit}");
        }
        self.array = Some(ArrayBinding {
            id: array.id(),
            view: array.view().clone(),
            sampler: array.sampler().clone(),
        });
    }

    fn dispose_array_texture(&mut self, array: GpuArrayTexture) {
        if self.array.as_ref().is_some_and(|b| b.id == array.id()) {
            self.array = None;
        }
        array.destroy();
    }

    // ── fixed-function state ──────────────────────────────────────────────

    fn set_depth_mask(&mut self, enabled: bool) {
        // no depth attachment; stored only
        self.depth_mask = enabled;
    }

    fn set_blend(&mut self, blend: Option<BlendFunc>) {
        self.blend = blend;
    }
}
