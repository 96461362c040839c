//! Headless backend that records every call.
//!
//! Drives the batches in tests without a GPU. Each [`DrawCall`] snapshots the
//! uploaded vertices together with what every texture unit and array layer
//! held at the moment of the draw, so tests can check which texture each
//! submitted vertex really sampled.

use std::collections::HashMap;

use glam::Mat4;

use crate::batch::BatchError;
use crate::coords::Viewport;

use super::blend::BlendFunc;
use super::graphics::{ArrayTextureDesc, Graphics, MeshDesc, Primitive};
use super::shader::{ShaderKind, U_PROJ_TRANS, VertexFormat};
use super::texture::{Texture, TextureFilter, TextureId};

const MAX_UNITS: usize = 32;

// ── handles ───────────────────────────────────────────────────────────────

/// Texture with dimensions and identity only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTexture {
    id: TextureId,
    width: u32,
    height: u32,
}

impl RecordedTexture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: TextureId::next(),
            width,
            height,
        }
    }
}

impl Texture for RecordedTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedShader {
    pub id: u32,
    /// `None` for caller-supplied programs.
    pub kind: Option<ShaderKind>,
    pub label: String,
}

#[derive(Debug)]
pub struct RecordedMesh {
    pub id: u32,
    pub desc: MeshDesc,
}

#[derive(Debug)]
pub struct RecordedArrayTexture {
    pub id: u32,
    pub desc: ArrayTextureDesc,
}

// ── log ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CreateMesh(u32),
    UploadVertices { mesh: u32, floats: usize },
    UploadIndices { mesh: u32, count: usize },
    CreateShader(u32),
    BeginShader(u32),
    EndShader(u32),
    UniformMatrix { shader: u32, name: String, value: Mat4 },
    UniformInt { shader: u32, name: String, value: i32 },
    UniformInts { shader: u32, name: String, values: Vec<i32> },
    BindTexture { unit: u32, texture: TextureId },
    CreateArray(u32),
    CopyToLayer { array: u32, layer: u32, texture: TextureId },
    GenerateMipmaps { array: u32, layers: Vec<u32> },
    SetArrayFilter { array: u32, mag: TextureFilter, min: TextureFilter },
    BindArray { unit: u32, array: u32 },
    SetDepthMask(bool),
    SetBlend(Option<BlendFunc>),
    /// Index into [`RecordingGraphics::draws`].
    Render(usize),
    DisposeMesh(u32),
    DisposeShader(u32),
    DisposeArray(u32),
}

/// Snapshot of one `render` call.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub shader: u32,
    pub format: VertexFormat,
    pub primitive: Primitive,
    pub offset: u32,
    pub count: u32,
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
    /// Texture resident in every unit.
    pub units: Vec<Option<TextureId>>,
    /// Texture resident in every layer of the array bound at unit 0, if any.
    pub layers: Vec<Option<TextureId>>,
    pub blend: Option<BlendFunc>,
    pub depth_mask: bool,
    pub proj_trans: Option<Mat4>,
}

impl DrawCall {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.format.stride()
    }

    pub fn vertex(&self, index: usize) -> &[f32] {
        let stride = self.format.stride();
        &self.vertices[index * stride..(index + 1) * stride]
    }

    /// Slot stamped into a slotted vertex.
    pub fn slot(&self, index: usize) -> Option<u32> {
        match self.format {
            VertexFormat::Sprite => None,
            VertexFormat::Slotted => Some(self.vertex(index)[5] as u32),
        }
    }

    /// Texture the given vertex samples under this draw's bindings.
    pub fn texture_of(&self, index: usize) -> Option<TextureId> {
        match self.slot(index) {
            None => self.units.first().copied().flatten(),
            Some(slot) if !self.layers.is_empty() => {
                self.layers.get(slot as usize).copied().flatten()
            }
            Some(slot) => self.units.get(slot as usize).copied().flatten(),
        }
    }
}

// ── backend ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MeshData {
    format: Option<VertexFormat>,
    vertices: Vec<f32>,
    indices: Vec<u16>,
}

#[derive(Debug)]
struct ArrayData {
    layers: Vec<Option<TextureId>>,
}

/// [`Graphics`] implementation that keeps everything in memory.
#[derive(Debug)]
pub struct RecordingGraphics {
    viewport: Viewport,
    max_units: u32,
    shader_failure: Option<String>,

    next_id: u32,
    meshes: HashMap<u32, MeshData>,
    arrays: HashMap<u32, ArrayData>,
    matrices: HashMap<u32, Mat4>,

    units: Vec<Option<TextureId>>,
    bound_array: Option<u32>,
    active_shader: Option<u32>,
    blend: Option<BlendFunc>,
    depth_mask: bool,

    events: Vec<Event>,
    draws: Vec<DrawCall>,
}

impl Default for RecordingGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGraphics {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::new(640.0, 480.0),
            max_units: 8,
            shader_failure: None,
            next_id: 1,
            meshes: HashMap::new(),
            arrays: HashMap::new(),
            matrices: HashMap::new(),
            units: vec![None; MAX_UNITS],
            bound_array: None,
            active_shader: None,
            blend: None,
            depth_mask: true,
            events: Vec::new(),
            draws: Vec::new(),
        }
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_units = units;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Makes every later shader creation fail with `log`.
    pub fn with_shader_failure(mut self, log: impl Into<String>) -> Self {
        self.shader_failure = Some(log.into());
        self
    }

    /// A caller-supplied program.
    pub fn custom_shader(&mut self, label: &str) -> RecordedShader {
        let id = self.alloc_id();
        self.events.push(Event::CreateShader(id));
        RecordedShader {
            id,
            kind: None,
            label: label.to_string(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn clear_log(&mut self) {
        self.events.clear();
        self.draws.clear();
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn blend(&self) -> Option<BlendFunc> {
        self.blend
    }

    pub fn depth_mask(&self) -> bool {
        self.depth_mask
    }

    pub fn active_shader(&self) -> Option<u32> {
        self.active_shader
    }

    /// Current contents of an array texture's layers.
    pub fn layers(&self, array: &RecordedArrayTexture) -> Vec<Option<TextureId>> {
        self.arrays
            .get(&array.id)
            .map(|a| a.layers.clone())
            .unwrap_or_default()
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Graphics for RecordingGraphics {
    type Texture = RecordedTexture;
    type ArrayTexture = RecordedArrayTexture;
    type Shader = RecordedShader;
    type Mesh = RecordedMesh;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn max_texture_units(&self) -> u32 {
        self.max_units
    }

    fn create_mesh(&mut self, desc: &MeshDesc) -> Result<Self::Mesh, BatchError> {
        let id = self.alloc_id();
        self.meshes.insert(
            id,
            MeshData {
                format: Some(desc.format),
                ..MeshData::default()
            },
        );
        self.events.push(Event::CreateMesh(id));
        Ok(RecordedMesh { id, desc: *desc })
    }

    fn upload_vertices(&mut self, mesh: &mut Self::Mesh, vertices: &[f32]) {
        let data = self.meshes.entry(mesh.id).or_default();
        data.vertices.clear();
        data.vertices.extend_from_slice(vertices);
        self.events.push(Event::UploadVertices {
            mesh: mesh.id,
            floats: vertices.len(),
        });
    }

    fn upload_indices(&mut self, mesh: &mut Self::Mesh, indices: &[u16]) {
        let data = self.meshes.entry(mesh.id).or_default();
        data.indices.clear();
        data.indices.extend_from_slice(indices);
        self.events.push(Event::UploadIndices {
            mesh: mesh.id,
            count: indices.len(),
        });
    }

    fn render(
        &mut self,
        mesh: &Self::Mesh,
        shader: &Self::Shader,
        primitive: Primitive,
        offset: u32,
        count: u32,
    ) {
        let Some(data) = self.meshes.get(&mesh.id) else {
            log::warn!("render with unknown mesh {}", mesh.id);
            return;
        };

        let start = (offset as usize).min(data.indices.len());
        let end = (start + count as usize).min(data.indices.len());
        let layers = self
            .bound_array
            .and_then(|id| self.arrays.get(&id))
            .map(|a| a.layers.clone())
            .unwrap_or_default();

        let call = DrawCall {
            shader: shader.id,
            format: data.format.unwrap_or(mesh.desc.format),
            primitive,
            offset,
            count,
            vertices: data.vertices.clone(),
            indices: data.indices[start..end].to_vec(),
            units: self.units.clone(),
            layers,
            blend: self.blend,
            depth_mask: self.depth_mask,
            proj_trans: self.matrices.get(&shader.id).copied(),
        };

        self.draws.push(call);
        self.events.push(Event::Render(self.draws.len() - 1));
    }

    fn dispose_mesh(&mut self, mesh: Self::Mesh) {
        self.meshes.remove(&mesh.id);
        self.events.push(Event::DisposeMesh(mesh.id));
    }

    fn create_default_shader(&mut self, kind: ShaderKind) -> Result<Self::Shader, BatchError> {
        let label = format!("{kind:?}");
        if let Some(log) = &self.shader_failure {
            return Err(BatchError::ShaderCompile {
                label,
                log: log.clone(),
            });
        }
        let id = self.alloc_id();
        self.events.push(Event::CreateShader(id));
        Ok(RecordedShader {
            id,
            kind: Some(kind),
            label,
        })
    }

    fn begin_shader(&mut self, shader: &Self::Shader) {
        self.active_shader = Some(shader.id);
        self.events.push(Event::BeginShader(shader.id));
    }

    fn end_shader(&mut self, shader: &Self::Shader) {
        if self.active_shader == Some(shader.id) {
            self.active_shader = None;
        }
        self.events.push(Event::EndShader(shader.id));
    }

    fn set_uniform_matrix(&mut self, shader: &Self::Shader, name: &str, value: &Mat4) {
        if name == U_PROJ_TRANS {
            self.matrices.insert(shader.id, *value);
        }
        self.events.push(Event::UniformMatrix {
            shader: shader.id,
            name: name.to_string(),
            value: *value,
        });
    }

    fn set_uniform_int(&mut self, shader: &Self::Shader, name: &str, value: i32) {
        self.events.push(Event::UniformInt {
            shader: shader.id,
            name: name.to_string(),
            value,
        });
    }

    fn set_uniform_ints(&mut self, shader: &Self::Shader, name: &str, values: &[i32]) {
        self.events.push(Event::UniformInts {
            shader: shader.id,
            name: name.to_string(),
            values: values.to_vec(),
        });
    }

    fn dispose_shader(&mut self, shader: Self::Shader) {
        self.events.push(Event::DisposeShader(shader.id));
    }

    fn bind_texture(&mut self, unit: u32, texture: &Self::Texture) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = Some(texture.id());
        }
        if unit == 0 {
            self.bound_array = None;
        }
        self.events.push(Event::BindTexture {
            unit,
            texture: texture.id(),
        });
    }

    fn create_array_texture(
        &mut self,
        desc: &ArrayTextureDesc,
    ) -> Result<Self::ArrayTexture, BatchError> {
        let id = self.alloc_id();
        self.arrays.insert(
            id,
            ArrayData {
                layers: vec![None; desc.layers as usize],
            },
        );
        self.events.push(Event::CreateArray(id));
        Ok(RecordedArrayTexture { id, desc: *desc })
    }

    fn copy_to_layer(&mut self, array: &Self::ArrayTexture, layer: u32, texture: &Self::Texture) {
        if texture.width() > array.desc.layer_width || texture.height() > array.desc.layer_height {
            log::warn!("copy of {}x{} texture overflows layer", texture.width(), texture.height());
        }
        if let Some(slot) = self
            .arrays
            .get_mut(&array.id)
            .and_then(|a| a.layers.get_mut(layer as usize))
        {
            *slot = Some(texture.id());
        }
        self.events.push(Event::CopyToLayer {
            array: array.id,
            layer,
            texture: texture.id(),
        });
    }

    fn generate_mipmaps(&mut self, array: &Self::ArrayTexture, layers: &[u32]) {
        self.events.push(Event::GenerateMipmaps {
            array: array.id,
            layers: layers.to_vec(),
        });
    }

    fn set_array_filter(
        &mut self,
        array: &mut Self::ArrayTexture,
        mag: TextureFilter,
        min: TextureFilter,
    ) {
        array.desc.mag_filter = mag;
        array.desc.min_filter = min;
        self.events.push(Event::SetArrayFilter {
            array: array.id,
            mag,
            min,
        });
    }

    fn bind_array_texture(&mut self, unit: u32, array: &Self::ArrayTexture) {
        if unit == 0 {
            self.bound_array = Some(array.id);
        }
        self.events.push(Event::BindArray {
            unit,
            array: array.id,
        });
    }

    fn dispose_array_texture(&mut self, array: Self::ArrayTexture) {
        self.arrays.remove(&array.id);
        if self.bound_array == Some(array.id) {
            self.bound_array = None;
        }
        self.events.push(Event::DisposeArray(array.id));
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.depth_mask = enabled;
        self.events.push(Event::SetDepthMask(enabled));
    }

    fn set_blend(&mut self, blend: Option<BlendFunc>) {
        self.blend = blend;
        self.events.push(Event::SetBlend(blend));
    }
}
