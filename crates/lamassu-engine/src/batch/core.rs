//! Flush controller shared by every batch variant.
//!
//! Owns the backend, the mesh, the vertex arena and all pipeline state that
//! is read at flush time. Variants wrap it and supply a [`Bindings`]
//! implementation that binds whatever their queued geometry samples.

use glam::Mat4;

use crate::gfx::{BlendFunc, Graphics, MeshDesc, Primitive, ShaderKind, U_PROJ_TRANS};
use crate::paint::WHITE_FLOAT_BITS;

use super::error::{BatchError, Result};
use super::state::{Action, DrawState, StateChange};
use super::vertices::{quad_indices, VertexBuffer, QUAD_INDICES, QUAD_VERTICES};

/// Texture bindings a variant contributes to each draw.
pub(crate) trait Bindings<G: Graphics> {
    /// Binds everything the queued geometry samples. Runs right before
    /// every draw call.
    fn bind(&mut self, graphics: &mut G);

    /// Sets sampler uniforms on a freshly bound shader.
    fn setup_uniforms(&self, graphics: &mut G, shader: &G::Shader);
}

/// Draw-call counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Draw calls since the last `begin`.
    pub render_calls: u32,
    /// Draw calls over the batch's lifetime.
    pub total_render_calls: u64,
    /// Largest quad count submitted in one draw call.
    pub max_sprites_in_batch: u32,
    /// Largest vertex count submitted in one draw call.
    pub max_vertices_in_batch: u32,
}

/// Index source of a batch.
#[derive(Debug)]
pub(crate) enum Indices {
    /// Static quad pattern uploaded once at construction.
    Quads,
    /// Triangle list accumulated alongside the vertices, as absolute indices.
    Triangles { list: Vec<u16>, capacity: usize },
}

impl Indices {
    fn capacity(&self) -> usize {
        match self {
            Self::Quads => usize::MAX,
            Self::Triangles { capacity, .. } => *capacity,
        }
    }

    fn fits(&self, count: usize) -> bool {
        match self {
            Self::Quads => true,
            Self::Triangles { list, capacity } => list.len() + count <= *capacity,
        }
    }
}

#[derive(Debug)]
struct BlendState {
    enabled: bool,
    func: BlendFunc,
    /// Last state sent to the backend; `None` until the first flush.
    applied: Option<Option<BlendFunc>>,
}

impl BlendState {
    fn desired(&self) -> Option<BlendFunc> {
        self.enabled.then_some(self.func)
    }

    fn apply<G: Graphics>(&mut self, graphics: &mut G) {
        let desired = self.desired();
        if self.applied != Some(desired) {
            graphics.set_blend(desired);
            self.applied = Some(desired);
        }
    }
}

pub(crate) struct BatchCore<G: Graphics> {
    pub(crate) graphics: G,
    mesh: G::Mesh,
    pub(crate) vertices: VertexBuffer,
    indices: Indices,

    default_shader: G::Shader,
    custom_shader: Option<G::Shader>,

    state: DrawState,
    blend: BlendState,
    projection: Mat4,
    transform: Mat4,
    color: f32,
    stats: BatchStats,

    label: &'static str,
}

#[inline]
fn active<'a, S>(custom: &'a Option<S>, default: &'a S) -> &'a S {
    custom.as_ref().unwrap_or(default)
}

impl<G: Graphics> BatchCore<G> {
    pub(crate) fn new(
        mut graphics: G,
        label: &'static str,
        kind: ShaderKind,
        max_vertices: usize,
        indices: Indices,
    ) -> Result<Self> {
        let format = kind.vertex_format();
        let max_indices = match &indices {
            Indices::Quads => max_vertices / QUAD_VERTICES * QUAD_INDICES,
            Indices::Triangles { capacity, .. } => *capacity,
        };

        let mut mesh = graphics.create_mesh(&MeshDesc {
            label,
            format,
            max_vertices: max_vertices as u32,
            max_indices: max_indices as u32,
        })?;

        if matches!(indices, Indices::Quads) {
            graphics.upload_indices(&mut mesh, &quad_indices(max_vertices / QUAD_VERTICES));
        }

        let default_shader = match graphics.create_default_shader(kind) {
            Ok(shader) => shader,
            Err(e) => {
                graphics.dispose_mesh(mesh);
                return Err(e);
            }
        };

        let projection = graphics.viewport().projection();

        log::debug!(
            "{label}: {max_vertices} vertices, {max_indices} indices, {kind:?} shader"
        );

        Ok(Self {
            graphics,
            mesh,
            vertices: VertexBuffer::new(max_vertices, format.stride()),
            indices,
            default_shader,
            custom_shader: None,
            state: DrawState::Idle,
            blend: BlendState {
                enabled: true,
                func: BlendFunc::default(),
                applied: None,
            },
            projection,
            transform: Mat4::IDENTITY,
            color: WHITE_FLOAT_BITS,
            stats: BatchStats::default(),
            label,
        })
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[inline]
    pub(crate) fn is_drawing(&self) -> bool {
        self.state.is_drawing()
    }

    /// Fails unless drawing; `op` names the caller in the error.
    #[inline]
    pub(crate) fn check_draw(&mut self, op: &'static str) -> Result<()> {
        self.state.transition(StateChange::Draw(op)).map(|_| ())
    }

    pub(crate) fn begin(&mut self, bindings: &impl Bindings<G>) -> Result<()> {
        self.state.transition(StateChange::Begin)?;

        self.stats.render_calls = 0;
        self.graphics.set_depth_mask(false);

        let combined = self.projection * self.transform;
        let shader = active(&self.custom_shader, &self.default_shader);
        self.graphics.begin_shader(shader);
        Self::setup_shader(&mut self.graphics, shader, &combined, bindings);
        Ok(())
    }

    pub(crate) fn end(&mut self, bindings: &mut impl Bindings<G>) -> Result<()> {
        self.state.transition(StateChange::End)?;

        self.flush(bindings);
        self.graphics.set_depth_mask(true);
        if self.blend.enabled {
            self.graphics.set_blend(None);
            self.blend.applied = Some(None);
        }

        let shader = active(&self.custom_shader, &self.default_shader);
        self.graphics.end_shader(shader);
        Ok(())
    }

    /// Submits queued geometry as one draw call. No-op when empty.
    pub(crate) fn flush(&mut self, bindings: &mut impl Bindings<G>) {
        if self.vertices.is_empty() {
            return;
        }

        let vertex_count = self.vertices.vertex_count();
        let index_count = match &self.indices {
            Indices::Quads => vertex_count / QUAD_VERTICES * QUAD_INDICES,
            Indices::Triangles { list, .. } => list.len(),
        };

        self.stats.render_calls += 1;
        self.stats.total_render_calls += 1;
        self.stats.max_vertices_in_batch = self.stats.max_vertices_in_batch.max(vertex_count as u32);
        if matches!(self.indices, Indices::Quads) {
            let quads = (vertex_count / QUAD_VERTICES) as u32;
            self.stats.max_sprites_in_batch = self.stats.max_sprites_in_batch.max(quads);
        }

        self.graphics.upload_vertices(&mut self.mesh, self.vertices.as_slice());
        if let Indices::Triangles { list, .. } = &mut self.indices {
            self.graphics.upload_indices(&mut self.mesh, list);
            list.clear();
        }

        bindings.bind(&mut self.graphics);
        self.blend.apply(&mut self.graphics);

        let shader = active(&self.custom_shader, &self.default_shader);
        self.graphics
            .render(&self.mesh, shader, Primitive::Triangles, 0, index_count as u32);

        log::trace!(
            "{}: flush #{} ({vertex_count} vertices, {index_count} indices)",
            self.label,
            self.stats.render_calls
        );

        self.vertices.clear();
    }

    fn setup_shader(
        graphics: &mut G,
        shader: &G::Shader,
        combined: &Mat4,
        bindings: &impl Bindings<G>,
    ) {
        graphics.set_uniform_matrix(shader, U_PROJ_TRANS, combined);
        bindings.setup_uniforms(graphics, shader);
    }

    // ── geometry room ─────────────────────────────────────────────────────

    /// Makes room for `floats` vertex floats and `indices` indices,
    /// flushing if the current batch cannot take them.
    pub(crate) fn ensure_room(
        &mut self,
        floats: usize,
        indices: usize,
        bindings: &mut impl Bindings<G>,
    ) -> Result<()> {
        if floats > self.vertices.capacity() || indices > self.indices.capacity() {
            let stride = self.vertices.stride();
            return Err(BatchError::BatchTooLarge {
                requested: floats / stride,
                max: self.vertices.capacity() / stride,
            });
        }
        if !self.vertices.fits(floats) || !self.indices.fits(indices) {
            self.flush(bindings);
        }
        Ok(())
    }

    /// Appends triangle indices relative to `base` vertex.
    pub(crate) fn push_triangles(&mut self, base: u16, triangles: &[u16]) {
        if let Indices::Triangles { list, .. } = &mut self.indices {
            list.extend(triangles.iter().map(|&t| base + t));
        }
    }

    #[inline]
    pub(crate) fn base_vertex(&self) -> u16 {
        self.vertices.vertex_count() as u16
    }

    // ── color ─────────────────────────────────────────────────────────────

    pub(crate) fn set_packed_color(&mut self, packed: f32) -> Result<()> {
        self.state.transition(StateChange::Color)?;
        self.color = packed;
        Ok(())
    }

    #[inline]
    pub(crate) fn packed_color(&self) -> f32 {
        self.color
    }

    // ── blending ──────────────────────────────────────────────────────────

    pub(crate) fn set_blend_function(&mut self, func: BlendFunc, bindings: &mut impl Bindings<G>) {
        if self.blend.func == func {
            return;
        }
        if self.state.needs_flush(StateChange::Blend) {
            self.flush(bindings);
        }
        self.blend.func = func;
    }

    pub(crate) fn set_blending(&mut self, enabled: bool, bindings: &mut impl Bindings<G>) {
        if self.blend.enabled == enabled {
            return;
        }
        if self.state.needs_flush(StateChange::Blend) {
            self.flush(bindings);
        }
        self.blend.enabled = enabled;
    }

    #[inline]
    pub(crate) fn blend_function(&self) -> BlendFunc {
        self.blend.func
    }

    #[inline]
    pub(crate) fn is_blending_enabled(&self) -> bool {
        self.blend.enabled
    }

    // ── matrices ──────────────────────────────────────────────────────────

    pub(crate) fn set_projection(&mut self, projection: Mat4, bindings: &mut impl Bindings<G>) {
        let drawing = self.state.needs_flush(StateChange::Matrix);
        if drawing {
            self.flush(bindings);
        }
        self.projection = projection;
        if drawing {
            self.upload_matrices();
        }
    }

    pub(crate) fn set_transform(&mut self, transform: Mat4, bindings: &mut impl Bindings<G>) {
        let drawing = self.state.needs_flush(StateChange::Matrix);
        if drawing {
            self.flush(bindings);
        }
        self.transform = transform;
        if drawing {
            self.upload_matrices();
        }
    }

    fn upload_matrices(&mut self) {
        let combined = self.projection * self.transform;
        let shader = active(&self.custom_shader, &self.default_shader);
        self.graphics.set_uniform_matrix(shader, U_PROJ_TRANS, &combined);
    }

    #[inline]
    pub(crate) fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub(crate) fn transform(&self) -> Mat4 {
        self.transform
    }

    // ── binding state ─────────────────────────────────────────────────────

    /// Flushes if drawing, ahead of a change to state the bindings read.
    pub(crate) fn flush_for_binding_change(&mut self, bindings: &mut impl Bindings<G>) {
        if self.state.needs_flush(StateChange::Binding) {
            self.flush(bindings);
        }
    }

    // ── shader ────────────────────────────────────────────────────────────

    /// Swaps the active program; `None` restores the default one.
    pub(crate) fn set_shader(
        &mut self,
        shader: Option<G::Shader>,
        bindings: &mut impl Bindings<G>,
    ) -> Result<()> {
        if self.state.transition(StateChange::Shader)? == Action::FlushThenApply {
            self.flush(bindings);
        }

        let outgoing = active(&self.custom_shader, &self.default_shader);
        self.graphics.end_shader(outgoing);

        self.custom_shader = shader;

        let combined = self.projection * self.transform;
        let incoming = active(&self.custom_shader, &self.default_shader);
        self.graphics.begin_shader(incoming);
        Self::setup_shader(&mut self.graphics, incoming, &combined, bindings);
        Ok(())
    }

    #[inline]
    pub(crate) fn shader(&self) -> &G::Shader {
        active(&self.custom_shader, &self.default_shader)
    }

    // ── diagnostics / teardown ────────────────────────────────────────────

    #[inline]
    pub(crate) fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Releases the mesh and the default shader and hands the backend back.
    /// A caller-supplied shader is left to its owner.
    pub(crate) fn dispose(self) -> G {
        let Self {
            mut graphics,
            mesh,
            default_shader,
            label,
            ..
        } = self;
        graphics.dispose_mesh(mesh);
        graphics.dispose_shader(default_shader);
        log::debug!("{label}: disposed");
        graphics
    }
}

/// Implements the state half of [`Batch`](super::Batch) by forwarding to
/// `self.core`, with `self.slots` as the bindings.
macro_rules! forward_batch_state {
    () => {
        fn flush(&mut self) {
            self.core.flush(&mut self.slots);
        }

        fn is_drawing(&self) -> bool {
            self.core.is_drawing()
        }

        fn set_packed_color(&mut self, packed: f32) -> $crate::batch::Result<()> {
            self.core.set_packed_color(packed)
        }

        fn packed_color(&self) -> f32 {
            self.core.packed_color()
        }

        fn set_blend_function_separate(
            &mut self,
            src_color: $crate::gfx::BlendFactor,
            dst_color: $crate::gfx::BlendFactor,
            src_alpha: $crate::gfx::BlendFactor,
            dst_alpha: $crate::gfx::BlendFactor,
        ) {
            let func = $crate::gfx::BlendFunc::separate(src_color, dst_color, src_alpha, dst_alpha);
            self.core.set_blend_function(func, &mut self.slots);
        }

        fn blend_function(&self) -> $crate::gfx::BlendFunc {
            self.core.blend_function()
        }

        fn enable_blending(&mut self) {
            self.core.set_blending(true, &mut self.slots);
        }

        fn disable_blending(&mut self) {
            self.core.set_blending(false, &mut self.slots);
        }

        fn is_blending_enabled(&self) -> bool {
            self.core.is_blending_enabled()
        }

        fn set_projection_matrix(&mut self, projection: ::glam::Mat4) {
            self.core.set_projection(projection, &mut self.slots);
        }

        fn projection_matrix(&self) -> ::glam::Mat4 {
            self.core.projection()
        }

        fn set_transform_matrix(&mut self, transform: ::glam::Mat4) {
            self.core.set_transform(transform, &mut self.slots);
        }

        fn transform_matrix(&self) -> ::glam::Mat4 {
            self.core.transform()
        }

        fn set_shader(&mut self, shader: Option<Self::Shader>) -> $crate::batch::Result<()> {
            self.core.set_shader(shader, &mut self.slots)
        }

        fn shader(&self) -> &Self::Shader {
            self.core.shader()
        }

        fn stats(&self) -> $crate::batch::BatchStats {
            self.core.stats()
        }
    };
}

pub(crate) use forward_batch_state;
