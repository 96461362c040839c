use crate::coords::Viewport;

/// Device handles needed to build GPU resources during a frame.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    /// Logical size of the surface.
    pub viewport: Viewport,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            viewport,
        }
    }
}

/// Color view the backend draws into, with its size in world units.
///
/// Owned and cheap to clone; hand a copy to every backend drawing this frame.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    view: wgpu::TextureView,
    viewport: Viewport,
}

impl RenderTarget {
    #[inline]
    pub fn new(view: wgpu::TextureView, viewport: Viewport) -> Self {
        Self { view, viewport }
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}
