//! Central runtime state for the viewer. Owns the wgpu device/surface, the
//! registered view stack, the pick handle, the synchronizer, and the GPU
//! buffers behind every view's content. Submodules cover lifecycle slices:
//! `init` for setup, `render` for the per-frame composite, `input` for
//! pointer and key routing. `mesh` and `shaders` hold geometry and WGSL.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use wgpu::SurfaceError;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton},
    window::Window,
};

use crate::cli::Args;
use crate::cloud_loader::CloudLoader;
use crate::handle::Handle;
use crate::highlight::HighlightVolume;
use crate::pick::MeshCollider;
use crate::scenes::{Oscillation, Turntable};
use crate::sync::Synchronizer;
use crate::views::ViewStack;

pub mod mesh;
pub mod shaders;

mod init;
mod input;
mod render;

/// Index ranges of one primitive inside the shared static buffers.
#[derive(Debug, Clone)]
struct PrimitiveSlot {
    indices: Range<u32>,
    base_vertex: i32,
}

/// Static geometry shared by the handle, highlight, and fallback visuals.
struct PrimitiveLibrary {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    disc: PrimitiveSlot,
    ring: PrimitiveSlot,
    arrow: PrimitiveSlot,
    highlight_box: PrimitiveSlot,
    fallback_box: PrimitiveSlot,
    fallback_sphere: PrimitiveSlot,
}

impl PrimitiveLibrary {
    fn buffers_for(&self, slot: &PrimitiveSlot) -> (&wgpu::Buffer, &wgpu::Buffer, PrimitiveSlot) {
        (&self.vertex_buffer, &self.index_buffer, slot.clone())
    }
}

/// The loaded model mesh, or the fallback geometry when loading failed.
struct ModelResources {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    loaded: bool,
}

/// Texture and letterbox uniforms for the depth-image view.
struct DepthQuadResources {
    bind_group: wgpu::BindGroup,
    fit_buffer: wgpu::Buffer,
    image_aspect: f32,
    decoded: bool,
}

/// One registered view's uniform buffer and bind group.
struct ViewSlot {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Reconstructed cloud points on the GPU.
struct CloudResources {
    vertex_buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
}

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth_view: wgpu::TextureView,

    solid_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,

    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    border_bind_group: wgpu::BindGroup,
    backdrop_bind_group: wgpu::BindGroup,

    view_slots: Vec<ViewSlot>,
    primitives: PrimitiveLibrary,
    model: ModelResources,
    depth_quad: DepthQuadResources,
    cloud_points: CloudResources,

    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    grid_vertex_buffer: wgpu::Buffer,
    grid_vertex_count: u32,
    edge_vertex_buffer: wgpu::Buffer,

    views: ViewStack,
    handle: Handle,
    synchronizer: Synchronizer,
    highlight: HighlightVolume,
    turntable: Turntable,
    oscillation: Oscillation,
    collider: Option<MeshCollider>,
    cloud_loader: CloudLoader,
    depth_image: PathBuf,
    color_image: PathBuf,
    field_of_view: f32,
    cursor: Option<PhysicalPosition<f64>>,
    last_frame: Instant,
    elapsed_seconds: f32,
}

impl ViewerState {
    pub async fn new(window: Arc<Window>, args: &Args) -> Result<Self> {
        init::new(window, args).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        init::resize(self, new_size);
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        render::render(self)
    }

    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        input::cursor_moved(self, position);
    }

    pub fn mouse_input(&mut self, state: ElementState, button: MouseButton) {
        input::mouse_input(self, state, button);
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        input::handle_key_event(self, event);
    }
}
