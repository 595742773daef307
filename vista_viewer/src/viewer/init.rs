//! Bootstraps wgpu, loads the model and the depth/color pair, builds every
//! pipeline and static buffer, and hands back a ready-to-render
//! `ViewerState` so the frame loop stays lightweight.

use std::{borrow::Cow, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use super::mesh::{
    self, LineVertex, MeshInstance, MeshVertex, PointVertex, Primitive, ViewUniforms,
};
use super::shaders::{
    FLAT_SHADER, MESH_SHADER, QUAD_INDICES, QUAD_VERTICES, QuadVertex, SOLID_SHADER,
    TEXTURED_QUAD_SHADER,
};
use super::{
    CloudResources, DepthQuadResources, ModelResources, PrimitiveLibrary, PrimitiveSlot,
    ViewSlot, ViewerState,
};
use crate::cli::{self, Args};
use crate::cloud_loader::CloudLoader;
use crate::handle::{
    ARROW_LENGTH, HANDLE_DISC_RADIUS, HANDLE_RING_INNER, HANDLE_RING_OUTER, Handle,
};
use crate::highlight::{HIGHLIGHT_COLOR, HIGHLIGHT_EXTENT, HighlightVolume};
use crate::layout::VIEW_BORDER_COLOR;
use crate::pick::MeshCollider;
use crate::scenes::{Oscillation, Turntable};
use crate::sync::Synchronizer;
use crate::texture::{depth_preview_rgba, placeholder_rgba, stage_rgba_upload};
use crate::views::stock_views;
use vista_formats::{MODEL_TARGET_EXTENT, MeshAsset, load_image_pair};

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Background inside every view, behind the content.
pub(super) const BACKDROP_COLOR: [f32; 4] = [0.012, 0.012, 0.018, 1.0];

const MODEL_FALLBACK_COLOR: [f32; 3] = [1.0, 0.45, 0.1];
pub(super) const TURNTABLE_FALLBACK_COLOR: [f32; 3] = [0.85, 0.2, 0.75];
pub(super) const CLOUD_FALLBACK_COLOR: [f32; 3] = [0.25, 0.45, 1.0];
pub(super) const HANDLE_COLOR: [f32; 3] = [0.0, 1.0, 1.0];
pub(super) const HANDLE_SELECTED_COLOR: [f32; 3] = [1.0, 1.0, 0.0];
pub(super) const GRID_COLOR: [f32; 3] = [0.22, 0.22, 0.26];
const DEPTH_PLACEHOLDER_COLOR: [u8; 3] = [82, 82, 90];

const INITIAL_INSTANCE_CAPACITY: usize = 16;
const INITIAL_POINT_CAPACITY: usize = 4096;
const EDGE_VERTEX_COUNT: usize = 24;

/// Bundles the wgpu objects tied to the viewer window.
struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
}

struct BindGroupLayouts {
    solid: wgpu::BindGroupLayout,
    textured: wgpu::BindGroupLayout,
    view: wgpu::BindGroupLayout,
}

struct Pipelines {
    solid: wgpu::RenderPipeline,
    textured: wgpu::RenderPipeline,
    mesh: wgpu::RenderPipeline,
    line: wgpu::RenderPipeline,
    point: wgpu::RenderPipeline,
}

pub(super) async fn new(window: Arc<Window>, args: &Args) -> Result<ViewerState> {
    let size = window.inner_size();
    let wgpu = bootstrap_wgpu(window.clone()).await?;

    let mut views = stock_views();
    if let Some(path) = &args.layout_preset {
        let preset = cli::load_layout_preset(path)?;
        cli::apply_layout_preset(&mut views, &preset);
    }

    let (model_primitive, collider, model_loaded) = resolve_model(args);
    let (depth_rgba, depth_width, depth_height, depth_decoded) = resolve_depth_preview(args);

    let layouts = create_bind_group_layouts(&wgpu.device);
    let pipelines = create_pipelines(&wgpu.device, &layouts, wgpu.surface_format);
    let depth_view = create_depth_texture(&wgpu.device, size);

    let quad_vertex_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-quad-vertices"),
        contents: cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let quad_index_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-quad-indices"),
        contents: cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    let border_bind_group =
        create_solid_bind_group(&wgpu.device, &layouts.solid, "border", VIEW_BORDER_COLOR);
    let backdrop_bind_group =
        create_solid_bind_group(&wgpu.device, &layouts.solid, "backdrop", BACKDROP_COLOR);

    let view_slots = (0..views.len())
        .map(|index| create_view_slot(&wgpu.device, &layouts.view, index))
        .collect();

    let primitives = create_primitive_library(&wgpu.device);
    let model = create_model_resources(&wgpu.device, &model_primitive, model_loaded);
    let depth_quad = create_depth_quad(
        &wgpu.device,
        &wgpu.queue,
        &layouts.textured,
        &depth_rgba,
        depth_width,
        depth_height,
        depth_decoded,
    )?;

    let instance_buffer = wgpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vista-mesh-instances"),
        size: (INITIAL_INSTANCE_CAPACITY * std::mem::size_of::<MeshInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let grid_vertices = mesh::grid_lines(10.0, 20, GRID_COLOR);
    let grid_vertex_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-grid-lines"),
        contents: cast_slice(&grid_vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let edge_vertex_buffer = wgpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vista-highlight-edges"),
        size: (EDGE_VERTEX_COUNT * std::mem::size_of::<LineVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let cloud_points = CloudResources {
        vertex_buffer: wgpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vista-cloud-points"),
            size: (INITIAL_POINT_CAPACITY * std::mem::size_of::<PointVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }),
        capacity: INITIAL_POINT_CAPACITY,
        count: 0,
    };

    let mut cloud_loader = CloudLoader::spawn();
    cloud_loader.request(
        args.depth_image.clone(),
        args.color_image.clone(),
        args.field_of_view,
    );

    let handle = Handle::new(0.0, 0.0);
    let synchronizer = Synchronizer::new(args.mapping());
    let mut highlight = HighlightVolume::default();
    let initial = handle.position();
    synchronizer.push(initial.x, initial.z, &mut highlight);

    let mut state = ViewerState {
        window,
        surface: wgpu.surface,
        device: wgpu.device,
        queue: wgpu.queue,
        config: wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu.surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu.present_mode,
            alpha_mode: wgpu.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        },
        size,
        depth_view,
        solid_pipeline: pipelines.solid,
        textured_pipeline: pipelines.textured,
        mesh_pipeline: pipelines.mesh,
        line_pipeline: pipelines.line,
        point_pipeline: pipelines.point,
        quad_vertex_buffer,
        quad_index_buffer,
        border_bind_group,
        backdrop_bind_group,
        view_slots,
        primitives,
        model,
        depth_quad,
        cloud_points,
        instance_buffer,
        instance_capacity: INITIAL_INSTANCE_CAPACITY,
        grid_vertex_buffer,
        grid_vertex_count: grid_vertices.len() as u32,
        edge_vertex_buffer,
        views,
        handle,
        synchronizer,
        highlight,
        turntable: Turntable::default(),
        oscillation: Oscillation::default(),
        collider,
        cloud_loader,
        depth_image: args.depth_image.clone(),
        color_image: args.color_image.clone(),
        field_of_view: args.field_of_view,
        cursor: None,
        last_frame: Instant::now(),
        elapsed_seconds: 0.0,
    };

    state.surface.configure(&state.device, &state.config);
    Ok(state)
}

pub(super) fn resize(state: &mut ViewerState, new_size: PhysicalSize<u32>) {
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }
    state.size = new_size;
    state.config.width = new_size.width;
    state.config.height = new_size.height;
    state.surface.configure(&state.device, &state.config);
    state.depth_view = create_depth_texture(&state.device, new_size);
}

async fn bootstrap_wgpu(window: Arc<Window>) -> Result<WgpuBootstrap> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("creating wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("requesting wgpu adapter")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vista-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("requesting wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .unwrap_or(surface_caps.formats[0]);
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

/// Loads and normalizes the model asset, or falls back to a distinctly
/// colored box so the views stay populated after a load failure.
fn resolve_model(args: &Args) -> (Primitive, Option<MeshCollider>, bool) {
    let Some(path) = &args.mesh_json else {
        log::info!("no mesh asset supplied; model views use fallback geometry");
        return (fallback_model(), None, false);
    };
    match MeshAsset::from_json_path(path) {
        Ok(mut asset) => {
            let scale = asset.normalize(MODEL_TARGET_EXTENT);
            println!(
                "Loaded mesh asset {} ({} vertices, {} triangles, fit scale {:.3})",
                path.display(),
                asset.positions.len(),
                asset.indices.len() / 3,
                scale
            );
            let collider = MeshCollider {
                positions: asset.positions.clone(),
                indices: asset.indices.clone(),
            };
            (mesh::from_asset(&asset), Some(collider), true)
        }
        Err(err) => {
            eprintln!("[vista_viewer] falling back to placeholder model: {err}");
            (fallback_model(), None, false)
        }
    }
}

fn fallback_model() -> Primitive {
    mesh::build_box(Vec3::new(2.0, 2.0, 2.0), MODEL_FALLBACK_COLOR)
}

/// Decodes the depth raster once for the depth-image view's quad. The
/// reconstruction path decodes independently on the worker thread.
fn resolve_depth_preview(args: &Args) -> (Vec<u8>, u32, u32, bool) {
    match load_image_pair(&args.depth_image, &args.color_image) {
        Ok(pair) => {
            let rgba = depth_preview_rgba(&pair.depth);
            (rgba, pair.depth.width, pair.depth.height, true)
        }
        Err(err) => {
            eprintln!("[vista_viewer] depth preview unavailable: {err}");
            (placeholder_rgba(4, 4, DEPTH_PLACEHOLDER_COLOR), 4, 4, false)
        }
    }
}

fn create_bind_group_layouts(device: &wgpu::Device) -> BindGroupLayouts {
    let solid = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vista-solid-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(16),
            },
            count: None,
        }],
    });

    let textured = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vista-textured-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(16),
                },
                count: None,
            },
        ],
    });

    let view = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vista-view-uniform-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<ViewUniforms>() as u64
                ),
            },
            count: None,
        }],
    });

    BindGroupLayouts {
        solid,
        textured,
        view,
    }
}

fn create_solid_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    color: [f32; 4],
) -> wgpu::BindGroup {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("vista-{label}-color")),
        contents: cast_slice(&color),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("vista-{label}-bind-group")),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

fn create_view_slot(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    index: usize,
) -> ViewSlot {
    let initial = ViewUniforms {
        view_projection: Mat4::IDENTITY.to_cols_array_2d(),
    };
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("vista-view-{index}-uniforms")),
        contents: cast_slice(&[initial]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("vista-view-{index}-bind-group")),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });
    ViewSlot {
        uniform_buffer,
        bind_group,
    }
}

/// Concatenates the shared primitives into one vertex/index buffer pair and
/// records the slot each draw uses.
fn create_primitive_library(device: &wgpu::Device) -> PrimitiveLibrary {
    let mut vertices: Vec<MeshVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut append = |primitive: Primitive| -> PrimitiveSlot {
        let base_vertex = vertices.len() as i32;
        let start = indices.len() as u32;
        vertices.extend_from_slice(&primitive.vertices);
        indices.extend_from_slice(&primitive.indices);
        PrimitiveSlot {
            indices: start..indices.len() as u32,
            base_vertex,
        }
    };

    // Tintable primitives are built white; the instance color carries the
    // handle's cyan/yellow swap and the fallback hues.
    let white = [1.0, 1.0, 1.0];
    let disc = append(mesh::build_disc(HANDLE_DISC_RADIUS, 24, white));
    let ring = append(mesh::build_ring(
        HANDLE_RING_INNER,
        HANDLE_RING_OUTER,
        24,
        white,
    ));
    let arrow = append(mesh::build_arrow(ARROW_LENGTH, white));
    let highlight_box = append(mesh::build_box(HIGHLIGHT_EXTENT, HIGHLIGHT_COLOR));
    let fallback_box = append(mesh::build_box(Vec3::new(2.0, 2.0, 2.0), white));
    let fallback_sphere = append(mesh::build_sphere(1.5, 12, 18, white));
    drop(append);

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-primitive-vertices"),
        contents: cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-primitive-indices"),
        contents: cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    PrimitiveLibrary {
        vertex_buffer,
        index_buffer,
        disc,
        ring,
        arrow,
        highlight_box,
        fallback_box,
        fallback_sphere,
    }
}

fn create_model_resources(
    device: &wgpu::Device,
    primitive: &Primitive,
    loaded: bool,
) -> ModelResources {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-model-vertices"),
        contents: cast_slice(&primitive.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-model-indices"),
        contents: cast_slice(&primitive.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    ModelResources {
        vertex_buffer,
        index_buffer,
        index_count: primitive.index_count(),
        loaded,
    }
}

fn create_depth_quad(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    rgba: &[u8],
    width: u32,
    height: u32,
    decoded: bool,
) -> Result<DepthQuadResources> {
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("vista-depth-quad-texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("vista-depth-quad-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let upload = stage_rgba_upload(width, height, rgba)?;
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        upload.data(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(upload.bytes_per_row()),
            rows_per_image: Some(height),
        },
        extent,
    );

    let fit_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("vista-depth-quad-fit"),
        contents: cast_slice(&[1.0_f32, 1.0, 0.0, 0.0]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("vista-depth-quad-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: fit_buffer.as_entire_binding(),
            },
        ],
    });

    Ok(DepthQuadResources {
        bind_group,
        fit_buffer,
        image_aspect: width.max(1) as f32 / height.max(1) as f32,
        decoded,
    })
}

fn create_depth_texture(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("vista-depth-buffer"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_pipelines(
    device: &wgpu::Device,
    layouts: &BindGroupLayouts,
    surface_format: wgpu::TextureFormat,
) -> Pipelines {
    let quad_vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };
    let solid_vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
    };
    let mesh_vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3],
    };
    let mesh_instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &wgpu::vertex_attr_array![
            3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4, 7 => Float32x4
        ],
    };
    let flat_vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LineVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
    };

    let solid_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vista-solid-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SOLID_SHADER)),
    });
    let textured_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vista-textured-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(TEXTURED_QUAD_SHADER)),
    });
    let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vista-mesh-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(MESH_SHADER)),
    });
    let flat_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("vista-flat-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(FLAT_SHADER)),
    });

    let solid_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vista-solid-pipeline-layout"),
        bind_group_layouts: &[&layouts.solid],
        push_constant_ranges: &[],
    });
    let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vista-textured-pipeline-layout"),
        bind_group_layouts: &[&layouts.textured],
        push_constant_ranges: &[],
    });
    let view_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vista-view-pipeline-layout"),
        bind_group_layouts: &[&layouts.view],
        push_constant_ranges: &[],
    });

    let color_target = [Some(wgpu::ColorTargetState {
        format: surface_format,
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        write_mask: wgpu::ColorWrites::ALL,
    })];

    let depth_state = |write: bool, compare: wgpu::CompareFunction| wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    };

    // The solid fill always writes depth at the far plane; it is the
    // per-view depth reset as much as the border/backdrop color.
    let solid = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vista-solid-pipeline"),
        layout: Some(&solid_layout),
        vertex: wgpu::VertexState {
            module: &solid_shader,
            entry_point: "vs_main",
            buffers: &[solid_vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &solid_shader,
            entry_point: "fs_main",
            targets: &color_target,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: Some(depth_state(true, wgpu::CompareFunction::Always)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let textured = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vista-textured-pipeline"),
        layout: Some(&textured_layout),
        vertex: wgpu::VertexState {
            module: &textured_shader,
            entry_point: "vs_main",
            buffers: &[quad_vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &textured_shader,
            entry_point: "fs_main",
            targets: &color_target,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: Some(depth_state(false, wgpu::CompareFunction::Always)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let mesh = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vista-mesh-pipeline"),
        layout: Some(&view_layout),
        vertex: wgpu::VertexState {
            module: &mesh_shader,
            entry_point: "vs_main",
            buffers: &[mesh_vertex_layout, mesh_instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &mesh_shader,
            entry_point: "fs_main",
            targets: &color_target,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        // Flat handle geometry and arbitrary asset winding both need to stay
        // visible from either side.
        primitive: wgpu::PrimitiveState {
            cull_mode: None,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(depth_state(true, wgpu::CompareFunction::LessEqual)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let line = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vista-line-pipeline"),
        layout: Some(&view_layout),
        vertex: wgpu::VertexState {
            module: &flat_shader,
            entry_point: "vs_main",
            buffers: &[flat_vertex_layout.clone()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &flat_shader,
            entry_point: "fs_main",
            targets: &color_target,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let point = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vista-point-pipeline"),
        layout: Some(&view_layout),
        vertex: wgpu::VertexState {
            module: &flat_shader,
            entry_point: "vs_main",
            buffers: &[flat_vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &flat_shader,
            entry_point: "fs_main",
            targets: &color_target,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::PointList,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(depth_state(true, wgpu::CompareFunction::LessEqual)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    Pipelines {
        solid,
        textured,
        mesh,
        line,
        point,
    }
}
