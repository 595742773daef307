//! Per-frame composite.
//!
//! One encoder, one render pass. The frame clears the whole canvas, then
//! walks the view stack in registration order: border fill under the outer
//! viewport, backdrop fill under the inner viewport, then the view's
//! content. The solid fills write far-plane depth, which resets the depth
//! left behind by views composited earlier, so overlay views never lose
//! fragments to the front view's geometry.

use std::ops::Range;
use std::time::Instant;

use bytemuck::cast_slice;
use glam::{Mat4, Vec3};
use wgpu::SurfaceError;

use super::init::{
    CLOUD_FALLBACK_COLOR, HANDLE_COLOR, HANDLE_SELECTED_COLOR, TURNTABLE_FALLBACK_COLOR,
};
use super::mesh::{self, MeshInstance, PointVertex, ViewUniforms};
use super::{PrimitiveSlot, ViewerState};
use crate::camera::Projection;
use crate::handle::Handle;
use crate::highlight::{self, HIGHLIGHT_EDGE_COLOR, HIGHLIGHT_EXTENT};
use crate::layout::{PixelRect, VIEW_BORDER_PX};
use crate::views::ViewContent;

const WINDOW_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Front view's orthographic half height at the default field of view.
const FRONT_BASE_HALF_HEIGHT: f32 = 5.0;
const ARROW_X_TINT: [f32; 4] = [1.0, 0.25, 0.25, 1.0];
const ARROW_Z_TINT: [f32; 4] = [0.3, 0.45, 1.0, 1.0];

/// Which static geometry a draw pulls from.
#[derive(Debug, Clone, Copy)]
enum Geometry {
    Disc,
    Ring,
    Arrow,
    HighlightBox,
    FallbackBox,
    FallbackSphere,
    Model,
}

/// Draws planned for one view this frame.
#[derive(Default)]
struct ViewPlan {
    mesh: Vec<(Geometry, Range<u32>)>,
    grid: bool,
    edges: bool,
    textured: bool,
    points: bool,
}

pub(super) fn render(state: &mut ViewerState) -> Result<(), SurfaceError> {
    let now = Instant::now();
    let dt = (now - state.last_frame).as_secs_f32().min(0.1);
    state.last_frame = now;
    state.elapsed_seconds += dt;

    state.turntable.advance();
    state.oscillation.advance();
    state.highlight.advance(dt);

    if let Some(source) = state.cloud_loader.poll() {
        upload_cloud(state, &source);
    }

    let rects = update_cameras(state);
    write_view_uniforms(state, &rects);
    let plans = plan_views(state);

    let frame = state.surface.get_current_texture()?;
    let frame_view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vista-frame-encoder"),
        });

    {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vista-composite-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(WINDOW_CLEAR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &state.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let canvas_height = state.config.height;
        for (index, plan) in plans.iter().enumerate() {
            let (outer, inner) = rects[index];

            apply_region(&mut rpass, outer, canvas_height);
            rpass.set_pipeline(&state.solid_pipeline);
            rpass.set_bind_group(0, &state.border_bind_group, &[]);
            rpass.set_vertex_buffer(0, state.quad_vertex_buffer.slice(..));
            rpass.set_index_buffer(
                state.quad_index_buffer.slice(..),
                wgpu::IndexFormat::Uint16,
            );
            rpass.draw_indexed(0..6, 0, 0..1);

            apply_region(&mut rpass, inner, canvas_height);
            rpass.set_bind_group(0, &state.backdrop_bind_group, &[]);
            rpass.draw_indexed(0..6, 0, 0..1);

            let slot = &state.view_slots[index];

            if plan.grid {
                rpass.set_pipeline(&state.line_pipeline);
                rpass.set_bind_group(0, &slot.bind_group, &[]);
                rpass.set_vertex_buffer(0, state.grid_vertex_buffer.slice(..));
                rpass.draw(0..state.grid_vertex_count, 0..1);
            }

            if !plan.mesh.is_empty() {
                rpass.set_pipeline(&state.mesh_pipeline);
                rpass.set_bind_group(0, &slot.bind_group, &[]);
                rpass.set_vertex_buffer(1, state.instance_buffer.slice(..));
                for (geometry, instances) in &plan.mesh {
                    let library = &state.primitives;
                    let (vertex_buffer, index_buffer, draw_slot) = match geometry {
                        Geometry::Model => (
                            &state.model.vertex_buffer,
                            &state.model.index_buffer,
                            PrimitiveSlot {
                                indices: 0..state.model.index_count,
                                base_vertex: 0,
                            },
                        ),
                        Geometry::Disc => library.buffers_for(&library.disc),
                        Geometry::Ring => library.buffers_for(&library.ring),
                        Geometry::Arrow => library.buffers_for(&library.arrow),
                        Geometry::HighlightBox => library.buffers_for(&library.highlight_box),
                        Geometry::FallbackBox => library.buffers_for(&library.fallback_box),
                        Geometry::FallbackSphere => library.buffers_for(&library.fallback_sphere),
                    };
                    rpass.set_vertex_buffer(0, vertex_buffer.slice(..));
                    rpass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(
                        draw_slot.indices.clone(),
                        draw_slot.base_vertex,
                        instances.clone(),
                    );
                }
            }

            if plan.edges {
                rpass.set_pipeline(&state.line_pipeline);
                rpass.set_bind_group(0, &slot.bind_group, &[]);
                rpass.set_vertex_buffer(0, state.edge_vertex_buffer.slice(..));
                rpass.draw(0..24, 0..1);
            }

            if plan.textured {
                rpass.set_pipeline(&state.textured_pipeline);
                rpass.set_bind_group(0, &state.depth_quad.bind_group, &[]);
                rpass.set_vertex_buffer(0, state.quad_vertex_buffer.slice(..));
                rpass.set_index_buffer(
                    state.quad_index_buffer.slice(..),
                    wgpu::IndexFormat::Uint16,
                );
                rpass.draw_indexed(0..6, 0, 0..1);
            }

            if plan.points {
                rpass.set_pipeline(&state.point_pipeline);
                rpass.set_bind_group(0, &slot.bind_group, &[]);
                rpass.set_vertex_buffer(0, state.cloud_points.vertex_buffer.slice(..));
                rpass.draw(0..state.cloud_points.count, 0..1);
            }
        }
    }

    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

/// Viewport and scissor share the same region; wgpu's origin is top-left,
/// the layout's is bottom-left.
fn apply_region(rpass: &mut wgpu::RenderPass<'_>, rect: PixelRect, canvas_height: u32) {
    let top = canvas_height.saturating_sub(rect.bottom + rect.height);
    rpass.set_viewport(
        rect.left as f32,
        top as f32,
        rect.width as f32,
        rect.height as f32,
        0.0,
        1.0,
    );
    rpass.set_scissor_rect(rect.left, top, rect.width, rect.height);
}

/// Resolves every view's rectangles from the live canvas size and refreshes
/// the projections: aspect from the inner rect, plus the front view's
/// field-of-view volume hook.
fn update_cameras(state: &mut ViewerState) -> Vec<(PixelRect, PixelRect)> {
    let (canvas_width, canvas_height) = (state.config.width, state.config.height);
    let field_of_view = state.field_of_view;
    let mut rects = Vec::with_capacity(state.views.len());
    for view in state.views.iter_mut() {
        let outer = view.rect.resolve(canvas_width, canvas_height);
        let inner = outer.inset(VIEW_BORDER_PX);
        if view.content == ViewContent::Front {
            if let Projection::Orthographic { half_height, .. } = &mut view.camera.projection {
                *half_height = FRONT_BASE_HALF_HEIGHT * field_of_view
                    / vista_formats::DEFAULT_FIELD_OF_VIEW;
            }
        }
        view.camera.projection.update_aspect(inner.aspect());
        rects.push((outer, inner));
    }
    rects
}

fn write_view_uniforms(state: &mut ViewerState, rects: &[(PixelRect, PixelRect)]) {
    for (index, view) in state.views.iter().enumerate() {
        let mut view_projection = view.camera.view_projection();
        if view.content == ViewContent::Cloud {
            view_projection *= Mat4::from_rotation_y(state.oscillation.angle());
        }
        let uniforms = ViewUniforms {
            view_projection: view_projection.to_cols_array_2d(),
        };
        state.queue.write_buffer(
            &state.view_slots[index].uniform_buffer,
            0,
            cast_slice(&[uniforms]),
        );

        // The undecoded placeholder just fills the view; only a real raster
        // gets letterboxed to its own aspect.
        if view.content == ViewContent::DepthImage && state.depth_quad.decoded {
            let (_, inner) = rects[index];
            let view_aspect = inner.aspect();
            let image_aspect = state.depth_quad.image_aspect;
            let scale_x = (image_aspect / view_aspect).min(1.0);
            let scale_y = (view_aspect / image_aspect).min(1.0);
            state.queue.write_buffer(
                &state.depth_quad.fit_buffer,
                0,
                cast_slice(&[scale_x, scale_y, 0.0, 0.0]),
            );
        }
    }
}

/// Fills the instance buffer and decides what each view draws this frame.
fn plan_views(state: &mut ViewerState) -> Vec<ViewPlan> {
    let mut instances: Vec<MeshInstance> = Vec::new();
    let mut plans = Vec::with_capacity(state.views.len());

    let mut push = |instances: &mut Vec<MeshInstance>, instance: MeshInstance| -> Range<u32> {
        let start = instances.len() as u32;
        instances.push(instance);
        start..instances.len() as u32
    };

    let handle_position = state.handle.position();
    let handle_selected = state.handle.is_selected();
    let pulse = if handle_selected {
        Handle::pulse_scale(state.elapsed_seconds)
    } else {
        1.0
    };

    let mut edge_update: Option<Vec<mesh::LineVertex>> = None;

    for view in state.views.iter() {
        let mut plan = ViewPlan::default();
        match view.content {
            ViewContent::Front => {
                let range = push(
                    &mut instances,
                    MeshInstance {
                        model: Mat4::IDENTITY.to_cols_array_2d(),
                        color: [1.0, 1.0, 1.0, 1.0],
                    },
                );
                plan.mesh.push((Geometry::Model, range));

                if state.highlight.is_visible() {
                    let distance = (view.camera.eye - state.highlight.position()).length();
                    let scale = highlight::scale_for_distance(distance);
                    let brightness = (0.6 + state.highlight.emissive()).min(1.6);
                    let range = push(
                        &mut instances,
                        MeshInstance {
                            model: mesh::instance_transform(
                                state.highlight.position(),
                                0.0,
                                Vec3::splat(scale),
                            ),
                            color: [brightness, brightness, brightness, state.highlight.opacity()],
                        },
                    );
                    plan.mesh.push((Geometry::HighlightBox, range));
                    // Slightly inflated so the wireframe clears the faces.
                    edge_update = Some(mesh::box_edge_lines(
                        state.highlight.position(),
                        HIGHLIGHT_EXTENT * scale * 1.01,
                        HIGHLIGHT_EDGE_COLOR,
                    ));
                    plan.edges = true;
                }
            }
            ViewContent::TopDown => {
                plan.grid = true;
                let range = push(
                    &mut instances,
                    MeshInstance {
                        model: Mat4::IDENTITY.to_cols_array_2d(),
                        color: [1.0, 1.0, 1.0, 1.0],
                    },
                );
                plan.mesh.push((Geometry::Model, range));

                let body_color = if handle_selected {
                    HANDLE_SELECTED_COLOR
                } else {
                    HANDLE_COLOR
                };
                let disc_model =
                    mesh::instance_transform(handle_position, 0.0, Vec3::splat(pulse));
                let range = push(
                    &mut instances,
                    MeshInstance {
                        model: disc_model,
                        color: [body_color[0], body_color[1], body_color[2], 1.0],
                    },
                );
                plan.mesh.push((Geometry::Disc, range));

                let ring_opacity = if handle_selected { 0.6 } else { 0.4 };
                let range = push(
                    &mut instances,
                    MeshInstance {
                        model: mesh::instance_transform(handle_position, 0.0, Vec3::ONE),
                        color: [body_color[0], body_color[1], body_color[2], ring_opacity],
                    },
                );
                plan.mesh.push((Geometry::Ring, range));

                if handle_selected {
                    let range = push(
                        &mut instances,
                        MeshInstance {
                            model: mesh::instance_transform(handle_position, 0.0, Vec3::ONE),
                            color: ARROW_X_TINT,
                        },
                    );
                    plan.mesh.push((Geometry::Arrow, range));
                    let range = push(
                        &mut instances,
                        MeshInstance {
                            model: mesh::instance_transform(
                                handle_position,
                                -std::f32::consts::FRAC_PI_2,
                                Vec3::ONE,
                            ),
                            color: ARROW_Z_TINT,
                        },
                    );
                    plan.mesh.push((Geometry::Arrow, range));
                }
            }
            ViewContent::DepthImage => {
                plan.textured = true;
            }
            ViewContent::Turntable => {
                if state.model.loaded {
                    let range = push(
                        &mut instances,
                        MeshInstance {
                            model: mesh::instance_transform(
                                Vec3::ZERO,
                                state.turntable.angle(),
                                Vec3::ONE,
                            ),
                            color: [1.0, 1.0, 1.0, 1.0],
                        },
                    );
                    plan.mesh.push((Geometry::Model, range));
                } else {
                    let range = push(
                        &mut instances,
                        MeshInstance {
                            model: mesh::instance_transform(
                                Vec3::ZERO,
                                state.turntable.angle(),
                                Vec3::ONE,
                            ),
                            color: [
                                TURNTABLE_FALLBACK_COLOR[0],
                                TURNTABLE_FALLBACK_COLOR[1],
                                TURNTABLE_FALLBACK_COLOR[2],
                                1.0,
                            ],
                        },
                    );
                    plan.mesh.push((Geometry::FallbackSphere, range));
                }
            }
            ViewContent::Cloud => {
                if state.cloud_points.count > 0 {
                    plan.points = true;
                } else {
                    // The sway already lives in this view's uniform, so the
                    // stand-in box takes an identity model matrix.
                    let range = push(
                        &mut instances,
                        MeshInstance {
                            model: Mat4::IDENTITY.to_cols_array_2d(),
                            color: [
                                CLOUD_FALLBACK_COLOR[0],
                                CLOUD_FALLBACK_COLOR[1],
                                CLOUD_FALLBACK_COLOR[2],
                                1.0,
                            ],
                        },
                    );
                    plan.mesh.push((Geometry::FallbackBox, range));
                }
            }
        }
        plans.push(plan);
    }

    ensure_instance_capacity(state, instances.len());
    if !instances.is_empty() {
        state
            .queue
            .write_buffer(&state.instance_buffer, 0, cast_slice(&instances));
    }
    if let Some(edges) = edge_update {
        state
            .queue
            .write_buffer(&state.edge_vertex_buffer, 0, cast_slice(&edges));
    }

    plans
}

fn ensure_instance_capacity(state: &mut ViewerState, needed: usize) {
    if needed <= state.instance_capacity {
        return;
    }
    let new_capacity = needed.next_power_of_two();
    state.instance_buffer = state.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("vista-mesh-instances"),
        size: (new_capacity * std::mem::size_of::<MeshInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    state.instance_capacity = new_capacity;
}

/// Uploads a freshly reconstructed cloud, growing the vertex buffer by
/// powers of two when the point count outgrows it.
fn upload_cloud(state: &mut ViewerState, source: &vista_formats::CloudSource) {
    let cloud = source.cloud();
    let vertices: Vec<PointVertex> = cloud
        .positions
        .iter()
        .zip(cloud.colors.iter())
        .map(|(position, color)| PointVertex {
            position: *position,
            color: *color,
        })
        .collect();

    if vertices.len() > state.cloud_points.capacity {
        let new_capacity = vertices.len().next_power_of_two();
        state.cloud_points.vertex_buffer = state.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vista-cloud-points"),
            size: (new_capacity * std::mem::size_of::<PointVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        state.cloud_points.capacity = new_capacity;
    }
    if !vertices.is_empty() {
        state.queue.write_buffer(
            &state.cloud_points.vertex_buffer,
            0,
            cast_slice(&vertices),
        );
    }
    state.cloud_points.count = vertices.len() as u32;
    let (width, height) = source.dimensions();
    log::info!(
        "applied reconstructed cloud: {} points from {}x{} at fov {:.1}",
        vertices.len(),
        width,
        height,
        source.field_of_view()
    );
}
