//! Vertex layouts and procedural geometry for the render pipelines.
//!
//! Every solid drawn by the mesh pipeline is a `Primitive`: interleaved
//! position/normal/color vertices plus u32 indices. Instances carry a model
//! matrix and a tint multiplied against the vertex color, so one pipeline
//! serves the model, the handle visuals, and the highlight volume alike.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use vista_formats::MeshAsset;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view_projection: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Primitive {
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

pub fn instance_transform(translation: Vec3, rotation_y: f32, scale: Vec3) -> [[f32; 4]; 4] {
    Mat4::from_scale_rotation_translation(scale, Quat::from_rotation_y(rotation_y), translation)
        .to_cols_array_2d()
}

/// Axis-aligned box centered on the origin, six faces with flat normals.
pub fn build_box(extent: Vec3, color: [f32; 3]) -> Primitive {
    let half = extent * 0.5;
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];
    let mut primitive = Primitive::default();
    for (normal, tangent, bitangent) in faces {
        let base = primitive.vertices.len() as u32;
        let center = normal * half;
        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = center + tangent * half * u + bitangent * half * v;
            primitive.vertices.push(MeshVertex {
                position: position.to_array(),
                normal: normal.to_array(),
                color,
            });
        }
        primitive
            .indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    primitive
}

/// Latitude/longitude sphere.
pub fn build_sphere(radius: f32, rings: u32, segments: u32, color: [f32; 3]) -> Primitive {
    let mut primitive = Primitive::default();
    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            let normal = Vec3::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            );
            primitive.vertices.push(MeshVertex {
                position: (normal * radius).to_array(),
                normal: normal.to_array(),
                color,
            });
        }
    }
    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            primitive.indices.extend_from_slice(&[a, b, a + 1]);
            primitive.indices.extend_from_slice(&[a + 1, b, b + 1]);
        }
    }
    primitive
}

/// Flat disc in the XZ plane, facing up.
pub fn build_disc(radius: f32, segments: u32, color: [f32; 3]) -> Primitive {
    let mut primitive = Primitive::default();
    primitive.vertices.push(MeshVertex {
        position: [0.0; 3],
        normal: Vec3::Y.to_array(),
        color,
    });
    for segment in 0..=segments {
        let theta = TAU * segment as f32 / segments as f32;
        primitive.vertices.push(MeshVertex {
            position: [radius * theta.cos(), 0.0, radius * theta.sin()],
            normal: Vec3::Y.to_array(),
            color,
        });
    }
    for segment in 1..=segments {
        primitive.indices.extend_from_slice(&[0, segment + 1, segment]);
    }
    primitive
}

/// Flat annulus in the XZ plane, facing up.
pub fn build_ring(inner: f32, outer: f32, segments: u32, color: [f32; 3]) -> Primitive {
    let mut primitive = Primitive::default();
    for segment in 0..=segments {
        let theta = TAU * segment as f32 / segments as f32;
        let direction = Vec3::new(theta.cos(), 0.0, theta.sin());
        for radius in [inner, outer] {
            primitive.vertices.push(MeshVertex {
                position: (direction * radius).to_array(),
                normal: Vec3::Y.to_array(),
                color,
            });
        }
    }
    for segment in 0..segments {
        let a = segment * 2;
        primitive
            .indices
            .extend_from_slice(&[a, a + 2, a + 1, a + 1, a + 2, a + 3]);
    }
    primitive
}

/// Drag arrow along +X: a thin shaft ending in a four-sided tip. Reoriented
/// per instance for the Z axis.
pub fn build_arrow(length: f32, color: [f32; 3]) -> Primitive {
    let shaft_length = length * 0.7;
    let shaft = build_box(Vec3::new(shaft_length, 0.05, 0.05), color);
    let mut primitive = Primitive::default();
    for vertex in &shaft.vertices {
        let mut shifted = *vertex;
        shifted.position[0] += shaft_length * 0.5;
        primitive.vertices.push(shifted);
    }
    primitive.indices.extend_from_slice(&shaft.indices);

    // Pyramid tip.
    let tip_base = shaft_length;
    let tip_half = 0.12;
    let base_index = primitive.vertices.len() as u32;
    let apex = Vec3::new(length, 0.0, 0.0);
    let corners = [
        Vec3::new(tip_base, -tip_half, -tip_half),
        Vec3::new(tip_base, tip_half, -tip_half),
        Vec3::new(tip_base, tip_half, tip_half),
        Vec3::new(tip_base, -tip_half, tip_half),
    ];
    for corner in corners {
        primitive.vertices.push(MeshVertex {
            position: corner.to_array(),
            normal: Vec3::X.to_array(),
            color,
        });
    }
    primitive.vertices.push(MeshVertex {
        position: apex.to_array(),
        normal: Vec3::X.to_array(),
        color,
    });
    let apex_index = base_index + 4;
    for side in 0..4 {
        let a = base_index + side;
        let b = base_index + (side + 1) % 4;
        primitive.indices.extend_from_slice(&[a, b, apex_index]);
    }
    primitive
        .indices
        .extend_from_slice(&[base_index, base_index + 2, base_index + 1]);
    primitive
        .indices
        .extend_from_slice(&[base_index, base_index + 3, base_index + 2]);
    primitive
}

/// Converts a loaded mesh asset, deriving smooth normals by area-weighted
/// accumulation. Vertices without exported colors render white and pick up
/// the instance tint.
pub fn from_asset(asset: &MeshAsset) -> Primitive {
    let mut normals = vec![Vec3::ZERO; asset.positions.len()];
    for triangle in asset.indices.chunks_exact(3) {
        let a = Vec3::from(asset.positions[triangle[0] as usize]);
        let b = Vec3::from(asset.positions[triangle[1] as usize]);
        let c = Vec3::from(asset.positions[triangle[2] as usize]);
        let face_normal = (b - a).cross(c - a);
        for &index in triangle {
            normals[index as usize] += face_normal;
        }
    }
    let vertices = asset
        .positions
        .iter()
        .enumerate()
        .map(|(index, position)| MeshVertex {
            position: *position,
            normal: normals[index].normalize_or_zero().to_array(),
            color: asset.colors.get(index).copied().unwrap_or([1.0, 1.0, 1.0]),
        })
        .collect();
    Primitive {
        vertices,
        indices: asset.indices.clone(),
    }
}

/// Square reference grid on the ground plane, as a line list.
pub fn grid_lines(half_extent: f32, divisions: u32, color: [f32; 3]) -> Vec<LineVertex> {
    let mut lines = Vec::new();
    for division in 0..=divisions {
        let offset = -half_extent + 2.0 * half_extent * division as f32 / divisions as f32;
        for (start, end) in [
            (
                Vec3::new(offset, 0.0, -half_extent),
                Vec3::new(offset, 0.0, half_extent),
            ),
            (
                Vec3::new(-half_extent, 0.0, offset),
                Vec3::new(half_extent, 0.0, offset),
            ),
        ] {
            lines.push(LineVertex {
                position: start.to_array(),
                color,
            });
            lines.push(LineVertex {
                position: end.to_array(),
                color,
            });
        }
    }
    lines
}

/// The twelve edges of a box, already placed in world space. Rebuilt per
/// frame for the highlight volume since it moves and scales.
pub fn box_edge_lines(center: Vec3, extent: Vec3, color: [f32; 3]) -> Vec<LineVertex> {
    let half = extent * 0.5;
    let corner = |x: f32, y: f32, z: f32| center + Vec3::new(x, y, z) * half;
    let corners = [
        corner(-1.0, -1.0, -1.0),
        corner(1.0, -1.0, -1.0),
        corner(1.0, -1.0, 1.0),
        corner(-1.0, -1.0, 1.0),
        corner(-1.0, 1.0, -1.0),
        corner(1.0, 1.0, -1.0),
        corner(1.0, 1.0, 1.0),
        corner(-1.0, 1.0, 1.0),
    ];
    const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];
    EDGES
        .iter()
        .flat_map(|&(start, end)| {
            [
                LineVertex {
                    position: corners[start].to_array(),
                    color,
                },
                LineVertex {
                    position: corners[end].to_array(),
                    color,
                },
            ]
        })
        .collect()
}

#[cfg(test)]
mod mesh_tests {
    use super::*;

    #[test]
    fn box_has_six_independent_faces() {
        let primitive = build_box(Vec3::new(1.0, 2.5, 1.0), [0.0, 1.0, 0.0]);
        assert_eq!(primitive.vertices.len(), 24);
        assert_eq!(primitive.indices.len(), 36);
        let max_y = primitive
            .vertices
            .iter()
            .map(|vertex| vertex.position[1])
            .fold(f32::MIN, f32::max);
        assert!((max_y - 1.25).abs() < 1e-6);
    }

    #[test]
    fn sphere_normals_are_unit_length() {
        let primitive = build_sphere(2.0, 8, 12, [1.0; 3]);
        for vertex in &primitive.vertices {
            let length = Vec3::from(vertex.normal).length();
            assert!((length - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn ring_triangles_stay_within_the_annulus() {
        let primitive = build_ring(0.36, 0.45, 16, [0.0, 1.0, 1.0]);
        for vertex in &primitive.vertices {
            let radial = Vec3::from(vertex.position).length();
            assert!(radial >= 0.36 - 1e-5 && radial <= 0.45 + 1e-5);
        }
        assert_eq!(primitive.indices.len() as u32, 16 * 6);
    }

    #[test]
    fn asset_conversion_accumulates_normals() {
        let asset = MeshAsset {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            colors: Vec::new(),
            indices: vec![0, 2, 1],
        };
        let primitive = from_asset(&asset);
        for vertex in &primitive.vertices {
            assert!((Vec3::from(vertex.normal) - Vec3::Y).length() < 1e-5);
            assert_eq!(vertex.color, [1.0, 1.0, 1.0]);
        }
    }

    #[test]
    fn grid_emits_two_points_per_line() {
        let lines = grid_lines(10.0, 20, [0.3; 3]);
        assert_eq!(lines.len(), (21 * 2) * 2);
    }

    #[test]
    fn box_edges_cover_all_twelve() {
        let lines = box_edge_lines(Vec3::new(1.0, 0.3, -2.0), Vec3::ONE, [0.0, 0.5, 1.0]);
        assert_eq!(lines.len(), 24);
        for vertex in &lines {
            assert!((vertex.position[0] - 1.0).abs() <= 0.5 + 1e-6);
        }
    }
}
