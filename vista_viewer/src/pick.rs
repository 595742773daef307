//! Ray intersection helpers for pointer picking.

use glam::Vec3;

/// Direction-y components flatter than this cannot hit a horizontal plane at
/// a usable distance.
const MIN_PLANE_APPROACH: f32 = 0.001;

const TRIANGLE_EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Slab test against an axis-aligned box. Returns the entry distance, or
/// `None` when the ray misses or the box lies behind the origin.
pub fn ray_aabb(ray: &Ray, min: Vec3, max: Vec3) -> Option<f32> {
    let inv = ray.direction.recip();
    let t0 = (min - ray.origin) * inv;
    let t1 = (max - ray.origin) * inv;
    let t_min = t0.min(t1);
    let t_max = t0.max(t1);
    let t_near = t_min.x.max(t_min.y).max(t_min.z);
    let t_far = t_max.x.min(t_max.y).min(t_max.z);
    if t_near > t_far || t_far < 0.0 {
        return None;
    }
    Some(if t_near >= 0.0 { t_near } else { t_far })
}

/// Moller-Trumbore ray/triangle intersection, both winding orders.
pub fn ray_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge_ab = b - a;
    let edge_ac = c - a;
    let p = ray.direction.cross(edge_ac);
    let det = edge_ab.dot(p);
    if det.abs() < TRIANGLE_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let to_origin = ray.origin - a;
    let u = to_origin.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = to_origin.cross(edge_ab);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge_ac.dot(q) * inv_det;
    (t > TRIANGLE_EPSILON).then_some(t)
}

/// Intersection with the horizontal plane `y = plane_y`. Rays grazing the
/// plane or pointing away return `None`.
pub fn ray_horizontal_plane(ray: &Ray, plane_y: f32) -> Option<Vec3> {
    if ray.direction.y.abs() < MIN_PLANE_APPROACH {
        return None;
    }
    let t = (plane_y - ray.origin.y) / ray.direction.y;
    (t > 0.0).then(|| ray.point_at(t))
}

/// Owned triangle soup kept around for pointer picking, independent of the
/// GPU copy of the same mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshCollider {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshCollider {
    pub fn hit(&self, ray: &Ray) -> Option<Vec3> {
        ray_mesh(ray, &self.positions, &self.indices)
    }
}

/// Closest triangle hit across an indexed mesh, if any.
pub fn ray_mesh(ray: &Ray, positions: &[[f32; 3]], indices: &[u32]) -> Option<Vec3> {
    let mut best: Option<f32> = None;
    for triangle in indices.chunks_exact(3) {
        let a = Vec3::from(positions[triangle[0] as usize]);
        let b = Vec3::from(positions[triangle[1] as usize]);
        let c = Vec3::from(positions[triangle[2] as usize]);
        if let Some(t) = ray_triangle(ray, a, b, c) {
            best = Some(best.map_or(t, |prev: f32| prev.min(t)));
        }
    }
    best.map(|t| ray.point_at(t))
}

#[cfg(test)]
mod pick_tests {
    use super::*;

    fn down_ray(x: f32, z: f32) -> Ray {
        Ray {
            origin: Vec3::new(x, 10.0, z),
            direction: Vec3::NEG_Y,
        }
    }

    #[test]
    fn aabb_entry_distance_is_reported() {
        let ray = down_ray(0.0, 0.0);
        let t = ray_aabb(&ray, Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        assert!((t.expect("hit") - 8.0).abs() < 1e-6);
    }

    #[test]
    fn aabb_miss_and_behind_are_rejected() {
        let ray = down_ray(5.0, 0.0);
        assert!(ray_aabb(&ray, Vec3::new(-1.0, 0.0, -1.0), Vec3::ONE).is_none());
        let behind = Ray {
            origin: Vec3::new(0.0, -5.0, 0.0),
            direction: Vec3::NEG_Y,
        };
        assert!(ray_aabb(&behind, Vec3::new(-1.0, 0.0, -1.0), Vec3::ONE).is_none());
    }

    #[test]
    fn ray_starting_inside_the_box_still_hits() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        };
        let t = ray_aabb(&ray, Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!((t.expect("hit") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn triangle_hit_lands_inside_barycentric_bounds() {
        let ray = down_ray(0.2, 0.2);
        let t = ray_triangle(
            &ray,
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.5),
        );
        assert!((t.expect("hit") - 10.0).abs() < 1e-5);
        assert!(
            ray_triangle(
                &down_ray(5.0, 5.0),
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(0.0, 0.0, 1.5),
            )
            .is_none()
        );
    }

    #[test]
    fn grazing_rays_never_hit_the_plane() {
        let ray = Ray {
            origin: Vec3::new(0.0, 5.0, 0.0),
            direction: Vec3::X,
        };
        assert!(ray_horizontal_plane(&ray, 0.0).is_none());
    }

    #[test]
    fn plane_hit_preserves_lateral_position() {
        let hit = ray_horizontal_plane(&down_ray(2.5, -1.0), 0.0).expect("hit");
        assert!((hit.x - 2.5).abs() < 1e-6);
        assert!((hit.z - (-1.0)).abs() < 1e-6);
        assert!(hit.y.abs() < 1e-6);
    }

    #[test]
    fn mesh_query_returns_the_closest_triangle() {
        let positions = [
            [-1.0, 0.0, -1.0],
            [1.0, 0.0, -1.0],
            [0.0, 0.0, 1.0],
            [-1.0, 3.0, -1.0],
            [1.0, 3.0, -1.0],
            [0.0, 3.0, 1.0],
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let hit = ray_mesh(&down_ray(0.0, 0.0), &positions, &indices).expect("hit");
        assert!((hit.y - 3.0).abs() < 1e-5);
    }
}
