//! Per-view cameras.
//!
//! Projection is a closed sum over the two kinds the compositor supports;
//! aspect updates and pick rays match exhaustively, so a new kind cannot be
//! half-wired without the compiler objecting.

use glam::{Mat4, Vec3};

use crate::pick::Ray;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Vertical half extent is the invariant; the horizontal extent follows
    /// the aspect ratio.
    Orthographic {
        half_height: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32) -> Self {
        Projection::Perspective {
            fov_y_degrees,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn orthographic(half_height: f32) -> Self {
        Projection::Orthographic {
            half_height,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn update_aspect(&mut self, new_aspect: f32) {
        let new_aspect = if new_aspect.is_finite() && new_aspect > 0.0 {
            new_aspect
        } else {
            1.0
        };
        match self {
            Projection::Perspective { aspect, .. } => *aspect = new_aspect,
            Projection::Orthographic { aspect, .. } => *aspect = new_aspect,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_degrees,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                half_height,
                aspect,
                near,
                far,
            } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    near,
                    far,
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Camera {
    pub fn new(eye: Vec3, target: Vec3, up: Vec3, projection: Projection) -> Self {
        Camera {
            eye,
            target,
            up,
            projection,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection.matrix() * self.view_matrix()
    }

    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.eye).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);
        (right, up, forward)
    }

    /// Builds a world-space ray through the given normalized device
    /// coordinate. Orthographic rays start on the camera plane and all share
    /// the forward direction; perspective rays fan out from the eye.
    pub fn pick_ray(&self, ndc_x: f32, ndc_y: f32) -> Ray {
        let (right, up, forward) = self.basis();
        match self.projection {
            Projection::Perspective {
                fov_y_degrees,
                aspect,
                ..
            } => {
                let half_v = (fov_y_degrees.to_radians() * 0.5).tan();
                let direction =
                    (forward + right * (ndc_x * half_v * aspect) + up * (ndc_y * half_v))
                        .normalize_or_zero();
                Ray {
                    origin: self.eye,
                    direction,
                }
            }
            Projection::Orthographic {
                half_height,
                aspect,
                ..
            } => {
                let origin =
                    self.eye + right * (ndc_x * half_height * aspect) + up * (ndc_y * half_height);
                Ray {
                    origin,
                    direction: forward,
                }
            }
        }
    }
}

#[cfg(test)]
mod camera_tests {
    use super::*;

    #[test]
    fn perspective_aspect_update_touches_aspect_only() {
        let mut projection = Projection::perspective(75.0);
        projection.update_aspect(1.6);
        match projection {
            Projection::Perspective {
                fov_y_degrees,
                aspect,
                ..
            } => {
                assert!((fov_y_degrees - 75.0).abs() < 1e-6);
                assert!((aspect - 1.6).abs() < 1e-6);
            }
            Projection::Orthographic { .. } => panic!("projection kind changed"),
        }
    }

    #[test]
    fn orthographic_keeps_vertical_extent_across_aspects() {
        let mut projection = Projection::orthographic(5.0);
        for aspect in [0.5_f32, 1.0, 1.77, 3.2] {
            projection.update_aspect(aspect);
            let matrix = projection.matrix();
            let top = matrix.project_point3(Vec3::new(0.0, 5.0, -1.0));
            assert!((top.y - 1.0).abs() < 1e-5, "aspect {aspect}");
            let edge = matrix.project_point3(Vec3::new(5.0 * aspect, 0.0, -1.0));
            assert!((edge.x - 1.0).abs() < 1e-5, "aspect {aspect}");
        }
    }

    #[test]
    fn degenerate_aspect_falls_back_to_square() {
        let mut projection = Projection::perspective(50.0);
        projection.update_aspect(f32::NAN);
        match projection {
            Projection::Perspective { aspect, .. } => assert!((aspect - 1.0).abs() < 1e-6),
            Projection::Orthographic { .. } => panic!("projection kind changed"),
        }
    }

    #[test]
    fn centered_perspective_ray_runs_through_the_target() {
        let camera = Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            Projection::perspective(75.0),
        );
        let ray = camera.pick_ray(0.0, 0.0);
        assert!((ray.origin - camera.eye).length() < 1e-6);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn orthographic_rays_stay_parallel() {
        let camera = Camera::new(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::ZERO,
            Vec3::NEG_Z,
            Projection::orthographic(5.0),
        );
        let center = camera.pick_ray(0.0, 0.0);
        let corner = camera.pick_ray(1.0, 1.0);
        assert!((center.direction - corner.direction).length() < 1e-5);
        assert!((corner.origin - center.origin).length() > 1.0);
    }
}
