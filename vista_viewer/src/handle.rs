//! The pick/drag handle shown in the top-down view.
//!
//! Selection is click-to-toggle: a press on the handle flips it, a press on
//! empty space while selected releases it, and a press on empty space while
//! idle does nothing at all. While selected the handle follows the pointer
//! across the model surface, or along a single axis when a drag started on
//! one of the axis arrows. Every method returns the events it produced as
//! plain values; callers dispatch them synchronously, at most once per
//! pointer event.

use glam::Vec3;

use crate::pick::{MeshCollider, Ray, ray_horizontal_plane};

/// Height the handle floats above the ground plane.
pub const HANDLE_LIFT_Y: f32 = 0.1;
pub const HANDLE_DISC_RADIUS: f32 = 0.3;
pub const HANDLE_RING_INNER: f32 = 0.36;
pub const HANDLE_RING_OUTER: f32 = 0.45;

/// Axis arrows reach this far out from the handle center.
pub const ARROW_LENGTH: f32 = 1.2;
const ARROW_PICK_HALF_WIDTH: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Idle,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragAxis {
    X,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandleEvent {
    SelectionChanged { selected: bool },
    PositionChanged { x: f32, z: f32 },
}

#[derive(Debug, Clone)]
pub struct Handle {
    x: f32,
    z: f32,
    state: HandleState,
    drag: Option<DragAxis>,
}

impl Handle {
    pub fn new(x: f32, z: f32) -> Self {
        Handle {
            x,
            z,
            state: HandleState::Idle,
            drag: None,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, HANDLE_LIFT_Y, self.z)
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_selected(&self) -> bool {
        self.state == HandleState::Selected
    }

    pub fn drag_axis(&self) -> Option<DragAxis> {
        self.drag
    }

    /// Pulse factor for the selected visual, 10 percent size swing.
    pub fn pulse_scale(time_seconds: f32) -> f32 {
        1.0 + (time_seconds * 5.0).sin() * 0.1
    }

    /// Radial test against the disc and the concentric ring, both lying in
    /// the plane at the lift height. The gap between them is not pickable.
    fn hit_body(&self, ray: &Ray) -> bool {
        let Some(hit) = ray_horizontal_plane(ray, HANDLE_LIFT_Y) else {
            return false;
        };
        let radial = Vec3::new(hit.x - self.x, 0.0, hit.z - self.z).length();
        radial <= HANDLE_DISC_RADIUS
            || (HANDLE_RING_INNER..=HANDLE_RING_OUTER).contains(&radial)
    }

    fn hit_arrow(&self, ray: &Ray) -> Option<DragAxis> {
        let hit = ray_horizontal_plane(ray, HANDLE_LIFT_Y)?;
        let dx = hit.x - self.x;
        let dz = hit.z - self.z;
        if dx > HANDLE_RING_OUTER && dx <= ARROW_LENGTH && dz.abs() <= ARROW_PICK_HALF_WIDTH {
            return Some(DragAxis::X);
        }
        if dz > HANDLE_RING_OUTER && dz <= ARROW_LENGTH && dx.abs() <= ARROW_PICK_HALF_WIDTH {
            return Some(DragAxis::Z);
        }
        None
    }

    /// Model surface first, ground plane second.
    fn surface_point(ray: &Ray, mesh: Option<&MeshCollider>) -> Option<Vec3> {
        mesh.and_then(|collider| collider.hit(ray))
            .or_else(|| ray_horizontal_plane(ray, 0.0))
    }

    pub fn pointer_pressed(&mut self, ray: &Ray, _mesh: Option<&MeshCollider>) -> Vec<HandleEvent> {
        if self.state == HandleState::Selected {
            if let Some(axis) = self.hit_arrow(ray) {
                self.drag = Some(axis);
                return Vec::new();
            }
        }
        if self.hit_body(ray) {
            let selected = self.state == HandleState::Idle;
            self.state = if selected {
                HandleState::Selected
            } else {
                HandleState::Idle
            };
            self.drag = None;
            return vec![HandleEvent::SelectionChanged { selected }];
        }
        match self.state {
            HandleState::Selected => {
                self.state = HandleState::Idle;
                self.drag = None;
                vec![HandleEvent::SelectionChanged { selected: false }]
            }
            HandleState::Idle => Vec::new(),
        }
    }

    pub fn pointer_moved(&mut self, ray: &Ray, mesh: Option<&MeshCollider>) -> Vec<HandleEvent> {
        if self.state != HandleState::Selected {
            return Vec::new();
        }
        if let Some(axis) = self.drag {
            let Some(hit) = ray_horizontal_plane(ray, HANDLE_LIFT_Y) else {
                return Vec::new();
            };
            match axis {
                DragAxis::X => self.x = hit.x,
                DragAxis::Z => self.z = hit.z,
            }
            return vec![HandleEvent::PositionChanged {
                x: self.x,
                z: self.z,
            }];
        }
        let Some(hit) = Self::surface_point(ray, mesh) else {
            return Vec::new();
        };
        self.x = hit.x;
        self.z = hit.z;
        vec![HandleEvent::PositionChanged {
            x: self.x,
            z: self.z,
        }]
    }

    pub fn pointer_released(&mut self) -> Vec<HandleEvent> {
        if self.drag.take().is_some() {
            return vec![HandleEvent::PositionChanged {
                x: self.x,
                z: self.z,
            }];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod handle_tests {
    use super::*;

    fn down_ray(x: f32, z: f32) -> Ray {
        Ray {
            origin: Vec3::new(x, 10.0, z),
            direction: Vec3::NEG_Y,
        }
    }

    fn selection_events(events: &[HandleEvent]) -> Vec<bool> {
        events
            .iter()
            .filter_map(|event| match event {
                HandleEvent::SelectionChanged { selected } => Some(*selected),
                HandleEvent::PositionChanged { .. } => None,
            })
            .collect()
    }

    #[test]
    fn click_on_handle_toggles_selection_once_each_way() {
        let mut handle = Handle::new(0.0, 0.0);
        let events = handle.pointer_pressed(&down_ray(0.0, 0.0), None);
        assert_eq!(selection_events(&events), vec![true]);
        assert!(handle.is_selected());
        let events = handle.pointer_pressed(&down_ray(0.1, 0.0), None);
        assert_eq!(selection_events(&events), vec![false]);
        assert!(!handle.is_selected());
    }

    #[test]
    fn click_away_while_idle_is_silent() {
        let mut handle = Handle::new(0.0, 0.0);
        let events = handle.pointer_pressed(&down_ray(5.0, 5.0), None);
        assert!(events.is_empty());
        assert!(!handle.is_selected());
    }

    #[test]
    fn click_away_while_selected_deselects_once() {
        let mut handle = Handle::new(0.0, 0.0);
        handle.pointer_pressed(&down_ray(0.0, 0.0), None);
        let events = handle.pointer_pressed(&down_ray(5.0, 5.0), None);
        assert_eq!(selection_events(&events), vec![false]);
    }

    #[test]
    fn ring_is_pickable_but_the_gap_is_not() {
        let mut handle = Handle::new(0.0, 0.0);
        let events = handle.pointer_pressed(&down_ray(0.33, 0.0), None);
        assert!(events.is_empty(), "gap between disc and ring selected");
        let events = handle.pointer_pressed(&down_ray(0.40, 0.0), None);
        assert_eq!(selection_events(&events), vec![true]);
    }

    #[test]
    fn moves_while_idle_produce_no_events() {
        let mut handle = Handle::new(0.0, 0.0);
        assert!(handle.pointer_moved(&down_ray(1.0, 1.0), None).is_empty());
    }

    #[test]
    fn selected_handle_follows_the_ground_plane() {
        let mut handle = Handle::new(0.0, 0.0);
        handle.pointer_pressed(&down_ray(0.0, 0.0), None);
        let events = handle.pointer_moved(&down_ray(2.5, -1.0), None);
        assert_eq!(events, vec![HandleEvent::PositionChanged { x: 2.5, z: -1.0 }]);
        assert!((handle.position().y - HANDLE_LIFT_Y).abs() < 1e-6);
    }

    #[test]
    fn model_surface_wins_over_the_ground_plane() {
        let mesh = MeshCollider {
            positions: vec![[1.0, 2.0, -10.0], [1.0, 2.0, 10.0], [10.0, 2.0, 0.0]],
            indices: vec![0, 1, 2],
        };
        let mut handle = Handle::new(0.0, 0.0);
        handle.pointer_pressed(&down_ray(0.0, 0.0), None);
        let events = handle.pointer_moved(&down_ray(3.0, 0.0), Some(&mesh));
        assert_eq!(events.len(), 1);
        assert!((handle.position().x - 3.0).abs() < 1e-5);
        // Height stays fixed even when the surface hit was above the plane.
        assert!((handle.position().y - HANDLE_LIFT_Y).abs() < 1e-6);
    }

    #[test]
    fn arrow_drag_constrains_to_one_axis() {
        let mut handle = Handle::new(0.0, 0.0);
        handle.pointer_pressed(&down_ray(0.0, 0.0), None);
        let events = handle.pointer_pressed(&down_ray(0.8, 0.0), None);
        assert!(events.is_empty(), "arrow press must not change selection");
        assert_eq!(handle.drag_axis(), Some(DragAxis::X));
        handle.pointer_moved(&down_ray(2.0, 3.0), None);
        assert!((handle.position().x - 2.0).abs() < 1e-5);
        assert!(handle.position().z.abs() < 1e-5, "z must stay put");
        let events = handle.pointer_released();
        assert_eq!(events, vec![HandleEvent::PositionChanged { x: 2.0, z: 0.0 }]);
        assert_eq!(handle.drag_axis(), None);
        assert!(handle.is_selected());
    }

    #[test]
    fn release_without_a_drag_is_silent() {
        let mut handle = Handle::new(0.0, 0.0);
        assert!(handle.pointer_released().is_empty());
    }
}
