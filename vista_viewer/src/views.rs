//! The ordered view registry.
//!
//! Views are registered explicitly on a stack owned by the viewer state and
//! composited in registration order, so overlays registered later draw on
//! top of the main view and also win pointer routing.

use glam::Vec3;

use crate::camera::{Camera, Projection};
use crate::layout::ViewRect;

/// What a view draws. The renderer switches on this; adding a kind without
/// wiring its draw path fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewContent {
    /// Normalized model plus the highlight volume, seen from the front.
    Front,
    /// Normalized model, grid, and the pick handle, seen from above.
    TopDown,
    /// The raw depth raster on a static quad.
    DepthImage,
    /// Normalized model on a spinning turntable.
    Turntable,
    /// The reconstructed point cloud, swaying.
    Cloud,
}

#[derive(Debug, Clone)]
pub struct View {
    pub name: &'static str,
    pub rect: ViewRect,
    pub camera: Camera,
    pub content: ViewContent,
}

#[derive(Debug, Clone, Default)]
pub struct ViewStack {
    views: Vec<View>,
}

impl ViewStack {
    pub fn register(&mut self, view: View) {
        self.views.push(view);
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.views.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Topmost view under a canvas position, in bottom-left pixel space.
    /// Later registrations win, matching composite order.
    pub fn view_under(
        &self,
        canvas_width: u32,
        canvas_height: u32,
        x: f32,
        y: f32,
    ) -> Option<&View> {
        self.views
            .iter()
            .rev()
            .find(|view| view.rect.resolve(canvas_width, canvas_height).contains(x, y))
    }
}

/// The stock five-view arrangement: a front view across the left, the
/// top-down view and depth raster stacked on the right, and two small
/// overlay views floating over the front view.
pub fn stock_views() -> ViewStack {
    let mut stack = ViewStack::default();
    stack.register(View {
        name: "front",
        rect: ViewRect::new(0.0, 0.0, 0.6, 1.0),
        camera: Camera::new(
            Vec3::new(0.0, 2.0, 10.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::Y,
            Projection::orthographic(5.0),
        ),
        content: ViewContent::Front,
    });
    stack.register(View {
        name: "top_down",
        rect: ViewRect::new(0.6, 0.35, 0.4, 0.65),
        camera: Camera::new(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::ZERO,
            Vec3::NEG_Z,
            Projection::orthographic(5.0),
        ),
        content: ViewContent::TopDown,
    });
    stack.register(View {
        name: "depth_image",
        rect: ViewRect::new(0.6, 0.0, 0.4, 0.35),
        camera: Camera::new(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::ZERO,
            Vec3::Y,
            Projection::perspective(50.0),
        ),
        content: ViewContent::DepthImage,
    });
    stack.register(View {
        name: "turntable",
        rect: ViewRect::new(0.37, 0.05, 0.18, 0.28),
        camera: Camera::new(
            Vec3::new(0.0, 5.0, 12.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::Y,
            Projection::perspective(75.0),
        ),
        content: ViewContent::Turntable,
    });
    stack.register(View {
        name: "cloud",
        rect: ViewRect::new(0.05, 0.05, 0.18, 0.28),
        camera: Camera::new(
            Vec3::new(0.0, 20.0, 60.0),
            Vec3::new(0.0, 0.0, -40.0),
            Vec3::Y,
            Projection::perspective(75.0),
        ),
        content: ViewContent::Cloud,
    });
    stack
}

#[cfg(test)]
mod views_tests {
    use super::*;

    #[test]
    fn stock_arrangement_registers_five_views() {
        let stack = stock_views();
        assert_eq!(stack.len(), 5);
        let names: Vec<&str> = stack.iter().map(|view| view.name).collect();
        assert_eq!(
            names,
            vec!["front", "top_down", "depth_image", "turntable", "cloud"]
        );
    }

    #[test]
    fn overlay_views_win_pointer_routing() {
        let stack = stock_views();
        // Inside both the front view and the cloud overlay.
        let view = stack.view_under(1000, 1000, 100.0, 100.0).expect("hit");
        assert_eq!(view.content, ViewContent::Cloud);
        // Front view away from any overlay.
        let view = stack.view_under(1000, 1000, 100.0, 800.0).expect("hit");
        assert_eq!(view.content, ViewContent::Front);
    }

    #[test]
    fn pointer_outside_every_view_routes_nowhere() {
        let mut stack = ViewStack::default();
        stack.register(View {
            name: "only",
            rect: ViewRect::new(0.0, 0.0, 0.5, 0.5),
            camera: Camera::new(
                Vec3::new(0.0, 0.0, 5.0),
                Vec3::ZERO,
                Vec3::Y,
                Projection::perspective(75.0),
            ),
            content: ViewContent::Front,
        });
        assert!(stack.view_under(100, 100, 80.0, 80.0).is_none());
    }
}
