//! Pointer and keyboard routing.
//!
//! Pointer events route to the topmost view under the cursor; only the
//! top-down view owns the handle, so everything else swallows clicks.
//! Positions arrive in winit's top-left pixel space and are flipped into
//! the bottom-left space the layout uses before hit testing.

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton},
    keyboard::Key,
};

use crate::handle::HandleEvent;
use crate::layout::VIEW_BORDER_PX;
use crate::pick::Ray;
use crate::views::ViewContent;

use super::ViewerState;

const FOV_STEP: f32 = 5.0;
const MIN_FOV: f32 = 20.0;
const MAX_FOV: f32 = 120.0;

pub(super) fn cursor_moved(state: &mut ViewerState, position: PhysicalPosition<f64>) {
    state.cursor = Some(position);
    if !state.handle.is_selected() {
        return;
    }
    let Some((ray, content)) = pick_ray_under(state, position) else {
        return;
    };
    if content != ViewContent::TopDown {
        return;
    }
    let events = state.handle.pointer_moved(&ray, state.collider.as_ref());
    dispatch(state, &events);
}

pub(super) fn mouse_input(state: &mut ViewerState, element_state: ElementState, button: MouseButton) {
    if button != MouseButton::Left {
        return;
    }
    match element_state {
        ElementState::Pressed => {
            let Some(position) = state.cursor else {
                return;
            };
            let Some((ray, content)) = pick_ray_under(state, position) else {
                return;
            };
            if content != ViewContent::TopDown {
                return;
            }
            let events = state.handle.pointer_pressed(&ray, state.collider.as_ref());
            dispatch(state, &events);
        }
        ElementState::Released => {
            // Releases end a drag no matter where the cursor wandered.
            let events = state.handle.pointer_released();
            dispatch(state, &events);
        }
    }
}

/// `[` and `]` step the reconstruction field of view. The new cloud arrives
/// asynchronously; stale generations from rapid presses are dropped by the
/// loader.
pub(super) fn handle_key_event(state: &mut ViewerState, event: &KeyEvent) {
    if event.state != ElementState::Pressed {
        return;
    }
    let step = match event.logical_key.as_ref() {
        Key::Character("[") => -FOV_STEP,
        Key::Character("]") => FOV_STEP,
        _ => return,
    };
    let next = (state.field_of_view + step).clamp(MIN_FOV, MAX_FOV);
    if (next - state.field_of_view).abs() < f32::EPSILON {
        return;
    }
    state.field_of_view = next;
    let generation = state.cloud_loader.request(
        state.depth_image.clone(),
        state.color_image.clone(),
        next,
    );
    log::info!("field of view {next:.0} degrees; queued reconstruction generation {generation}");
}

/// Resolves the topmost view under a cursor position and builds a pick ray
/// through it. Positions on a view's border resolve to NDC outside [-1, 1]
/// and produce no ray.
fn pick_ray_under(
    state: &ViewerState,
    position: PhysicalPosition<f64>,
) -> Option<(Ray, ViewContent)> {
    let x = position.x as f32;
    let y = state.size.height as f32 - position.y as f32;
    let view = state
        .views
        .view_under(state.config.width, state.config.height, x, y)?;
    let inner = view
        .rect
        .resolve(state.config.width, state.config.height)
        .inset(VIEW_BORDER_PX);
    let (ndc_x, ndc_y) = inner.to_ndc(x, y);
    if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) {
        return None;
    }
    Some((view.camera.pick_ray(ndc_x, ndc_y), view.content))
}

fn dispatch(state: &mut ViewerState, events: &[HandleEvent]) {
    for event in events {
        match *event {
            HandleEvent::SelectionChanged { selected } => {
                state.highlight.set_animating(selected);
                log::info!(
                    "handle {}",
                    if selected { "selected" } else { "deselected" }
                );
            }
            HandleEvent::PositionChanged { x, z } => {
                state.synchronizer.push(x, z, &mut state.highlight);
            }
        }
    }
}
