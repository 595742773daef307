//! The highlight volume marking the synchronized position in the front view.
//!
//! A tall box with wireframe edges. It pulses with a fast rise and a slow
//! fade and counter-scales with camera distance so it stays legible from far
//! away without swallowing the near view.

use std::f32::consts::PI;

use glam::Vec3;

pub const HIGHLIGHT_EXTENT: Vec3 = Vec3::new(1.0, 2.5, 1.0);
pub const HIGHLIGHT_COLOR: [f32; 3] = [0.0, 1.0, 0.0];
pub const HIGHLIGHT_EDGE_COLOR: [f32; 3] = [0.0, 0.53, 1.0];

/// Pulse phase advance in radians per second. Matches a full cycle roughly
/// every 0.8 seconds.
pub const PULSE_RATE: f32 = 8.0;

/// Share of the pulse cycle spent rising to full intensity.
const PULSE_RISE_FRACTION: f32 = 0.1;

/// Camera distance at which the volume renders at unit scale.
pub const BASE_SCALE_DISTANCE: f32 = 10.0;
pub const MIN_SCALE: f32 = 0.3;
pub const MAX_SCALE: f32 = 2.0;

const RESTING_OPACITY: f32 = 0.8;

/// Intensity over one pulse cycle: a quick climb over the first fifth of a
/// half-turn, then a long decay across the rest of the cycle.
pub fn pulse_intensity(phase: f32) -> f32 {
    let cycle = phase.rem_euclid(2.0 * PI);
    let rise_end = 2.0 * PI * PULSE_RISE_FRACTION;
    if cycle < rise_end {
        cycle / rise_end
    } else {
        1.0 - (cycle - rise_end) / (2.0 * PI - rise_end)
    }
}

/// Counter-scale against camera distance, clamped so the volume never
/// vanishes or dominates.
pub fn scale_for_distance(camera_distance: f32) -> f32 {
    if camera_distance <= f32::EPSILON {
        return MAX_SCALE;
    }
    (BASE_SCALE_DISTANCE / camera_distance).clamp(MIN_SCALE, MAX_SCALE)
}

#[derive(Debug, Clone)]
pub struct HighlightVolume {
    position: Vec3,
    visible: bool,
    animating: bool,
    phase: f32,
}

impl Default for HighlightVolume {
    fn default() -> Self {
        HighlightVolume {
            position: Vec3::ZERO,
            visible: true,
            animating: true,
            phase: 0.0,
        }
    }
}

impl HighlightVolume {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_animating(&mut self, animating: bool) {
        self.animating = animating;
        if !animating {
            self.phase = 0.0;
        }
    }

    pub fn advance(&mut self, dt_seconds: f32) {
        if self.animating {
            self.phase = (self.phase + dt_seconds * PULSE_RATE).rem_euclid(2.0 * PI);
        }
    }

    /// Current opacity in [0.4, 1.0] while animating, or the resting value.
    pub fn opacity(&self) -> f32 {
        if !self.animating {
            return RESTING_OPACITY;
        }
        0.4 + pulse_intensity(self.phase) * 0.6
    }

    /// Emissive boost for the fill color this frame.
    pub fn emissive(&self) -> f32 {
        if !self.animating {
            return 0.1;
        }
        0.05 + pulse_intensity(self.phase) * 0.8
    }
}
