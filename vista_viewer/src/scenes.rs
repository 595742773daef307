//! Per-view animation state.
//!
//! The model turntable spins continuously; the cloud sways between two
//! limits, flipping direction when it reaches one. Both advance by a fixed
//! step per frame, matching the single-threaded frame model.

use std::f32::consts::{FRAC_PI_4, TAU};

/// Per-frame angular step shared by the turntable and the oscillation.
pub const SPIN_STEP: f32 = 0.01;

/// The cloud sways between plus and minus this yaw.
pub const OSCILLATION_LIMIT: f32 = FRAC_PI_4;

#[derive(Debug, Clone)]
pub struct Turntable {
    angle: f32,
}

impl Default for Turntable {
    fn default() -> Self {
        Turntable { angle: 0.0 }
    }
}

impl Turntable {
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn advance(&mut self) {
        self.angle = (self.angle + SPIN_STEP).rem_euclid(TAU);
    }
}

#[derive(Debug, Clone)]
pub struct Oscillation {
    angle: f32,
    direction: f32,
}

impl Default for Oscillation {
    fn default() -> Self {
        Oscillation {
            angle: 0.0,
            direction: 1.0,
        }
    }
}

impl Oscillation {
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn advance(&mut self) {
        self.angle += SPIN_STEP * self.direction;
        if self.angle >= OSCILLATION_LIMIT {
            self.angle = OSCILLATION_LIMIT;
            self.direction = -1.0;
        } else if self.angle <= -OSCILLATION_LIMIT {
            self.angle = -OSCILLATION_LIMIT;
            self.direction = 1.0;
        }
    }
}

#[cfg(test)]
mod scenes_tests {
    use super::*;

    #[test]
    fn turntable_wraps_without_growing() {
        let mut turntable = Turntable::default();
        for _ in 0..100_000 {
            turntable.advance();
        }
        assert!(turntable.angle() >= 0.0);
        assert!(turntable.angle() < TAU);
    }

    #[test]
    fn oscillation_flips_direction_at_the_limits() {
        let mut oscillation = Oscillation::default();
        let mut reached_positive = false;
        let mut reached_negative = false;
        let mut previous = oscillation.angle();
        let mut rising = true;
        for _ in 0..1000 {
            oscillation.advance();
            let angle = oscillation.angle();
            assert!(angle.abs() <= OSCILLATION_LIMIT + 1e-6);
            if rising && angle < previous {
                reached_positive = true;
                rising = false;
            } else if !rising && angle > previous {
                reached_negative = true;
                rising = true;
            }
            previous = angle;
        }
        assert!(reached_positive, "never turned around at the upper limit");
        assert!(reached_negative, "never turned around at the lower limit");
    }
}
