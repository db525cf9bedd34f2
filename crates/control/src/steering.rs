//! Steering Controller
//!
//! Independent of the locomotion routines: sets the front steer angle every
//! tick and, while driving forward, blends the body velocity back toward the
//! heading to make up for the grip the rear drivetrain loses at speed.

use nalgebra::Vector3;
use simcore::{Actuators, Writer};

use crate::config::VehicleConfig;
use crate::sampler::KinematicSnapshot;
use crate::state::VehicleState;

/// Velocity with the same planar magnitude, pointed along the body's
/// forward axis (backward if already rolling backward).
pub fn forward_biased(velocity: Vector3<f64>) -> Vector3<f64> {
    let planar = velocity.x.hypot(velocity.y);
    Vector3::new(velocity.x.signum() * planar, 0.0, velocity.z)
}

/// One tick of lateral correction. Converges under repeated application.
pub fn lateral_correction(velocity: Vector3<f64>, intent: f64, grip_rate: f64, dt: f64) -> Vector3<f64> {
    let factor = (grip_rate * intent.abs() * dt).clamp(0.0, 1.0);
    if factor == 0.0 {
        return velocity;
    }
    velocity.lerp(&forward_biased(velocity), factor)
}

#[derive(Debug, Clone)]
pub struct SteeringController {
    max_steering_angle: f64,
    lateral_grip_rate: f64,
    intent: f64,
}

impl SteeringController {
    pub fn new(config: &VehicleConfig) -> Self {
        Self {
            max_steering_angle: config.max_steering_angle,
            lateral_grip_rate: config.lateral_grip_rate,
            intent: 0.0,
        }
    }

    /// Normalized intent, clamped to [-1, 1]; anything non-finite reads as 0
    pub fn set_intent(&mut self, intent: f64) {
        self.intent = if intent.is_finite() {
            intent.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn intent(&self) -> f64 {
        self.intent
    }

    /// Front wheel angle for the current intent (degrees)
    pub fn steer_angle(&self) -> f64 {
        self.intent * self.max_steering_angle
    }

    pub fn apply(&self, state: VehicleState, snapshot: &KinematicSnapshot, dt: f64, actuators: &mut dyn Actuators) {
        actuators.set_steer_angle(self.steer_angle());

        if !state.is_driving_forward() || self.intent == 0.0 {
            return;
        }
        let corrected = lateral_correction(snapshot.velocity, self.intent, self.lateral_grip_rate, dt);
        actuators.set_velocity(Writer::Steering, corrected);
    }

    pub fn reset(&mut self) {
        self.intent = 0.0;
    }
}
