//! Kinematic Sampler
//!
//! Captures the vehicle kinematics once per tick so every consumer in that
//! tick (state machine, routines, steering) reads the same values.

use nalgebra::Vector3;
use simcore::{CollisionEvent, VehicleSensors, Wheel};

/// Immutable view of the vehicle for one physics tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicSnapshot {
    /// Body velocity magnitude (m/s)
    pub speed: f64,
    /// Signed velocity along the body's forward axis (m/s)
    pub forward_speed: f64,
    /// Body velocity in the body frame (m/s)
    pub velocity: Vector3<f64>,
    /// Ground contact per wheel, indexed by `Wheel::index`
    pub contacts: [bool; 4],
    /// Both driven wheels touch the ground
    pub is_grounded: bool,
    pub rear_left_rpm: f64,
    pub rear_right_rpm: f64,
    pub collision: Option<CollisionEvent>,
}

impl Default for KinematicSnapshot {
    fn default() -> Self {
        KinematicSnapshot {
            speed: 0.0,
            forward_speed: 0.0,
            velocity: Vector3::zeros(),
            contacts: [false; 4],
            is_grounded: false,
            rear_left_rpm: 0.0,
            rear_right_rpm: 0.0,
            collision: None,
        }
    }
}

impl KinematicSnapshot {
    pub fn capture(sensors: &dyn VehicleSensors) -> Self {
        let velocity = sensors.velocity();
        let mut contacts = [false; 4];
        for wheel in Wheel::ALL {
            contacts[wheel.index()] = sensors.ground_contact(wheel);
        }
        let is_grounded = Wheel::DRIVEN.iter().all(|w| contacts[w.index()]);

        KinematicSnapshot {
            speed: velocity.norm(),
            forward_speed: velocity.x,
            velocity,
            contacts,
            is_grounded,
            rear_left_rpm: sensors.angular_rate_rpm(Wheel::RearLeft),
            rear_right_rpm: sensors.angular_rate_rpm(Wheel::RearRight),
            collision: sensors.collision(),
        }
    }

    pub fn contact(&self, wheel: Wheel) -> bool {
        self.contacts[wheel.index()]
    }

    /// Faster of the two rear wheels, direction ignored
    pub fn rear_rpm(&self) -> f64 {
        self.rear_left_rpm.abs().max(self.rear_right_rpm.abs())
    }
}

/// Holds the snapshot of the current tick.
#[derive(Debug, Clone, Default)]
pub struct KinematicSampler {
    latest: KinematicSnapshot,
    samples: u64,
}

impl KinematicSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, sensors: &dyn VehicleSensors) -> &KinematicSnapshot {
        self.latest = KinematicSnapshot::capture(sensors);
        self.samples += 1;
        &self.latest
    }

    pub fn latest(&self) -> &KinematicSnapshot {
        &self.latest
    }

    /// Number of snapshots captured so far
    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
