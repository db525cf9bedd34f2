use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Actuator Traits

/// Brake torque sentinel: the wheels are locked.
pub const BRAKE_LOCK: f64 = f64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Wheel {
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontLeft,
        Wheel::FrontRight,
        Wheel::RearLeft,
        Wheel::RearRight,
    ];

    /// Rear axle, the only one carrying drive and brake torque
    pub const DRIVEN: [Wheel; 2] = [Wheel::RearLeft, Wheel::RearRight];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_driven(self) -> bool {
        matches!(self, Wheel::RearLeft | Wheel::RearRight)
    }
}

/// Torque pair applied uniformly to both driven wheels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// Signed drive torque, positive is forward (N·m)
    pub drive_torque: f64,
    /// Brake torque, never negative; `BRAKE_LOCK` locks the wheels (N·m)
    pub brake_torque: f64,
}

impl ActuatorCommand {
    pub fn drive(torque: f64) -> Self {
        ActuatorCommand {
            drive_torque: torque,
            brake_torque: 0.0,
        }
    }

    pub fn hold(brake_torque: f64) -> Self {
        ActuatorCommand {
            drive_torque: 0.0,
            brake_torque: brake_torque.max(0.0),
        }
    }

    pub fn lock() -> Self {
        ActuatorCommand::hold(BRAKE_LOCK)
    }

    pub fn is_locked(&self) -> bool {
        self.brake_torque >= BRAKE_LOCK
    }
}

/// The mutually exclusive locomotion control loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locomotion {
    Moving,
    Accelerating,
    Braking,
    MovingBack,
}

/// Who issued an actuator write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Writer {
    /// The state machine itself (transition writes, collision lock)
    Supervisor,
    Routine(Locomotion),
    Steering,
}

impl Writer {
    pub fn locomotion(self) -> Option<Locomotion> {
        match self {
            Writer::Routine(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Write surface of the vehicle's actuators. Pure read/write, no policy.
pub trait Actuators {
    fn set_drive_torque(&mut self, writer: Writer, torque: f64);
    fn set_brake_torque(&mut self, writer: Writer, torque: f64);
    /// Front wheel steer angle (degrees)
    fn set_steer_angle(&mut self, angle: f64);
    /// Override the body velocity (body frame)
    fn set_velocity(&mut self, writer: Writer, velocity: Vector3<f64>);

    fn apply(&mut self, writer: Writer, command: ActuatorCommand) {
        self.set_drive_torque(writer, command.drive_torque);
        self.set_brake_torque(writer, command.brake_torque);
    }
}

// Sensor Traits

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub obstacle: ObstacleKind,
}

/// Pull-based view of the vehicle kinematics for the current physics tick.
pub trait VehicleSensors {
    /// Body velocity in the body frame: x forward, y lateral, z up (m/s)
    fn velocity(&self) -> Vector3<f64>;

    fn speed(&self) -> f64 {
        self.velocity().norm()
    }

    fn ground_contact(&self, wheel: Wheel) -> bool;

    /// Wheel angular rate in rpm, signed with the wheel's rolling direction
    fn angular_rate_rpm(&self, wheel: Wheel) -> f64;

    /// Collision reported during the last physics tick, if any
    fn collision(&self) -> Option<CollisionEvent>;
}

// General Traits

#[derive(Debug, Clone, Copy)]
pub struct SimContext {
    pub dt: f64,
    pub t: f64,
}

pub trait Model {
    fn reset(&mut self);
}
