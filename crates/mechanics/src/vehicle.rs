use std::f64::consts::PI;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use simcore::{
    ActuatorCommand, Actuators, CollisionEvent, Model, ObstacleKind, SimContext, VehicleSensors,
    Wheel, Writer,
};

const GRAVITY: f64 = 9.81;

/// Physical properties of the longitudinal vehicle plant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehiclePlantConfig {
    /// Total mass of the vehicle in kg.
    pub mass: f64,
    /// Radius of the driven wheels in meters.
    pub wheel_radius: f64,
    /// Viscous drag on forward speed in N·s/m.
    pub drag: f64,
    /// Tire/road friction coefficient, bounds braking deceleration.
    pub friction: f64,
}

impl Default for VehiclePlantConfig {
    fn default() -> Self {
        VehiclePlantConfig {
            mass: 1200.0,
            wheel_radius: 0.35,
            drag: 0.0,
            friction: 0.9,
        }
    }
}

/// One-shot impulse zone: adds `|v| * speed_scaler` along `direction`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeedPlatform {
    pub speed_scaler: f64,
    /// Direction of the impulse in the body frame
    pub direction: [f64; 3],
}

impl Default for SpeedPlatform {
    fn default() -> Self {
        SpeedPlatform {
            speed_scaler: 0.15,
            direction: [1.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteKind {
    Drive(f64),
    Brake(f64),
    Velocity,
}

/// An actuator write as seen by the plant, stamped with the tick it landed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteRecord {
    pub tick: u64,
    pub writer: Writer,
    pub kind: WriteKind,
}

/// Point-mass vehicle driven through its rear axle.
///
/// Implements both sides of the controller boundary so it can stand in for
/// the physics layer in tests and the demo. Only forward motion is
/// integrated; lateral velocity changes solely through velocity overrides.
#[derive(Debug, Clone)]
pub struct VehiclePlant {
    pub config: VehiclePlantConfig,
    velocity: Vector3<f64>,
    contacts: [bool; 4],
    wheel_rpm: [f64; 4],
    rear_spin_override: Option<f64>,
    command: ActuatorCommand,
    steer_angle: f64,
    collision: Option<CollisionEvent>,
    tick: u64,
    write_log: Vec<WriteRecord>,
}

impl VehiclePlant {
    pub fn new(config: VehiclePlantConfig) -> Self {
        VehiclePlant {
            config,
            velocity: Vector3::zeros(),
            contacts: [true; 4],
            wheel_rpm: [0.0; 4],
            rear_spin_override: None,
            command: ActuatorCommand::default(),
            steer_angle: 0.0,
            collision: None,
            tick: 0,
            write_log: Vec::new(),
        }
    }

    pub fn command(&self) -> ActuatorCommand {
        self.command
    }

    pub fn steer_angle(&self) -> f64 {
        self.steer_angle
    }

    /// Number of completed physics steps
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn write_log(&self) -> &[WriteRecord] {
        &self.write_log
    }

    pub fn clear_write_log(&mut self) {
        self.write_log.clear();
    }

    /// Place the body at a given velocity without logging a controller write.
    pub fn set_body_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
        self.refresh_wheel_rates();
    }

    pub fn set_grounded(&mut self, grounded: bool) {
        self.contacts = [grounded; 4];
    }

    pub fn set_contact(&mut self, wheel: Wheel, grounded: bool) {
        self.contacts[wheel.index()] = grounded;
    }

    /// Force the rear wheel rate (rpm), e.g. to model wheelspin against a wall.
    pub fn force_rear_spin(&mut self, rpm: Option<f64>) {
        self.rear_spin_override = rpm;
        self.refresh_wheel_rates();
    }

    /// Report a collision; visible to sensors until the next step.
    pub fn report_collision(&mut self, obstacle: ObstacleKind) {
        log::debug!("plant collision with {:?} obstacle", obstacle);
        self.collision = Some(CollisionEvent { obstacle });
    }

    pub fn enter_speed_platform(&mut self, platform: &SpeedPlatform) {
        let direction = Vector3::from(platform.direction);
        log::debug!(
            "speed platform impulse: scaler {} at {:.2} m/s",
            platform.speed_scaler,
            self.velocity.norm()
        );
        self.velocity += self.velocity.norm() * platform.speed_scaler * direction;
        self.refresh_wheel_rates();
    }

    fn driven_grounded(&self) -> bool {
        Wheel::DRIVEN.iter().all(|w| self.contacts[w.index()])
    }

    fn rpm_from_speed(&self, speed: f64) -> f64 {
        speed / self.config.wheel_radius * 60.0 / (2.0 * PI)
    }

    fn refresh_wheel_rates(&mut self) {
        let rolling = self.rpm_from_speed(self.velocity.x);
        let rear = if self.command.is_locked() && self.driven_grounded() {
            0.0
        } else {
            self.rear_spin_override.unwrap_or(rolling)
        };
        self.wheel_rpm = [rolling, rolling, rear, rear];
    }

    /// Integrate one physics step under the current actuator command.
    pub fn step(&mut self, ctx: SimContext) {
        let dt = ctx.dt;
        let mass = self.config.mass;
        let radius = self.config.wheel_radius;

        if self.driven_grounded() {
            let max_decel = self.config.friction * GRAVITY;

            if !self.command.is_locked() {
                // Two driven wheels share the commanded torque each
                let drive_force = 2.0 * self.command.drive_torque / radius;
                let drag_force = -self.config.drag * self.velocity.x;
                self.velocity.x += (drive_force + drag_force) / mass * dt;
            }

            let brake_decel = if self.command.is_locked() {
                max_decel
            } else {
                (2.0 * self.command.brake_torque / (radius * mass)).min(max_decel)
            };
            // Brakes oppose motion but never reverse it
            let dv = (brake_decel * dt).min(self.velocity.x.abs());
            self.velocity.x -= self.velocity.x.signum() * dv;
        }

        self.refresh_wheel_rates();
        self.collision = None;
        self.tick += 1;
    }
}

impl Default for VehiclePlant {
    fn default() -> Self {
        VehiclePlant::new(VehiclePlantConfig::default())
    }
}

impl Model for VehiclePlant {
    fn reset(&mut self) {
        self.velocity = Vector3::zeros();
        self.contacts = [true; 4];
        self.wheel_rpm = [0.0; 4];
        self.rear_spin_override = None;
        self.command = ActuatorCommand::default();
        self.steer_angle = 0.0;
        self.collision = None;
        self.tick = 0;
        self.write_log.clear();
    }
}

impl VehicleSensors for VehiclePlant {
    fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    fn ground_contact(&self, wheel: Wheel) -> bool {
        self.contacts[wheel.index()]
    }

    fn angular_rate_rpm(&self, wheel: Wheel) -> f64 {
        self.wheel_rpm[wheel.index()]
    }

    fn collision(&self) -> Option<CollisionEvent> {
        self.collision
    }
}

impl Actuators for VehiclePlant {
    fn set_drive_torque(&mut self, writer: Writer, torque: f64) {
        self.command.drive_torque = torque;
        self.write_log.push(WriteRecord {
            tick: self.tick,
            writer,
            kind: WriteKind::Drive(torque),
        });
    }

    fn set_brake_torque(&mut self, writer: Writer, torque: f64) {
        self.command.brake_torque = torque.max(0.0);
        self.write_log.push(WriteRecord {
            tick: self.tick,
            writer,
            kind: WriteKind::Brake(torque),
        });
    }

    fn set_steer_angle(&mut self, angle: f64) {
        self.steer_angle = angle;
    }

    fn set_velocity(&mut self, writer: Writer, velocity: Vector3<f64>) {
        self.velocity = velocity;
        self.refresh_wheel_rates();
        self.write_log.push(WriteRecord {
            tick: self.tick,
            writer,
            kind: WriteKind::Velocity,
        });
    }
}
