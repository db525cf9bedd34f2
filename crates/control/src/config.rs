//! Vehicle Configuration
//!
//! Tunables for the drivetrain state machine. Loaded once (usually from JSON),
//! validated, then held immutably by the controller.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{field}` must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("`{field}` must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("`{field}` must lie in {min}..{max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("failed to read vehicle config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse vehicle config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the vehicle motion controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Front wheel steer angle at full steering intent (degrees)
    pub max_steering_angle: f64,
    /// Drive torque per rear wheel at full throttle (N·m)
    pub wheel_torque: f64,
    /// Target speed while reversing (m/s)
    pub move_back_speed: f64,
    /// Lower bound of the cruise governor's target (m/s)
    pub min_move_speed: f64,
    /// Rear wheel rate above which reverse torque is withheld and
    /// collisions force a stop (rpm)
    pub stall_rpm_threshold: f64,
    /// Length of the full-torque launch ramp (s)
    pub ramp_duration: f64,
    /// How often the cruise governor picks a new target (s)
    pub cruise_retarget_interval: f64,
    /// Multiplier applied to the current speed when retargeting
    pub speed_growth_factor: f64,
    /// Longest time a braking routine may run before locking (s)
    pub brake_window: f64,
    /// Growth rate of the braking velocity blend (1/s²)
    pub brake_decay_rate: f64,
    /// Brake torque while the braking routine runs (N·m)
    pub service_brake_torque: f64,
    /// Brake torque applied when acceleration is released (N·m)
    pub holding_brake_torque: f64,
    /// Speed below which the vehicle counts as standing still (m/s)
    pub stop_speed_threshold: f64,
    /// Lateral velocity blend rate at full steering intent (1/s)
    pub lateral_grip_rate: f64,
    /// Time a stalled reverse may last before it is reported as pinned (s)
    pub stall_timeout: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_steering_angle: 30.0,
            wheel_torque: 400.0,
            move_back_speed: 3.0,
            min_move_speed: 5.0,
            stall_rpm_threshold: 600.0,
            ramp_duration: 2.0,
            cruise_retarget_interval: 1.0,
            speed_growth_factor: 1.05,
            brake_window: 2.0,
            brake_decay_rate: 3.0,
            service_brake_torque: 800.0,
            holding_brake_torque: 150.0,
            stop_speed_threshold: 0.01,
            lateral_grip_rate: 2.0,
            stall_timeout: 1.5,
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if finite(field, value)? < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if finite(field, value)? <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    let value = finite(field, value)?;
    if value < min || value >= max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl VehicleConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: VehicleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject configurations the control laws cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        in_range("max_steering_angle", self.max_steering_angle, 0.0, 90.0)?;
        non_negative("wheel_torque", self.wheel_torque)?;
        non_negative("move_back_speed", self.move_back_speed)?;
        non_negative("min_move_speed", self.min_move_speed)?;
        positive("stall_rpm_threshold", self.stall_rpm_threshold)?;
        positive("ramp_duration", self.ramp_duration)?;
        positive("cruise_retarget_interval", self.cruise_retarget_interval)?;
        in_range("speed_growth_factor", self.speed_growth_factor, 1.0, f64::INFINITY)?;
        positive("brake_window", self.brake_window)?;
        non_negative("brake_decay_rate", self.brake_decay_rate)?;
        non_negative("service_brake_torque", self.service_brake_torque)?;
        non_negative("holding_brake_torque", self.holding_brake_torque)?;
        positive("stop_speed_threshold", self.stop_speed_threshold)?;
        non_negative("lateral_grip_rate", self.lateral_grip_rate)?;
        positive("stall_timeout", self.stall_timeout)?;
        Ok(())
    }

    /// Set the full-throttle wheel torque
    pub fn with_wheel_torque(mut self, torque: f64) -> Self {
        self.wheel_torque = torque;
        self
    }

    /// Set the maximum steer angle
    pub fn with_max_steering_angle(mut self, angle: f64) -> Self {
        self.max_steering_angle = angle;
        self
    }

    /// Set the reverse target speed
    pub fn with_move_back_speed(mut self, speed: f64) -> Self {
        self.move_back_speed = speed;
        self
    }

    /// Set the cruise governor's minimum target
    pub fn with_min_move_speed(mut self, speed: f64) -> Self {
        self.min_move_speed = speed;
        self
    }

    /// Set the stall/collision wheel rate threshold
    pub fn with_stall_rpm_threshold(mut self, rpm: f64) -> Self {
        self.stall_rpm_threshold = rpm;
        self
    }

    /// Set the launch ramp duration
    pub fn with_ramp_duration(mut self, seconds: f64) -> Self {
        self.ramp_duration = seconds;
        self
    }

    /// Set the braking window
    pub fn with_brake_window(mut self, seconds: f64) -> Self {
        self.brake_window = seconds;
        self
    }
}
