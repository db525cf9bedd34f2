//! Timed drive scripts for the demo.

use std::path::Path;

use control::{Intent, VehicleController};
use mechanics::{SpeedPlatform, VehiclePlant};
use serde::{Deserialize, Serialize};
use simcore::ObstacleKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("event {index} has invalid time {at}")]
    InvalidTime { index: usize, at: f64 },

    #[error("duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
}

/// Something that happens to the vehicle or its driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Intent { intent: Intent },
    Steer { intent: f64 },
    Grounded { grounded: bool },
    /// Collision report, optionally with the rear wheels spinning at `rear_rpm`
    Collision {
        obstacle: ObstacleKind,
        #[serde(default)]
        rear_rpm: Option<f64>,
    },
    ReleaseSpin,
    Platform {
        #[serde(default)]
        platform: SpeedPlatform,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedAction {
    /// Simulated time in seconds
    pub at: f64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveScript {
    pub duration: f64,
    #[serde(default)]
    pub events: Vec<TimedAction>,
}

impl DriveScript {
    pub fn from_json_str(json: &str) -> Result<Self, ScriptError> {
        let mut script: DriveScript = serde_json::from_str(json)?;
        if !script.duration.is_finite() || script.duration <= 0.0 {
            return Err(ScriptError::InvalidDuration(script.duration));
        }
        for (index, event) in script.events.iter().enumerate() {
            if !event.at.is_finite() || event.at < 0.0 {
                return Err(ScriptError::InvalidTime { index, at: event.at });
            }
        }
        // Stable, so simultaneous events keep their file order
        script.events.sort_by(|a, b| a.at.total_cmp(&b.at));
        Ok(script)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Replays a script against the simulated time
#[derive(Debug)]
pub struct ScriptPlayer {
    script: DriveScript,
    cursor: usize,
}

impl ScriptPlayer {
    pub fn new(script: DriveScript) -> Self {
        Self { script, cursor: 0 }
    }

    pub fn duration(&self) -> f64 {
        self.script.duration
    }

    /// Apply every event due at or before `t`
    pub fn play_until(&mut self, t: f64, controller: &mut VehicleController, plant: &mut VehiclePlant) {
        while let Some(event) = self.script.events.get(self.cursor) {
            if event.at > t {
                break;
            }
            log::debug!("t={:.2}s: {:?}", t, event.action);
            apply(&event.action, controller, plant);
            self.cursor += 1;
        }
    }
}

fn apply(action: &Action, controller: &mut VehicleController, plant: &mut VehiclePlant) {
    match action {
        Action::Intent { intent } => controller.request(*intent),
        Action::Steer { intent } => controller.set_steering(*intent),
        Action::Grounded { grounded } => plant.set_grounded(*grounded),
        Action::Collision { obstacle, rear_rpm } => {
            if rear_rpm.is_some() {
                plant.force_rear_spin(*rear_rpm);
            }
            plant.report_collision(*obstacle);
        }
        Action::ReleaseSpin => plant.force_rear_spin(None),
        Action::Platform { platform } => plant.enter_speed_platform(platform),
    }
}
