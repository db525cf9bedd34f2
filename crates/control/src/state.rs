use serde::{Deserialize, Serialize};
use simcore::Locomotion;

/// Discrete state of the vehicle. Exactly one is active at a time and it
/// decides which locomotion routine may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VehicleState {
    /// Coasting with no routine; the state the vehicle spawns in
    #[default]
    Idle,
    /// At rest with the wheels locked
    Stopped,
    Accelerating,
    Moving,
    MovingBack,
    Braking,
}

impl VehicleState {
    /// The locomotion routine that drives this state, if any
    pub fn locomotion(self) -> Option<Locomotion> {
        match self {
            VehicleState::Moving => Some(Locomotion::Moving),
            VehicleState::Accelerating => Some(Locomotion::Accelerating),
            VehicleState::Braking => Some(Locomotion::Braking),
            VehicleState::MovingBack => Some(Locomotion::MovingBack),
            VehicleState::Idle | VehicleState::Stopped => None,
        }
    }

    pub fn is_stable(self) -> bool {
        matches!(self, VehicleState::Idle | VehicleState::Stopped)
    }

    /// Forward-driving states, the only ones that get the lateral grip blend
    pub fn is_driving_forward(self) -> bool {
        matches!(self, VehicleState::Moving | VehicleState::Accelerating)
    }
}

impl From<Locomotion> for VehicleState {
    fn from(kind: Locomotion) -> Self {
        match kind {
            Locomotion::Moving => VehicleState::Moving,
            Locomotion::Accelerating => VehicleState::Accelerating,
            Locomotion::Braking => VehicleState::Braking,
            Locomotion::MovingBack => VehicleState::MovingBack,
        }
    }
}
