use simcore::{ActuatorCommand, Locomotion};

use super::{Flow, LocomotionRoutine, RoutineContext, RoutineOutput, TIME_EPSILON};
use crate::state::VehicleState;

/// Launch ramp: full drive torque for a fixed window, then hands over to the
/// cruise governor.
#[derive(Debug, Clone, Default)]
pub struct MoveRamp {
    elapsed: f64,
}

impl MoveRamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl LocomotionRoutine for MoveRamp {
    fn kind(&self) -> Locomotion {
        Locomotion::Moving
    }

    fn advance(&mut self, ctx: &RoutineContext, out: &mut RoutineOutput) -> Flow {
        if self.elapsed + TIME_EPSILON >= ctx.config.ramp_duration {
            log::debug!("launch ramp done after {:.2}s", self.elapsed);
            return Flow::Complete(VehicleState::Accelerating);
        }

        out.command(ActuatorCommand::drive(ctx.config.wheel_torque));
        self.elapsed += ctx.dt;
        Flow::Continue
    }
}
