use simcore::{ActuatorCommand, Locomotion};

use super::{Flow, LocomotionRoutine, RoutineContext, RoutineOutput, TIME_EPSILON};

/// Bang-bang speed governor.
///
/// Every `cruise_retarget_interval` the target becomes
/// `max(min_move_speed, speed * speed_growth_factor)`; in between, full torque
/// is applied only while below the target. Runs until superseded.
#[derive(Debug, Clone, Default)]
pub struct CruiseGovernor {
    target: Option<f64>,
    since_retarget: f64,
}

impl CruiseGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<f64> {
        self.target
    }
}

impl LocomotionRoutine for CruiseGovernor {
    fn kind(&self) -> Locomotion {
        Locomotion::Accelerating
    }

    fn advance(&mut self, ctx: &RoutineContext, out: &mut RoutineOutput) -> Flow {
        let config = ctx.config;
        let speed = ctx.snapshot.speed;

        let target = match self.target {
            Some(target) if self.since_retarget + TIME_EPSILON < config.cruise_retarget_interval => target,
            _ => {
                let target = config.min_move_speed.max(speed * config.speed_growth_factor);
                log::trace!("cruise target {:.2} m/s at {:.2} m/s", target, speed);
                self.target = Some(target);
                self.since_retarget = 0.0;
                target
            }
        };
        self.since_retarget += ctx.dt;

        let torque = if speed < target { config.wheel_torque } else { 0.0 };
        out.command(ActuatorCommand::drive(torque));
        Flow::Continue
    }
}
