use simcore::{ActuatorCommand, Locomotion};

use super::{Flow, LocomotionRoutine, RoutineContext, RoutineOutput};

/// Reverse creep: releases the brakes and applies reverse torque until the
/// vehicle backs up at the reverse target speed, withholding it while the rear
/// wheels spin past the stall threshold. Forward motion left over on entry is
/// worked off by the same torque.
///
/// A vehicle pinned against an obstacle keeps spinning its wheels without
/// gaining speed, so torque stays withheld indefinitely. That case is reported
/// (warning + `is_stalled`) rather than recovered from.
#[derive(Debug, Clone, Default)]
pub struct ReverseCreep {
    stalled_for: f64,
    pinned: bool,
}

impl ReverseCreep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time reverse torque has been withheld below the target speed
    pub fn stalled_for(&self) -> f64 {
        self.stalled_for
    }
}

impl LocomotionRoutine for ReverseCreep {
    fn kind(&self) -> Locomotion {
        Locomotion::MovingBack
    }

    fn advance(&mut self, ctx: &RoutineContext, out: &mut RoutineOutput) -> Flow {
        let config = ctx.config;
        let reverse_speed = -ctx.snapshot.forward_speed;
        let below_target = reverse_speed < config.move_back_speed;
        let spinning = ctx.snapshot.rear_rpm() >= config.stall_rpm_threshold;

        if below_target && spinning {
            self.stalled_for += ctx.dt;
            if !self.pinned && self.stalled_for >= config.stall_timeout {
                self.pinned = true;
                log::warn!(
                    "reverse stalled for {:.2}s at {:.0} rpm; holding zero torque",
                    self.stalled_for,
                    ctx.snapshot.rear_rpm()
                );
            }
        } else {
            if self.pinned {
                log::debug!("reverse stall cleared");
            }
            self.stalled_for = 0.0;
            self.pinned = false;
        }

        let torque = if below_target && !spinning {
            -config.wheel_torque
        } else {
            0.0
        };
        out.command(ActuatorCommand::drive(torque));
        Flow::Continue
    }

    fn is_stalled(&self) -> bool {
        self.pinned
    }
}
