use nalgebra::Vector3;
use simcore::{ActuatorCommand, BRAKE_LOCK, Locomotion};

use super::{Flow, LocomotionRoutine, RoutineContext, RoutineOutput, TIME_EPSILON};
use crate::state::VehicleState;

/// Braking curve.
///
/// Holds the service brake and blends the body velocity toward zero with a
/// factor that grows with the time spent braking, giving an ease-in stop.
/// Locks the wheels and settles in `Stopped` when the window runs out or the
/// vehicle is at rest.
#[derive(Debug, Clone, Default)]
pub struct BrakeDecay {
    elapsed: f64,
}

impl BrakeDecay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Interpolation factor toward zero velocity for the current tick
    pub fn blend_factor(&self, decay_rate: f64, dt: f64) -> f64 {
        (decay_rate * self.elapsed * dt).clamp(0.0, 1.0)
    }
}

impl LocomotionRoutine for BrakeDecay {
    fn kind(&self) -> Locomotion {
        Locomotion::Braking
    }

    fn advance(&mut self, ctx: &RoutineContext, out: &mut RoutineOutput) -> Flow {
        let config = ctx.config;
        let window_over = self.elapsed + TIME_EPSILON >= config.brake_window;

        if window_over || ctx.snapshot.speed < config.stop_speed_threshold {
            log::debug!(
                "brakes locked after {:.2}s at {:.3} m/s",
                self.elapsed,
                ctx.snapshot.speed
            );
            out.brake(BRAKE_LOCK);
            out.velocity(Vector3::zeros());
            return Flow::Complete(VehicleState::Stopped);
        }

        self.elapsed += ctx.dt;
        let factor = self.blend_factor(config.brake_decay_rate, ctx.dt);
        let velocity = ctx.snapshot.velocity.lerp(&Vector3::zeros(), factor);

        out.command(ActuatorCommand::hold(config.service_brake_torque));
        out.velocity(velocity);
        Flow::Continue
    }

    fn ground_lost(&mut self, _ctx: &RoutineContext, out: &mut RoutineOutput) -> VehicleState {
        // Airborne: lock the wheels but leave the body's motion alone
        out.brake(BRAKE_LOCK);
        VehicleState::Stopped
    }
}
