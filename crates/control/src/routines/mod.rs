//! Locomotion Control Routines
//!
//! Tick-bounded control loops that drive the rear axle. Each routine keeps its
//! progress in a small struct and is advanced once per tick by the state
//! machine through a [`RoutineHandle`], which owns the continuation predicate
//! and the cleanup write shared by all routines.

mod brake;
mod cruise;
mod move_ramp;
mod reverse;

pub use brake::BrakeDecay;
pub use cruise::CruiseGovernor;
pub use move_ramp::MoveRamp;
pub use reverse::ReverseCreep;

use nalgebra::Vector3;
use simcore::{ActuatorCommand, Actuators, Locomotion, Writer};

use crate::config::VehicleConfig;
use crate::sampler::KinematicSnapshot;
use crate::state::VehicleState;

/// Slack for comparing accumulated tick time against a window
pub(crate) const TIME_EPSILON: f64 = 1e-9;

/// Everything a routine may read during one tick
#[derive(Debug, Clone, Copy)]
pub struct RoutineContext<'a> {
    pub dt: f64,
    pub snapshot: &'a KinematicSnapshot,
    pub config: &'a VehicleConfig,
}

/// Actuator writes issued on behalf of one routine
pub struct RoutineOutput<'a> {
    actuators: &'a mut dyn Actuators,
    writer: Writer,
}

impl<'a> RoutineOutput<'a> {
    pub fn new(actuators: &'a mut dyn Actuators, kind: Locomotion) -> Self {
        Self {
            actuators,
            writer: Writer::Routine(kind),
        }
    }

    pub fn command(&mut self, command: ActuatorCommand) {
        self.actuators.apply(self.writer, command);
    }

    pub fn drive(&mut self, torque: f64) {
        self.actuators.set_drive_torque(self.writer, torque);
    }

    pub fn brake(&mut self, torque: f64) {
        self.actuators.set_brake_torque(self.writer, torque);
    }

    pub fn velocity(&mut self, velocity: Vector3<f64>) {
        self.actuators.set_velocity(self.writer, velocity);
    }
}

/// Result of one control-law step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The routine reached its natural end; the machine moves to this state
    Complete(VehicleState),
}

/// A locomotion control law
pub trait LocomotionRoutine: Send {
    fn kind(&self) -> Locomotion;

    /// One tick of the control law. Only called while the continuation
    /// predicate holds.
    fn advance(&mut self, ctx: &RoutineContext, out: &mut RoutineOutput) -> Flow;

    /// Called instead of `advance` when the driven wheels leave the ground.
    /// Returns the stable state to settle in.
    fn ground_lost(&mut self, _ctx: &RoutineContext, _out: &mut RoutineOutput) -> VehicleState {
        VehicleState::Idle
    }

    /// Whether the routine is withholding torque because the wheels are stalled
    fn is_stalled(&self) -> bool {
        false
    }
}

/// How a handle left its tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineExit {
    Running,
    /// Finished by itself; the machine must transition to this state
    Finished(VehicleState),
    /// The machine no longer is in the state this routine drives
    Superseded,
}

/// The single outstanding locomotion routine plus the state it was started for
pub struct RoutineHandle {
    expected: VehicleState,
    started_tick: u64,
    routine: Box<dyn LocomotionRoutine>,
}

impl RoutineHandle {
    pub fn new(expected: VehicleState, started_tick: u64, routine: Box<dyn LocomotionRoutine>) -> Self {
        Self {
            expected,
            started_tick,
            routine,
        }
    }

    pub fn kind(&self) -> Locomotion {
        self.routine.kind()
    }

    pub fn expected_state(&self) -> VehicleState {
        self.expected
    }

    /// Tick on which the handle was created; it first advances on the next one
    pub fn started_tick(&self) -> u64 {
        self.started_tick
    }

    pub fn is_stalled(&self) -> bool {
        self.routine.is_stalled()
    }

    /// Check the continuation predicate, run one step, and clean up on exit.
    /// Every exit path ends with a zero drive torque write.
    pub fn advance(
        &mut self,
        current: VehicleState,
        ctx: &RoutineContext,
        actuators: &mut dyn Actuators,
    ) -> RoutineExit {
        let mut out = RoutineOutput::new(actuators, self.routine.kind());

        if current != self.expected {
            out.drive(0.0);
            return RoutineExit::Superseded;
        }

        if !ctx.snapshot.is_grounded {
            let next = self.routine.ground_lost(ctx, &mut out);
            out.drive(0.0);
            return RoutineExit::Finished(next);
        }

        match self.routine.advance(ctx, &mut out) {
            Flow::Continue => RoutineExit::Running,
            Flow::Complete(next) => {
                out.drive(0.0);
                RoutineExit::Finished(next)
            }
        }
    }

    /// Explicit cancellation by the state machine
    pub fn cancel(self, actuators: &mut dyn Actuators) {
        let mut out = RoutineOutput::new(actuators, self.routine.kind());
        out.drive(0.0);
    }
}

impl std::fmt::Debug for RoutineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineHandle")
            .field("kind", &self.routine.kind())
            .field("expected", &self.expected)
            .field("started_tick", &self.started_tick)
            .finish()
    }
}
