//! Vehicle State Machine
//!
//! `VehicleController` owns the discrete state, the per-tick snapshot, the
//! queue of pending driver intents and at most one locomotion routine.
//! Intents are only recorded when requested; they are resolved at the next
//! tick boundary against that tick's snapshot.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use simcore::{ActuatorCommand, Actuators, Locomotion, Model, ObstacleKind, SimContext, VehicleSensors, Writer};

use crate::config::{ConfigError, VehicleConfig};
use crate::routines::{
    BrakeDecay, CruiseGovernor, LocomotionRoutine, MoveRamp, ReverseCreep, RoutineContext, RoutineExit,
    RoutineHandle,
};
use crate::sampler::{KinematicSampler, KinematicSnapshot};
use crate::state::VehicleState;
use crate::steering::SteeringController;

/// Discrete driver request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Move,
    Accelerate,
    StopAccelerating,
    /// Brake while moving, reverse when stopped
    BrakeOrReverse,
    Brake,
    StopReverse,
}

/// What resolving an intent against the current state yields
enum Resolution {
    Start(VehicleState),
    Release(ActuatorCommand, VehicleState),
    Ignore(&'static str),
}

#[derive(Debug)]
pub struct VehicleController {
    config: VehicleConfig,
    state: VehicleState,
    sampler: KinematicSampler,
    routine: Option<RoutineHandle>,
    steering: SteeringController,
    intents: VecDeque<Intent>,
    tick: u64,
}

impl VehicleController {
    pub fn new(config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            steering: SteeringController::new(&config),
            config,
            state: VehicleState::Idle,
            sampler: KinematicSampler::new(),
            routine: None,
            intents: VecDeque::new(),
            tick: 0,
        })
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Snapshot taken by the last `observe`
    pub fn snapshot(&self) -> &KinematicSnapshot {
        self.sampler.latest()
    }

    pub fn active_routine(&self) -> Option<Locomotion> {
        self.routine.as_ref().map(RoutineHandle::kind)
    }

    /// The reverse creep is holding zero torque against persistent wheelspin
    pub fn reverse_pinned(&self) -> bool {
        self.routine.as_ref().is_some_and(RoutineHandle::is_stalled)
    }

    pub fn steering_intent(&self) -> f64 {
        self.steering.intent()
    }

    pub fn steer_angle(&self) -> f64 {
        self.steering.steer_angle()
    }

    /// Completed ticks
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn pending_intents(&self) -> usize {
        self.intents.len()
    }

    // Intent API

    pub fn request(&mut self, intent: Intent) {
        self.intents.push_back(intent);
    }

    pub fn request_move(&mut self) {
        self.request(Intent::Move);
    }

    pub fn request_accelerate(&mut self) {
        self.request(Intent::Accelerate);
    }

    pub fn request_stop_accelerating(&mut self) {
        self.request(Intent::StopAccelerating);
    }

    pub fn request_brake_or_reverse(&mut self) {
        self.request(Intent::BrakeOrReverse);
    }

    pub fn request_brake(&mut self) {
        self.request(Intent::Brake);
    }

    pub fn request_stop_reverse(&mut self) {
        self.request(Intent::StopReverse);
    }

    /// Steering applies immediately; the angle is written on the next tick
    pub fn set_steering(&mut self, intent: f64) {
        self.steering.set_intent(intent);
    }

    // Tick

    /// Sample and update against a vehicle that is both sensor and actuator
    pub fn tick<V: VehicleSensors + Actuators>(&mut self, ctx: SimContext, vehicle: &mut V) {
        self.observe(vehicle);
        self.update(ctx, vehicle);
    }

    /// Capture this tick's snapshot
    pub fn observe(&mut self, sensors: &dyn VehicleSensors) {
        self.sampler.sample(sensors);
    }

    /// Run one tick against the snapshot captured by the last `observe`
    pub fn update(&mut self, ctx: SimContext, actuators: &mut dyn Actuators) {
        self.tick += 1;
        let snapshot = *self.sampler.latest();

        self.handle_collision(&snapshot, actuators);

        let mut resolved_any = false;
        while let Some(intent) = self.intents.pop_front() {
            resolved_any |= self.resolve(intent, &snapshot, actuators);
        }

        if !resolved_any
            && self.state == VehicleState::Idle
            && snapshot.is_grounded
            && snapshot.speed < self.config.stop_speed_threshold
        {
            actuators.apply(Writer::Supervisor, ActuatorCommand::lock());
            self.transition(VehicleState::Stopped);
        }

        self.advance_routine(ctx.dt, &snapshot, actuators);

        self.steering.apply(self.state, &snapshot, ctx.dt, actuators);
    }

    fn handle_collision(&mut self, snapshot: &KinematicSnapshot, actuators: &mut dyn Actuators) {
        let Some(event) = snapshot.collision else {
            return;
        };
        if event.obstacle != ObstacleKind::Static || self.state == VehicleState::Stopped {
            return;
        }
        if snapshot.rear_rpm() <= self.config.stall_rpm_threshold {
            return;
        }

        log::info!(
            "collision at {:.0} rpm while {:?}: stopping",
            snapshot.rear_rpm(),
            self.state
        );
        // A running routine sees the state change and cleans up on its own
        actuators.apply(Writer::Supervisor, ActuatorCommand::lock());
        self.transition(VehicleState::Stopped);

        // Requests made before the impact do not get to undo the stop
        if !self.intents.is_empty() {
            log::debug!("dropping {} intents queued before the collision", self.intents.len());
            self.intents.clear();
        }
    }

    /// Returns whether the intent changed the state
    fn resolve(&mut self, intent: Intent, snapshot: &KinematicSnapshot, actuators: &mut dyn Actuators) -> bool {
        let rolling = snapshot.speed >= self.config.stop_speed_threshold;
        let grounded = snapshot.is_grounded;

        use Resolution::*;
        use VehicleState::*;
        let resolution = match (intent, self.state) {
            (Intent::Move, Moving | Accelerating) => Ignore("already driving forward"),
            (Intent::Move, Idle | Stopped | Braking) if grounded => Start(Moving),
            (Intent::Move, _) => Ignore("no ground contact or reversing"),

            (Intent::Accelerate, Idle) if grounded && rolling => Start(Accelerating),
            (Intent::Accelerate, _) => Ignore("only resumes cruise while rolling in Idle"),

            (Intent::StopAccelerating, Moving | Accelerating) => {
                Release(ActuatorCommand::hold(self.config.holding_brake_torque), Idle)
            }
            (Intent::StopAccelerating, _) => Ignore("not driving forward"),

            (Intent::BrakeOrReverse, Stopped) if grounded => Start(MovingBack),
            (Intent::BrakeOrReverse, Moving | Accelerating | MovingBack) => Start(Braking),
            (Intent::BrakeOrReverse, Idle) if rolling => Start(Braking),
            (Intent::BrakeOrReverse, _) => Ignore("nothing to brake and cannot reverse"),

            (Intent::Brake, Moving | Accelerating | MovingBack) => Start(Braking),
            (Intent::Brake, Idle) if rolling => Start(Braking),
            (Intent::Brake, _) => Ignore("nothing to brake"),

            (Intent::StopReverse, MovingBack) => Release(ActuatorCommand::lock(), Stopped),
            (Intent::StopReverse, _) => Ignore("not reversing"),
        };

        match resolution {
            Start(next) => {
                self.retire_routine(actuators);
                self.transition(next);
                self.start_routine(next);
                true
            }
            Release(command, next) => {
                self.retire_routine(actuators);
                actuators.apply(Writer::Supervisor, command);
                self.transition(next);
                true
            }
            Ignore(reason) => {
                log::trace!("ignored {:?} in {:?}: {}", intent, self.state, reason);
                false
            }
        }
    }

    /// Cancel the outstanding routine. One that has not advanced yet never
    /// wrote anything and is dropped without a cleanup write.
    fn retire_routine(&mut self, actuators: &mut dyn Actuators) {
        let Some(handle) = self.routine.take() else {
            return;
        };
        log::debug!("cancelling {:?} routine", handle.kind());
        if handle.started_tick() < self.tick {
            handle.cancel(actuators);
        }
    }

    fn start_routine(&mut self, state: VehicleState) {
        let routine: Box<dyn LocomotionRoutine> = match state.locomotion() {
            Some(Locomotion::Moving) => Box::new(MoveRamp::new()),
            Some(Locomotion::Accelerating) => Box::new(CruiseGovernor::new()),
            Some(Locomotion::Braking) => Box::new(BrakeDecay::new()),
            Some(Locomotion::MovingBack) => Box::new(ReverseCreep::new()),
            None => return,
        };
        log::debug!("starting {:?} routine on tick {}", routine.kind(), self.tick);
        self.routine = Some(RoutineHandle::new(state, self.tick, routine));
    }

    fn advance_routine(&mut self, dt: f64, snapshot: &KinematicSnapshot, actuators: &mut dyn Actuators) {
        let Some(handle) = self.routine.as_mut() else {
            return;
        };
        if handle.started_tick() >= self.tick {
            return;
        }

        let ctx = RoutineContext {
            dt,
            snapshot,
            config: &self.config,
        };
        match handle.advance(self.state, &ctx, actuators) {
            RoutineExit::Running => {}
            RoutineExit::Superseded => {
                log::debug!("{:?} routine superseded in {:?}", handle.kind(), self.state);
                self.routine = None;
            }
            RoutineExit::Finished(next) => {
                log::debug!("{:?} routine finished", handle.kind());
                self.routine = None;
                self.transition(next);
                self.start_routine(next);
            }
        }
    }

    fn transition(&mut self, next: VehicleState) {
        if next != self.state {
            log::debug!("tick {}: {:?} -> {:?}", self.tick, self.state, next);
        }
        self.state = next;
    }
}

impl Model for VehicleController {
    /// Back to a freshly spawned vehicle. The routine is dropped without
    /// actuator writes; the vehicle it drove is being reset too.
    fn reset(&mut self) {
        self.state = VehicleState::Idle;
        self.sampler.reset();
        self.routine = None;
        self.steering.reset();
        self.intents.clear();
        self.tick = 0;
    }
}
