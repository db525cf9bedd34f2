use std::collections::BTreeMap;

use approx::assert_relative_eq;
use control::{Intent, VehicleConfig, VehicleController, VehicleState};
use mechanics::{SpeedPlatform, VehiclePlant, WriteKind};
use nalgebra::Vector3;
use simcore::{FixedStepper, Locomotion, Model, ObstacleKind, SimContext, VehicleSensors, Writer};

const DT: f64 = 0.01;

/// Launch ramp ticks at the default 2 s ramp, plus the intent tick and the
/// handoff tick
const TO_CRUISE: usize = 1 + 200 + 2;

struct Rig {
    controller: VehicleController,
    plant: VehiclePlant,
    t: f64,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(VehicleConfig::default())
    }

    fn with_config(config: VehicleConfig) -> Self {
        Rig {
            controller: VehicleController::new(config).unwrap(),
            plant: VehiclePlant::default(),
            t: 0.0,
        }
    }

    fn step(&mut self) {
        let ctx = SimContext { dt: DT, t: self.t };
        self.controller.tick(ctx, &mut self.plant);
        self.plant.step(ctx);
        self.t += DT;
    }

    fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.step();
        }
    }

    fn state(&self) -> VehicleState {
        self.controller.state()
    }

    fn drive_to_cruise(&mut self) {
        self.controller.request_move();
        self.run(TO_CRUISE);
        assert_eq!(self.state(), VehicleState::Accelerating);
    }

    /// Distinct locomotion writers per plant tick
    fn routine_writers_per_tick(&self) -> BTreeMap<u64, Vec<Locomotion>> {
        let mut per_tick: BTreeMap<u64, Vec<Locomotion>> = BTreeMap::new();
        for record in self.plant.write_log() {
            if let Some(kind) = record.writer.locomotion() {
                let writers = per_tick.entry(record.tick).or_default();
                if !writers.contains(&kind) {
                    writers.push(kind);
                }
            }
        }
        per_tick
    }
}

#[test]
fn test_launch_hands_over_to_cruise() {
    let mut rig = Rig::new();
    rig.controller.request_move();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Moving);

    rig.run(TO_CRUISE - 1);
    assert_eq!(rig.state(), VehicleState::Accelerating);
    assert_eq!(rig.controller.active_routine(), Some(Locomotion::Accelerating));

    let command = rig.plant.command();
    assert_relative_eq!(command.drive_torque, rig.controller.config().wheel_torque);
    assert_relative_eq!(command.brake_torque, 0.0);
    assert!(rig.plant.speed() > 3.0);
}

#[test]
fn test_brake_from_cruise_settles_stopped() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();

    rig.controller.request_brake_or_reverse();
    let mut previous = rig.plant.speed();
    let mut ticks = 0;
    while rig.state() != VehicleState::Stopped || ticks == 0 {
        rig.step();
        ticks += 1;
        let speed = rig.plant.speed();
        assert!(speed <= previous + 1e-12, "speed rose while braking");
        previous = speed;
        assert!(ticks <= 205, "braking window overran");
    }

    assert!(rig.plant.command().is_locked());
    assert_relative_eq!(rig.plant.command().drive_torque, 0.0);
    assert!(rig.plant.speed() < 1e-6);
    assert!(rig.controller.active_routine().is_none());
}

#[test]
fn test_reverse_creeps_to_target_speed() {
    let mut rig = Rig::new();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Stopped);

    rig.controller.request_brake_or_reverse();
    rig.step();
    assert_eq!(rig.state(), VehicleState::MovingBack);

    rig.run(300);
    let target = rig.controller.config().move_back_speed;
    assert!(rig.plant.velocity().x < 0.0);
    assert!(rig.plant.speed() >= target);
    assert_relative_eq!(rig.plant.speed(), target, epsilon = 0.05);
    assert_relative_eq!(rig.plant.command().drive_torque, 0.0);
    assert_relative_eq!(rig.plant.command().brake_torque, 0.0);

    // Holds without drag
    let held = rig.plant.speed();
    rig.run(50);
    assert_relative_eq!(rig.plant.speed(), held, epsilon = 1e-9);

    rig.controller.request_stop_reverse();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Stopped);
    assert!(rig.plant.command().is_locked());
}

#[test]
fn test_airborne_move_request_writes_nothing() {
    let mut rig = Rig::new();
    rig.plant.set_grounded(false);

    rig.controller.request_move();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Idle);
    assert!(rig.plant.write_log().is_empty());
}

#[test]
fn test_wall_hit_with_wheelspin_locks() {
    let mut rig = Rig::new();
    rig.controller.request_move();
    rig.run(50);
    assert_eq!(rig.state(), VehicleState::Moving);

    rig.plant.force_rear_spin(Some(900.0));
    rig.plant.report_collision(ObstacleKind::Static);
    rig.step();

    assert_eq!(rig.state(), VehicleState::Stopped);
    assert!(rig.plant.command().is_locked());
    assert_relative_eq!(rig.plant.command().drive_torque, 0.0);
    assert!(rig.controller.active_routine().is_none());
}

#[test]
fn test_single_routine_writer_per_tick() {
    let mut rig = Rig::new();
    let intents = [
        Intent::Move,
        Intent::Accelerate,
        Intent::StopAccelerating,
        Intent::BrakeOrReverse,
        Intent::Brake,
        Intent::StopReverse,
    ];

    // xorshift keeps the sequence reproducible
    let mut seed: u32 = 0x9e37_79b9;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        seed
    };

    for _ in 0..3000 {
        let roll = next();
        if roll % 7 == 0 {
            // Bursts of intents land in the same tick
            for _ in 0..=(roll % 3) {
                rig.controller.request(intents[(next() % 6) as usize]);
            }
        }
        if roll % 97 == 0 {
            rig.plant.set_grounded(false);
        } else if roll % 89 == 0 {
            rig.plant.set_grounded(true);
        }
        if roll % 211 == 0 {
            rig.plant.force_rear_spin(Some(1000.0));
            rig.plant.report_collision(ObstacleKind::Static);
        } else if roll % 53 == 0 {
            rig.plant.force_rear_spin(None);
        }
        rig.step();
    }

    for (tick, writers) in rig.routine_writers_per_tick() {
        assert!(writers.len() <= 1, "tick {tick}: routines {writers:?} wrote together");
    }
}

#[test]
fn test_airborne_intents_never_start_driving() {
    let mut rig = Rig::new();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Stopped);

    rig.plant.set_grounded(false);
    for intent in [Intent::Move, Intent::Accelerate, Intent::BrakeOrReverse] {
        rig.controller.request(intent);
        rig.step();
        assert_eq!(rig.state(), VehicleState::Stopped);
    }
    assert!(rig.controller.active_routine().is_none());
}

#[test]
fn test_every_routine_exit_ends_with_zero_drive() {
    let mut rig = Rig::new();
    let script: [(usize, Intent); 6] = [
        (0, Intent::Move),
        (120, Intent::BrakeOrReverse),
        (260, Intent::BrakeOrReverse),
        (360, Intent::Brake),
        (600, Intent::Move),
        (700, Intent::StopAccelerating),
    ];

    let mut active = None;
    for tick in 0..900 {
        for (_, intent) in script.iter().filter(|(at, _)| *at == tick) {
            rig.controller.request(*intent);
        }
        rig.step();

        let now = rig.controller.active_routine();
        if let Some(kind) = active.filter(|kind| now != Some(*kind)) {
            let last_drive = rig
                .plant
                .write_log()
                .iter()
                .rev()
                .filter(|r| r.writer == Writer::Routine(kind))
                .find_map(|r| match r.kind {
                    WriteKind::Drive(torque) => Some(torque),
                    _ => None,
                });
            assert_eq!(last_drive, Some(0.0), "{kind:?} exited with torque applied");
        }
        active = now;
    }
}

#[test]
fn test_braking_window_bounds_stop_at_any_speed() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();
    rig.plant.set_body_velocity(Vector3::new(40.0, 0.0, 0.0));

    rig.controller.request_brake();
    rig.run(2 + 200 + 1);
    assert_eq!(rig.state(), VehicleState::Stopped);
    assert!(rig.plant.speed() < 1e-9);
}

#[test]
fn test_lateral_drift_is_corrected_while_cruising() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();
    let v = rig.plant.velocity();
    rig.plant.set_body_velocity(Vector3::new(v.x, 2.0, 0.0));
    rig.controller.set_steering(1.0);

    let mut lateral = 2.0_f64;
    for _ in 0..600 {
        rig.step();
        let y = rig.plant.velocity().y.abs();
        assert!(y <= lateral);
        lateral = y;
    }
    assert!(lateral < 1e-3);
    assert_relative_eq!(rig.plant.steer_angle(), 30.0);

    // Steering stays put in braking
    rig.plant.set_body_velocity(Vector3::new(rig.plant.velocity().x, 1.0, 0.0));
    rig.controller.request_brake();
    rig.run(3);
    assert_eq!(rig.state(), VehicleState::Braking);
    assert!(
        rig.plant
            .write_log()
            .iter()
            .rev()
            .take_while(|r| r.writer != Writer::Routine(Locomotion::Accelerating))
            .all(|r| r.writer != Writer::Steering)
    );
}

#[test]
fn test_stop_accelerating_coasts_to_stop() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();

    rig.controller.request_stop_accelerating();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Idle);
    assert_relative_eq!(rig.plant.command().brake_torque, rig.controller.config().holding_brake_torque);
    assert_relative_eq!(rig.plant.command().drive_torque, 0.0);

    rig.run(800);
    assert_eq!(rig.state(), VehicleState::Stopped);
    assert!(rig.plant.command().is_locked());
}

#[test]
fn test_ground_loss_drops_to_idle() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();
    let speed = rig.plant.speed();

    rig.plant.set_grounded(false);
    rig.step();
    assert_eq!(rig.state(), VehicleState::Idle);
    assert_relative_eq!(rig.plant.command().drive_torque, 0.0);
    assert!(rig.controller.active_routine().is_none());

    // Landing while rolling keeps Idle until asked to accelerate
    rig.plant.set_grounded(true);
    rig.step();
    assert_eq!(rig.state(), VehicleState::Idle);
    assert_relative_eq!(rig.plant.speed(), speed, epsilon = 1e-9);

    rig.controller.request_accelerate();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Accelerating);
}

#[test]
fn test_speed_platform_shows_in_next_snapshot() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();
    let before = rig.plant.speed();

    rig.plant.enter_speed_platform(&SpeedPlatform::default());
    rig.step();
    assert_relative_eq!(rig.controller.snapshot().speed, before * 1.15, epsilon = 1e-9);
}

#[test]
fn test_pinned_reverse_is_reported() {
    let mut rig = Rig::new();
    rig.step();
    rig.controller.request_brake_or_reverse();
    rig.step();

    rig.plant.force_rear_spin(Some(-800.0));
    rig.run(200);
    assert_eq!(rig.state(), VehicleState::MovingBack);
    assert!(rig.controller.reverse_pinned());
    assert_relative_eq!(rig.plant.command().drive_torque, 0.0);
}

#[test]
fn test_brake_or_reverse_brakes_a_reversing_car() {
    let mut rig = Rig::new();
    rig.step();
    rig.controller.request_brake_or_reverse();
    rig.run(200);
    assert_eq!(rig.state(), VehicleState::MovingBack);
    assert!(rig.plant.velocity().x < -2.9);

    rig.controller.request_brake_or_reverse();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Braking);

    let mut ticks = 0;
    while rig.state() != VehicleState::Stopped {
        rig.step();
        ticks += 1;
        assert!(ticks <= 205, "braking window overran");
    }
    assert!(rig.plant.command().is_locked());
    assert!(rig.plant.speed() < 1e-6);
}

#[test]
fn test_reverse_after_wall_hit_works_off_forward_roll() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();
    rig.plant.set_body_velocity(Vector3::new(8.0, 0.0, 0.0));
    rig.plant.force_rear_spin(Some(900.0));
    rig.plant.report_collision(ObstacleKind::Static);
    rig.step();
    assert_eq!(rig.state(), VehicleState::Stopped);
    assert!(rig.plant.velocity().x > 7.0);

    rig.plant.force_rear_spin(None);
    rig.controller.request_brake_or_reverse();
    rig.step();
    assert_eq!(rig.state(), VehicleState::MovingBack);

    let mut previous = rig.plant.velocity().x;
    for _ in 0..800 {
        rig.step();
        let vx = rig.plant.velocity().x;
        assert!(vx <= previous + 1e-12, "reverse let the car roll forward");
        previous = vx;
    }
    assert_eq!(rig.state(), VehicleState::MovingBack);
    assert!(rig.plant.velocity().x < 0.0);
    assert_relative_eq!(rig.plant.speed(), rig.controller.config().move_back_speed, epsilon = 0.05);
}

#[test]
fn test_steering_never_nudges_an_idle_car() {
    let mut rig = Rig::new();
    rig.drive_to_cruise();
    rig.controller.request_stop_accelerating();
    rig.step();
    assert_eq!(rig.state(), VehicleState::Idle);

    let vx = rig.plant.velocity().x;
    rig.plant.set_body_velocity(Vector3::new(vx, 1.5, 0.0));
    rig.plant.clear_write_log();

    for _ in 0..20 {
        rig.controller.set_steering(0.0);
        rig.step();
        assert_eq!(rig.plant.velocity().y, 1.5);
    }
    assert_relative_eq!(rig.plant.steer_angle(), 0.0);

    rig.controller.set_steering(1.0);
    rig.run(20);
    assert_eq!(rig.state(), VehicleState::Idle);
    assert_eq!(rig.plant.velocity().y, 1.5);
    assert!(rig.plant.write_log().iter().all(|r| r.writer != Writer::Steering));
}

#[test]
fn test_collision_needs_rpm_above_threshold() {
    let mut rig = Rig::with_config(VehicleConfig::default().with_stall_rpm_threshold(900.0));
    rig.controller.request_move();
    rig.run(50);

    rig.plant.force_rear_spin(Some(900.0));
    rig.plant.report_collision(ObstacleKind::Static);
    rig.step();
    assert_eq!(rig.state(), VehicleState::Moving);

    rig.plant.force_rear_spin(Some(900.5));
    rig.plant.report_collision(ObstacleKind::Static);
    rig.step();
    assert_eq!(rig.state(), VehicleState::Stopped);
}

#[test]
fn test_fixed_stepper_drives_rig() {
    let mut controller = VehicleController::new(VehicleConfig::default()).unwrap();
    let mut plant = VehiclePlant::default();
    let mut stepper = FixedStepper::new(1.0 / 60.0);

    controller.request_move();
    // Ten 100 ms frames of wall-clock time
    for _ in 0..10 {
        stepper.step(0.1, |ctx| {
            controller.tick(ctx, &mut plant);
            plant.step(ctx);
        });
    }
    assert!(stepper.ticks() >= 59);
    assert_eq!(controller.ticks(), stepper.ticks());
    assert_eq!(controller.state(), VehicleState::Moving);
    assert!(plant.speed() > 1.0);

    controller.reset();
    plant.reset();
    assert_eq!(controller.state(), VehicleState::Idle);
    assert!(plant.write_log().is_empty());
}
