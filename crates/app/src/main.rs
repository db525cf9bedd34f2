//! Drives the vehicle controller against the point-mass plant under a
//! timed script and prints the speed readout once per simulated second.
//!
//! Usage: `vehicle-demo [config.json] [script.json] [--verbose]`

mod script;

use std::path::PathBuf;

use control::{VehicleConfig, VehicleController};
use log::LevelFilter;
use mechanics::VehiclePlant;
use simcore::{FixedStepper, VehicleSensors};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use script::{DriveScript, ScriptPlayer};

const TICK_RATE: f64 = 60.0;
// Wall-clock frame fed to the stepper; several ticks fit in each
const FRAME_DT: f64 = 0.05;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/vehicle.json");
const DEFAULT_SCRIPT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/drive.json");

struct Args {
    config: PathBuf,
    script: PathBuf,
    verbose: bool,
}

fn parse_args() -> Args {
    let mut verbose = false;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--verbose" || arg == "-v" {
            verbose = true;
        } else {
            paths.push(PathBuf::from(arg));
        }
    }
    let mut paths = paths.into_iter();
    Args {
        config: paths.next().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
        script: paths.next().unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPT)),
        verbose,
    }
}

/// Whole meters per second, truncated like a dashboard readout
fn speed_readout(speed: f64) -> i64 {
    speed.trunc() as i64
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;

    let config = VehicleConfig::from_path(&args.config)?;
    let script = DriveScript::from_path(&args.script)?;
    log::info!(
        "loaded {} and {} ({:.1}s)",
        args.config.display(),
        args.script.display(),
        script.duration
    );

    let mut controller = VehicleController::new(config)?;
    let mut plant = VehiclePlant::default();
    let mut player = ScriptPlayer::new(script);
    let mut stepper = FixedStepper::new(1.0 / TICK_RATE);

    let mut next_readout = 0.0;
    while stepper.elapsed() < player.duration() {
        stepper.step(FRAME_DT, |ctx| {
            player.play_until(ctx.t, &mut controller, &mut plant);
            controller.tick(ctx, &mut plant);
            plant.step(ctx);

            if ctx.t >= next_readout {
                println!(
                    "{:>4.0}s  {:>3} m/s  {:?}",
                    ctx.t,
                    speed_readout(plant.speed()),
                    controller.state()
                );
                next_readout += 1.0;
            }
        });
    }

    log::info!(
        "finished after {} ticks in {:?}",
        stepper.ticks(),
        controller.state()
    );
    Ok(())
}
