//! Motion control for a rear-driven four-wheel vehicle
//!
//! This crate provides:
//! - A tick-driven vehicle state machine resolving driver intents
//! - Locomotion routines (launch ramp, cruise governor, brake decay, reverse creep)
//! - Steering with lateral grip correction
//! - Validated, JSON-loadable tuning parameters

pub mod config;
pub mod controller;
pub mod routines;
pub mod sampler;
pub mod state;
pub mod steering;

pub use config::*;
pub use controller::*;
pub use routines::{LocomotionRoutine, RoutineExit, RoutineHandle};
pub use sampler::*;
pub use state::*;
pub use steering::*;
