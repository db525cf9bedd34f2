//! Shared simulation types for the vehicle controller
//!
//! This crate provides:
//! - The sensor and actuator boundary between controller and physics
//! - Simulation context and the `Model` reset trait
//! - A fixed-timestep stepper for driving ticks

mod stepper;
mod traits;

pub use stepper::*;
pub use traits::*;
