//! Command modules for the vhxt CLI.
//!
//! Each subcommand lives in its own file with an `*Args` struct, a command
//! handler that returns its result, and a `run_*` function that prints it.

pub mod common;

pub mod leak;
pub mod modes;
pub mod stress;

pub use leak::{run_leak, LeakArgs};
pub use modes::{run_modes, ModesArgs};
pub use stress::{run_stress, StressArgs};
