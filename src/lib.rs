//! Runs a command interactively inside a container of an ECS service with ECS
//! Exec. A service that is scaled to zero gets started for the session and is
//! stopped again afterwards.
//!
//! The work is a fixed list of [steps::Step]s driven by a [Runner] over one
//! [ExecContext]. Everything remote goes through [gateway::EcsGateway], which
//! is implemented for AWS in [aws].

pub mod aws;
pub mod cli;
mod command;
mod command_runner;
mod context;
mod error;
pub mod gateway;
mod interrupt;
mod runner;
pub mod session;
pub mod steps;
mod wait;

pub use command::*;
pub use command_runner::*;
pub use context::*;
pub use error::*;
pub use interrupt::*;
pub use runner::*;
/// This reexport helps with dependency wrangling
pub use stacked_errors;
pub use wait::*;
