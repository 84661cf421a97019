//! Command-line interface for quartet
//!
//! - `args`: clap definitions
//! - `run`: entry point, config discovery and error reporting
//! - `commands`: command implementations

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands};
pub use run::run;
