//! Command-line interface for medscan.

mod commands;
pub mod helpers;
pub mod icons;

pub use commands::{load_config, run, Cli};
