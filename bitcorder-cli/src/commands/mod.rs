//! CLI command implementations

mod config;
mod run;

pub use config::{config, ConfigArgs};
pub use run::{run, RunArgs};
