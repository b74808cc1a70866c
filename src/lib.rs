//! Jersey: command lifecycle toolkit for async CLIs
//!
//! Pluggable sub-commands with a one-shot completion protocol, an exit-status
//! runner that stops its event loop exactly once, leveled CLI logging and a
//! typed IP address value for option validation.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod inet;
pub mod logging;

pub use cli::{
    run_main, Command, CommandFactory, CommandRegistry, CommandRunner, Configuration, Execute,
    Options, Service,
};
pub use config::{ConfigLoader, JerseyConfig, RunnerConfig};
pub use error::{CliError, CommandFailure};
pub use inet::IpAddress;
