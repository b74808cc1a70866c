//! CLI domain: options, sub-command registry, command lifecycle and the runner
//! that turns a command's outcome into a process exit status.

pub mod command;
pub mod event_loop;
pub mod exit;
pub mod options;
pub mod registry;
pub mod runner;
pub mod signal;

pub use command::{Command, Execute, Lifecycle, Service};
pub use event_loop::{EventLoop, TokioEventLoop};
pub use options::{Configuration, Options};
pub use registry::{CommandFactory, CommandRegistry, PluginSource, StaticPlugins};
pub use runner::{exit_status, CommandRunner, RunnerState};
pub use signal::{Completion, ExitSignal};

use crate::config::JerseyConfig;
use crate::error::CliError;
use crate::logging::{init_logging, LogContext};
use std::ffi::OsString;
use std::sync::Arc;

/// Parse `args`, set up logging and run the selected sub-command.
///
/// Returns the process exit status. Help and version text go to stdout with
/// status 0; parse errors go to stderr.
pub fn run_main<I, T>(options: &Options, settings: &JerseyConfig, args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let config = match options.parse_args(args) {
        Ok(config) => config,
        Err(err) if err.is_display() => {
            print!("{}", err);
            return exit::EX_OK;
        }
        Err(err) => {
            eprintln!("{}", err.to_string().trim_end());
            return failure_code(&err, settings);
        }
    };

    let mut logging = settings.logging.clone();
    if let Some(level) = config.log_level() {
        logging.level = level.to_string();
    }
    let mut context = LogContext::new(config.program());
    if let Some(sub) = config.sub_command() {
        context = context.with_sub_command(sub);
    }
    if let Err(err) = init_logging(&logging, context) {
        eprintln!("{}: {}", config.program(), err);
        return err.exit_code();
    }

    let event_loop = match TokioEventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            tracing::error!(error = %err, "Failed to start runtime");
            return settings.runner.software_error_code;
        }
    };

    let program = config.program().to_string();
    CommandRunner::pluggable(program, config, Arc::new(event_loop))
        .with_settings(settings.runner.clone())
        .run()
}

fn failure_code(err: &CliError, settings: &JerseyConfig) -> i32 {
    match err {
        CliError::Usage(_) | CliError::NotFound(_) => settings.runner.usage_error_code,
        other => other.exit_code(),
    }
}
