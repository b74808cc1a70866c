//! Command runner: builds a command, drives it on the event loop and maps its
//! outcome to a process exit status.

use crate::cli::command::Command;
use crate::cli::event_loop::EventLoop;
use crate::cli::exit::{self, is_falsy, status_from_value};
use crate::cli::options::Configuration;
use crate::cli::signal::Completion;
use crate::config::RunnerConfig;
use crate::error::{CliError, CommandFailure};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

/// Runner lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Building,
    Starting,
    Running,
    Completing,
    Stopped,
}

/// Exit status for a command outcome.
///
/// Falsy values keep `current`; status integers (0..=255) replace it; other
/// values keep it too. Explicit exits use their code when it is a valid
/// status (0..=255); out-of-range exits and any other failure become
/// `software_error`.
pub fn exit_status(outcome: &Completion, current: i32, software_error: i32) -> i32 {
    match outcome {
        Ok(value) if is_falsy(value) => current,
        Ok(value) => status_from_value(value).unwrap_or(current),
        Err(CommandFailure::Exit(code)) if exit::is_status(*code) => *code,
        Err(_) => software_error,
    }
}

enum Target {
    Direct(Arc<Command>),
    Pluggable(Configuration),
}

/// Shared between the runner and the task it hands to the event loop.
struct RunState {
    exit_value: Mutex<i32>,
    state: Mutex<RunnerState>,
    stopped: AtomicBool,
}

impl RunState {
    fn set_state(&self, state: RunnerState) {
        *self.state.lock() = state;
    }

    fn set_exit_value(&self, value: i32) {
        debug!(exit_value = value, "Setting exit value");
        *self.exit_value.lock() = value;
    }
}

pub struct CommandRunner {
    name: String,
    target: Target,
    event_loop: Arc<dyn EventLoop>,
    settings: RunnerConfig,
    built: OnceLock<Arc<Command>>,
    run_state: Arc<RunState>,
}

impl CommandRunner {
    /// Run a command given at construction time.
    pub fn new(name: impl Into<String>, command: Arc<Command>, event_loop: Arc<dyn EventLoop>) -> Self {
        Self::with_target(name.into(), Target::Direct(command), event_loop)
    }

    /// Run the sub-command selected in `config`, built through its registry.
    pub fn pluggable(
        name: impl Into<String>,
        config: Configuration,
        event_loop: Arc<dyn EventLoop>,
    ) -> Self {
        Self::with_target(name.into(), Target::Pluggable(config), event_loop)
    }

    fn with_target(name: String, target: Target, event_loop: Arc<dyn EventLoop>) -> Self {
        Self {
            name,
            target,
            event_loop,
            settings: RunnerConfig::default(),
            built: OnceLock::new(),
            run_state: Arc::new(RunState {
                exit_value: Mutex::new(exit::EX_OK),
                state: Mutex::new(RunnerState::Idle),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn with_settings(mut self, settings: RunnerConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exit_value(&self) -> i32 {
        *self.run_state.exit_value.lock()
    }

    pub fn state(&self) -> RunnerState {
        *self.run_state.state.lock()
    }

    /// Resolve the command to run. Repeated calls return the same instance.
    pub fn build_command(&self) -> Result<Arc<Command>, CliError> {
        match &self.target {
            Target::Direct(command) => Ok(Arc::clone(command)),
            Target::Pluggable(config) => {
                if let Some(command) = self.built.get() {
                    return Ok(Arc::clone(command));
                }
                let command = Arc::new(Self::build_pluggable(config)?);
                Ok(Arc::clone(self.built.get_or_init(|| command)))
            }
        }
    }

    fn build_pluggable(config: &Configuration) -> Result<Command, CliError> {
        let name = config
            .sub_command()
            .ok_or_else(|| CliError::Usage("No command given".to_string()))?;
        let factory = config.get_command(name)?;
        let sub_config = config
            .sub_config()
            .cloned()
            .unwrap_or_else(|| Configuration::empty(config.program()));
        debug!(command = name, "Building command");
        factory.build_command(sub_config).map_err(|e| CliError::Build {
            name: name.to_string(),
            reason: format!("{:#}", e),
        })
    }

    /// Run the command to completion and return the process exit status.
    ///
    /// The event loop is stopped exactly once, after the exit value is set.
    pub fn run(&self) -> i32 {
        self.run_state.set_state(RunnerState::Building);
        let command = match self.build_command() {
            Ok(command) => command,
            Err(err) => {
                error!(program = %self.name, error = %err, "Failed to build command");
                let code = match err {
                    CliError::Usage(_) | CliError::NotFound(_) => self.settings.usage_error_code,
                    other => other.exit_code(),
                };
                self.run_state.set_exit_value(code);
                self.run_state.set_state(RunnerState::Stopped);
                return code;
            }
        };

        self.run_state.set_state(RunnerState::Starting);
        let task = Self::drive(
            self.name.clone(),
            command,
            Arc::clone(&self.event_loop),
            Arc::clone(&self.run_state),
            self.settings.software_error_code,
        );
        self.event_loop.run(Box::pin(task));

        self.run_state.set_state(RunnerState::Stopped);
        self.exit_value()
    }

    async fn drive(
        program: String,
        command: Arc<Command>,
        event_loop: Arc<dyn EventLoop>,
        run_state: Arc<RunState>,
        software_error: i32,
    ) {
        debug!(program = %program, command = command.name(), "Starting command");

        let started = command
            .start_with(|| run_state.set_state(RunnerState::Running))
            .await;
        if let Err(err) = started {
            error!(program = %program, error = %err, "Command could not start");
            run_state.set_exit_value(software_error);
            Self::stop_loop(&event_loop, &run_state);
            return;
        }

        let outcome = command.exit().wait().await;
        run_state.set_state(RunnerState::Completing);

        match &outcome {
            Ok(value) => debug!(program = %program, value = %value, "Completed execution"),
            Err(CommandFailure::Exit(code)) if exit::is_status(*code) => {
                info!(program = %program, code = *code, "Command requested exit")
            }
            Err(CommandFailure::Exit(code)) => {
                warn!(program = %program, code = *code, "Exit status out of range")
            }
            Err(failure) => error!(program = %program, error = %failure, "Command failed"),
        }

        let current = *run_state.exit_value.lock();
        run_state.set_exit_value(exit_status(&outcome, current, software_error));
        command.stop().await;
        Self::stop_loop(&event_loop, &run_state);
    }

    fn stop_loop(event_loop: &Arc<dyn EventLoop>, run_state: &RunState) {
        if !run_state.stopped.swap(true, Ordering::SeqCst) {
            event_loop.stop();
        }
    }
}
