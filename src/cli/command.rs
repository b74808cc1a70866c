//! Command: a unit of CLI work owning child services and one completion signal.

use crate::cli::options::Configuration;
use crate::cli::signal::{Completion, ExitSignal};
use crate::error::{CliError, CommandFailure};
use anyhow::Context;
use async_trait::async_trait;
use futures::future::try_join_all;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// A child service started before its command executes.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> anyhow::Result<()>;

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The work a command performs.
///
/// Return a value to succeed, `CommandFailure::Exit(code)` to end the process
/// with a specific status, or any other failure to report an error.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, config: &Configuration) -> Result<Value, CommandFailure>;
}

/// Lifecycle of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Starting,
    Executing,
    Completed,
    Stopped,
}

pub struct Command {
    name: String,
    config: Configuration,
    services: Vec<Arc<dyn Service>>,
    task: Box<dyn Execute>,
    exit: ExitSignal,
    state: Mutex<Lifecycle>,
}

impl Command {
    pub fn new(name: impl Into<String>, config: Configuration, task: impl Execute + 'static) -> Self {
        Self {
            name: name.into(),
            config,
            services: Vec::new(),
            task: Box::new(task),
            exit: ExitSignal::new(),
            state: Mutex::new(Lifecycle::Created),
        }
    }

    /// Add a child service; children start in the order they were added.
    pub fn with_service(mut self, service: Arc<dyn Service>) -> Self {
        self.services.push(service);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn services(&self) -> &[Arc<dyn Service>] {
        &self.services
    }

    /// The completion signal, resolved with the outcome of execution.
    pub fn exit(&self) -> &ExitSignal {
        &self.exit
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.state.lock()
    }

    fn set_lifecycle(&self, state: Lifecycle) {
        *self.state.lock() = state;
    }

    /// Start child services concurrently, then execute once.
    ///
    /// If any child fails to start, execution is skipped and the completion
    /// signal carries that failure. A second call is rejected and leaves the
    /// signal untouched.
    pub async fn start(&self) -> Result<(), CliError> {
        self.start_with(|| ()).await
    }

    /// Like [`Command::start`], calling `on_execute` after every child has
    /// started and right before execution. Not called when execution is skipped.
    pub async fn start_with(&self, on_execute: impl FnOnce() + Send) -> Result<(), CliError> {
        {
            let mut state = self.state.lock();
            if *state != Lifecycle::Created {
                return Err(CliError::AlreadyStarted(self.name.clone()));
            }
            *state = Lifecycle::Starting;
        }

        debug!(command = %self.name, services = self.services.len(), "Starting command services");
        let starts = self.services.iter().map(|svc| async move {
            debug!(command = %self.name, service = svc.name(), "Starting service");
            svc.start()
                .await
                .with_context(|| format!("Service failed to start: {}", svc.name()))
        });

        let started = AssertUnwindSafe(try_join_all(starts))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(payload)));
        if let Err(err) = started {
            let detail = format!("{:#}", err);
            warn!(command = %self.name, error = %detail, "Command services failed to start");
            self.complete(Err(CommandFailure::from(err)));
            return Ok(());
        }

        self.set_lifecycle(Lifecycle::Executing);
        on_execute();
        debug!(command = %self.name, "Executing command");
        let outcome = AssertUnwindSafe(self.task.execute(&self.config))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(CommandFailure::from(panic_error(payload))));
        self.complete(outcome);
        Ok(())
    }

    /// Stop child services in reverse start order. Failures are logged.
    pub async fn stop(&self) {
        for svc in self.services.iter().rev() {
            if let Err(err) = svc.stop().await {
                warn!(command = %self.name, service = svc.name(), error = %err, "Service failed to stop");
            }
        }
        self.set_lifecycle(Lifecycle::Stopped);
    }

    fn complete(&self, outcome: Completion) {
        self.set_lifecycle(Lifecycle::Completed);
        if !self.exit.resolve(outcome) {
            warn!(command = %self.name, "Completion signal already resolved");
        }
    }
}

/// Turn a caught panic into an execution error.
fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    anyhow::anyhow!("panicked: {}", message)
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("services", &self.services.len())
            .field("state", &self.lifecycle())
            .field("exit", &self.exit)
            .finish()
    }
}
