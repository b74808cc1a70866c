//! Error types for the Jersey command lifecycle toolkit.

use crate::cli::exit;
use std::sync::Arc;
use thiserror::Error;

/// CLI-level errors: everything that can go wrong before or around a command run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    /// Help or version text requested on the command line.
    #[error("{0}")]
    Display(String),

    #[error("Unknown command: {0}")]
    NotFound(String),

    #[error("Command already started: {0}")]
    AlreadyStarted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Failed to build command {name}: {reason}")]
    Build { name: String, reason: String },
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Display(_) => exit::EX_OK,
            CliError::Usage(_) | CliError::NotFound(_) => exit::EX_USAGE,
            CliError::Config(_) => exit::EX_CONFIG,
            CliError::AlreadyStarted(_) | CliError::Logging(_) | CliError::Build { .. } => {
                exit::EX_SOFTWARE
            }
        }
    }

    /// Help and version output belongs on stdout; everything else on stderr.
    pub fn is_display(&self) -> bool {
        matches!(self, CliError::Display(_))
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> Self {
        use clap::error::ErrorKind;
        let rendered = err.render().to_string();
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CliError::Display(rendered),
            _ => CliError::Usage(rendered),
        }
    }
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

/// Failure outcome of a command, carried by its completion signal.
///
/// Cloneable so every observer of the signal sees the same failure.
#[derive(Debug, Clone, Error)]
pub enum CommandFailure {
    /// Controlled termination with a specific process exit code.
    #[error("exit requested with status {0}")]
    Exit(i32),

    #[error("{0:#}")]
    Error(Arc<anyhow::Error>),
}

impl CommandFailure {
    /// Wrap an arbitrary error as an execution failure.
    pub fn error(err: impl Into<anyhow::Error>) -> Self {
        CommandFailure::Error(Arc::new(err.into()))
    }

    /// Shorthand for an ad-hoc failure message.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        CommandFailure::Error(Arc::new(anyhow::anyhow!("{}", message)))
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, CommandFailure::Exit(_))
    }

    /// Downcast the wrapped error, if any, to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            CommandFailure::Error(err) => err.downcast_ref::<E>(),
            CommandFailure::Exit(_) => None,
        }
    }
}

impl From<anyhow::Error> for CommandFailure {
    fn from(err: anyhow::Error) -> Self {
        CommandFailure::Error(Arc::new(err))
    }
}

impl From<CliError> for CommandFailure {
    fn from(err: CliError) -> Self {
        CommandFailure::error(err)
    }
}
