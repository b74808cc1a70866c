//! Configuration System
//!
//! Settings for the logging layer and the command runner, layered from
//! built-in defaults, the user's config file and `JERSEY_*` environment
//! variables (highest priority).

use crate::cli::exit;
use crate::error::CliError;
use crate::logging::LoggingConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment overrides, e.g. `JERSEY_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "JERSEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JerseyConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Exit status policy of the command runner
    pub runner: RunnerConfig,
}

/// Exit codes used by the command runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Status for failures that are not explicit exits
    pub software_error_code: i32,

    /// Status for unknown or missing sub-commands
    pub usage_error_code: i32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            software_error_code: exit::EX_SOFTWARE,
            usage_error_code: exit::EX_USAGE,
        }
    }
}

/// Loads [`JerseyConfig`] from its sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the configuration for `program`.
    ///
    /// Reads `<config dir>/<program>/config.toml` when it exists, then applies
    /// environment overrides.
    pub fn load(program: &str) -> Result<JerseyConfig, CliError> {
        let mut builder = Self::builder_with_defaults()?;
        if let Some(path) = Self::user_config_path(program) {
            if path.exists() {
                debug!(config_path = %path.display(), "Loading user configuration");
                builder = builder.add_source(File::from(path).required(false));
            }
        }
        Self::finish(builder)
    }

    /// Load the configuration from an explicit file, then apply environment overrides.
    pub fn load_from_file(path: &Path) -> Result<JerseyConfig, CliError> {
        if !path.exists() {
            return Err(CliError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let builder = Self::builder_with_defaults()?.add_source(File::from(path));
        Self::finish(builder)
    }

    /// Path of the per-user config file for `program`, if a home directory is known.
    pub fn user_config_path(program: &str) -> Option<PathBuf> {
        ProjectDirs::from("", "", program).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Render a configuration as TOML.
    pub fn render(config: &JerseyConfig) -> Result<String, CliError> {
        toml::to_string_pretty(config).map_err(|e| CliError::Config(e.to_string()))
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, CliError> {
        let defaults = JerseyConfig::default();
        Ok(Config::builder()
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default("logging.output", defaults.logging.output)?
            .set_default("runner.software_error_code", defaults.runner.software_error_code)?
            .set_default("runner.usage_error_code", defaults.runner.usage_error_code)?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<JerseyConfig, CliError> {
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
