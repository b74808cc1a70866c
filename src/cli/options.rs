//! Options: argument parsing into a [`Configuration`], with optional pluggable
//! sub-commands resolved through a [`CommandRegistry`].

use crate::cli::registry::{CommandFactory, CommandRegistry};
use crate::error::CliError;
use crate::inet::IpAddress;
use crate::logging::Level;
use clap::{Arg, ArgAction, ArgMatches};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

const LOG_LEVEL: &str = "log_level";
const VERBOSE: &str = "verbose";

/// Name of the running program, from the first process argument.
pub fn program_from_args() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// Command-line options schema.
#[derive(Debug, Default)]
pub struct Options {
    program: Option<String>,
    about: Option<String>,
    version: Option<String>,
    args: Vec<Arg>,
    registry: Option<Arc<CommandRegistry>>,
    default_sub_command: Option<String>,
}

impl Options {
    /// Options for `program`; `None` uses the process's own name.
    pub fn new(program: Option<&str>) -> Self {
        Self {
            program: program.map(str::to_string),
            ..Self::default()
        }
    }

    /// Options whose sub-commands come from `registry`.
    pub fn pluggable(program: Option<&str>, registry: CommandRegistry) -> Self {
        Self {
            registry: Some(Arc::new(registry)),
            ..Self::new(program)
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a program-level option.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Sub-command used when none is given.
    pub fn default_sub_command(mut self, name: impl Into<String>) -> Self {
        self.default_sub_command = Some(name.into());
        self
    }

    pub fn program(&self) -> String {
        self.program.clone().unwrap_or_else(program_from_args)
    }

    pub fn registry(&self) -> Option<&Arc<CommandRegistry>> {
        self.registry.as_ref()
    }

    pub fn synopsis(&self) -> String {
        format!("Usage: {} [options]", self.program())
    }

    /// Parse an IP address option value, rejecting bad input as a usage error.
    pub fn parse_ip(addr: &str) -> Result<IpAddress, CliError> {
        IpAddress::parse(addr).map_err(|_| CliError::Usage(format!("Not an IP address: {}", addr)))
    }

    /// Build the clap command for this schema.
    pub fn command(&self) -> clap::Command {
        let program = self.program();
        let mut cmd = clap::Command::new(program.clone())
            .override_usage(format!("{} [options]", program))
            .arg(
                Arg::new(LOG_LEVEL)
                    .long("log-level")
                    .value_name("LEVEL")
                    .value_parser(|s: &str| s.parse::<Level>())
                    .help("Log threshold (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new(VERBOSE)
                    .short('v')
                    .long("verbose")
                    .action(ArgAction::SetTrue)
                    .help("Log at debug level"),
            );

        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        if let Some(version) = &self.version {
            cmd = cmd.version(version.clone());
        }
        for arg in &self.args {
            cmd = cmd.arg(arg.clone());
        }

        if let Some(registry) = &self.registry {
            for factory in registry.commands() {
                cmd = cmd.subcommand(sub_command_schema(&program, factory.as_ref()));
            }
            cmd = cmd
                .subcommand_help_heading("Commands")
                .subcommand_required(self.default_sub_command.is_none());
        }
        cmd
    }

    /// Render the help text.
    pub fn usage(&self) -> String {
        self.command().render_help().to_string()
    }

    /// Parse arguments (excluding the program name).
    pub fn parse_args<I, T>(&self, args: I) -> Result<Configuration, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let program = self.program();
        let argv = std::iter::once(OsString::from(&program)).chain(args.into_iter().map(Into::into));
        let matches = self.command().try_get_matches_from(argv)?;

        let log_level = match matches.get_one::<Level>(LOG_LEVEL) {
            Some(level) => Some(*level),
            None if matches.get_flag(VERBOSE) => Some(Level::Debug),
            None => None,
        };

        let sub = match matches.subcommand() {
            Some((name, sub_matches)) => Some(Configuration {
                program: program.clone(),
                command_path: vec![name.to_string()],
                matches: sub_matches.clone(),
                sub_command: None,
                sub_config: None,
                log_level,
                registry: None,
            }),
            None => self.default_sub_config(&program, log_level)?,
        };

        Ok(Configuration {
            program,
            command_path: Vec::new(),
            matches,
            sub_command: sub.as_ref().and_then(|s| s.command_path.last().cloned()),
            sub_config: sub.map(Box::new),
            log_level,
            registry: self.registry.clone(),
        })
    }

    /// Parse the current process's arguments.
    pub fn parse_env(&self) -> Result<Configuration, CliError> {
        self.parse_args(std::env::args_os().skip(1))
    }

    fn default_sub_config(
        &self,
        program: &str,
        log_level: Option<Level>,
    ) -> Result<Option<Configuration>, CliError> {
        let (Some(registry), Some(name)) = (&self.registry, &self.default_sub_command) else {
            return Ok(None);
        };
        let factory = registry.get_command(name)?;
        let matches = sub_command_schema(program, factory.as_ref())
            .try_get_matches_from([name.as_str()])?;
        Ok(Some(Configuration {
            program: program.to_string(),
            command_path: vec![name.clone()],
            matches,
            sub_command: None,
            sub_config: None,
            log_level,
            registry: None,
        }))
    }
}

fn sub_command_schema(program: &str, factory: &dyn CommandFactory) -> clap::Command {
    let mut schema = factory
        .options()
        .name(factory.name().to_string())
        .about(factory.description().to_string())
        .override_usage(format!("{} {} [options]", program, factory.name()));
    if let Some(shortcut) = factory.shortcut() {
        schema = schema.visible_alias(shortcut.to_string());
    }
    schema
}

/// Parsed options. Immutable once parsing completes.
#[derive(Debug, Clone)]
pub struct Configuration {
    program: String,
    command_path: Vec<String>,
    matches: ArgMatches,
    sub_command: Option<String>,
    sub_config: Option<Box<Configuration>>,
    log_level: Option<Level>,
    registry: Option<Arc<CommandRegistry>>,
}

impl Configuration {
    /// A configuration with no parsed options.
    pub fn empty(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            command_path: Vec::new(),
            matches: ArgMatches::default(),
            sub_command: None,
            sub_config: None,
            log_level: None,
            registry: None,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Name of the selected sub-command, if any.
    pub fn sub_command(&self) -> Option<&str> {
        self.sub_command.as_deref()
    }

    /// Parsed options of the selected sub-command.
    pub fn sub_config(&self) -> Option<&Configuration> {
        self.sub_config.as_deref()
    }

    pub fn log_level(&self) -> Option<Level> {
        self.log_level
    }

    /// Logging threshold; WARN unless set on the command line.
    pub fn threshold(&self) -> Level {
        self.log_level.unwrap_or(Level::Warn)
    }

    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    pub fn synopsis(&self) -> String {
        let mut synopsis = format!("Usage: {}", self.program);
        for name in &self.command_path {
            synopsis.push(' ');
            synopsis.push_str(name);
        }
        synopsis.push_str(" [options]");
        synopsis
    }

    /// Typed value of an option; `None` if absent or not defined.
    pub fn get<T>(&self, id: &str) -> Option<&T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.matches.try_get_one::<T>(id).ok().flatten()
    }

    /// Whether a boolean flag was set.
    pub fn flag(&self, id: &str) -> bool {
        self.get::<bool>(id).copied().unwrap_or(false)
    }

    /// Look up a sub-command factory in the registry this configuration was parsed with.
    pub fn get_command(&self, name: &str) -> Result<Arc<dyn CommandFactory>, CliError> {
        match &self.registry {
            Some(registry) => registry.get_command(name),
            None => Err(CliError::NotFound(name.to_string())),
        }
    }

    pub fn registry(&self) -> Option<&Arc<CommandRegistry>> {
        self.registry.as_ref()
    }
}
