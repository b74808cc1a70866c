//! Logging System
//!
//! Leveled CLI logging on top of `tracing`. Events are rendered by
//! [`CliEventFormat`] as `program: [command: ]LEVEL: text`, one prefix per line,
//! errors on stderr and everything else on stdout. A JSON format is available
//! for machine consumption.

use crate::error::CliError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::field::{Field, Visit};
use tracing::{debug, Event, Subscriber};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log levels with their numeric thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace = 0,
    Debug = 10,
    Info = 20,
    Warn = 30,
    Error = 40,
}

impl Level {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Upper-case label used in CLI prefixes.
    pub fn label(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" | "0" => Ok(Level::Trace),
            "debug" | "10" => Ok(Level::Debug),
            "info" | "20" => Ok(Level::Info),
            "warn" | "warning" | "30" => Ok(Level::Warn),
            "error" | "40" => Ok(Level::Error),
            _ => Err(format!(
                "Invalid log level: {s}. Must be one of: trace, debug, info, warn, error (or 0, 10, 20, 30, 40)"
            )),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Threshold: trace, debug, info, warn, error (or the numeric values)
    pub level: String,

    /// Output format: cli, json
    pub format: String,

    /// Destination for json output: stdout, stderr, file
    pub output: String,

    /// Log file path when output is "file"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Module-specific directives (json format only)
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "cli".to_string(),
            output: "stderr".to_string(),
            file: None,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    pub fn threshold(&self) -> Result<Level, CliError> {
        self.level.parse().map_err(CliError::Logging)
    }
}

/// Program and sub-command names stamped on every CLI log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub program: String,
    pub sub_command: Option<String>,
}

impl LogContext {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            sub_command: None,
        }
    }

    pub fn with_sub_command(mut self, name: impl Into<String>) -> Self {
        self.sub_command = Some(name.into());
        self
    }
}

/// A log event reduced to what the CLI formatter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub text: String,
    /// Raw program output: never prefixed, never filtered.
    pub printed: bool,
}

/// Event formatter producing prefixed CLI text.
#[derive(Debug, Clone)]
pub struct CliEventFormat {
    context: LogContext,
    threshold: Level,
}

impl CliEventFormat {
    pub fn new(context: LogContext, threshold: Level) -> Self {
        Self { context, threshold }
    }

    pub fn threshold(&self) -> Level {
        self.threshold
    }

    pub fn is_logworthy(&self, record: &LogRecord) -> bool {
        record.printed || record.level >= self.threshold
    }

    /// Whether a record belongs on stderr rather than stdout.
    pub fn is_error_stream(record: &LogRecord) -> bool {
        record.level >= Level::Error
    }

    pub fn prefix(&self, record: &LogRecord) -> String {
        if record.printed {
            return String::new();
        }
        let mut prefix = format!("{}: ", self.context.program);
        if let Some(sub) = &self.context.sub_command {
            prefix.push_str(sub);
            prefix.push_str(": ");
        }
        prefix.push_str(record.level.label());
        prefix.push_str(": ");
        prefix
    }

    /// Prefix every line of the record's text and terminate with a newline.
    pub fn format_text(&self, record: &LogRecord) -> String {
        let prefix = self.prefix(record);
        let mut out = String::with_capacity(record.text.len() + prefix.len() + 1);
        for (i, line) in record.text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&prefix);
            out.push_str(line);
        }
        out.push('\n');
        out
    }
}

impl<S, N> FormatEvent<S, N> for CliEventFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let record = LogRecord {
            level: Level::from(*event.metadata().level()),
            text: fields.text(),
            printed: fields.printed,
        };

        if !self.is_logworthy(&record) {
            return Ok(());
        }
        writer.write_str(&self.format_text(&record))
    }
}

#[derive(Default)]
struct EventFields {
    message: String,
    extra: Vec<(&'static str, String)>,
    printed: bool,
}

impl EventFields {
    fn text(&self) -> String {
        let mut text = self.message.clone();
        for (name, value) in &self.extra {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(name);
            text.push('=');
            text.push_str(value);
        }
        text
    }
}

impl Visit for EventFields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "printed" {
            self.printed = value;
        } else {
            self.extra.push((field.name(), value.to_string()));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.extra.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.extra.push((field.name(), format!("{:?}", value)));
        }
    }
}

/// Build the CLI layer over explicit stdout/stderr writers.
///
/// ERROR events go to `err`, everything else to `out`.
pub fn cli_layer<S, O, E>(
    context: LogContext,
    threshold: Level,
    out: O,
    err: E,
) -> impl tracing_subscriber::Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    O: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tfmt::layer()
        .event_format(CliEventFormat::new(context, threshold))
        .with_writer(err.with_max_level(tracing::Level::ERROR).or_else(out))
}

/// Initialize the global logging subscriber.
///
/// Priority order for filtering (highest to lowest):
/// 1. `JERSEY_LOG` environment variable (json format only)
/// 2. Configuration (`level`, `modules`)
/// 3. Defaults
///
/// The cli format ignores `JERSEY_LOG`: its formatter applies the threshold,
/// and an outer filter would drop printed output.
pub fn init_logging(config: &LoggingConfig, context: LogContext) -> Result<(), CliError> {
    let threshold = config.threshold()?;

    match config.format.as_str() {
        "cli" => {
            let filter = config_filter(config, Level::Trace)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(cli_layer(
                    context.clone(),
                    threshold,
                    std::io::stdout,
                    std::io::stderr,
                ))
                .try_init()
                .map_err(|e| CliError::Logging(e.to_string()))?;
        }
        "json" => {
            let filter = build_env_filter(config, threshold)?;
            let base = tracing_subscriber::registry().with(filter);
            let layer = tfmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339());
            let installed = match config.output.as_str() {
                "stdout" => base.with(layer.with_writer(std::io::stdout)).try_init(),
                "stderr" => base.with(layer.with_writer(std::io::stderr)).try_init(),
                "file" => {
                    let file = open_log_file(config)?;
                    base.with(layer.with_writer(std::sync::Mutex::new(file)))
                        .try_init()
                }
                other => {
                    return Err(CliError::Logging(format!(
                        "Invalid log output: {} (must be 'stdout', 'stderr', or 'file')",
                        other
                    )))
                }
            };
            installed.map_err(|e| CliError::Logging(e.to_string()))?;
        }
        other => {
            return Err(CliError::Logging(format!(
                "Invalid log format: {} (must be 'cli' or 'json')",
                other
            )))
        }
    }

    debug!(program = %context.program, "Starting logging for {}", context.program);
    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> Result<std::fs::File, CliError> {
    let path = config
        .file
        .clone()
        .ok_or_else(|| CliError::Logging("Log output 'file' requires a log file path".into()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::Logging(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| CliError::Logging(format!("Failed to open log file {:?}: {}", path, e)))
}

/// Build environment filter from `JERSEY_LOG` or the configuration.
fn build_env_filter(config: &LoggingConfig, base: Level) -> Result<EnvFilter, CliError> {
    match EnvFilter::try_from_env("JERSEY_LOG") {
        Ok(filter) => Ok(filter),
        Err(_) => config_filter(config, base),
    }
}

/// Filter at `base` plus the configured per-module levels.
fn config_filter(config: &LoggingConfig, base: Level) -> Result<EnvFilter, CliError> {
    let mut filter = EnvFilter::new(base.directive());
    for (module, module_level) in &config.modules {
        let directive = format!("{}={}", module, module_level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| CliError::Logging(format!("Invalid log directive: {}", e)))?,
        );
    }
    Ok(filter)
}
