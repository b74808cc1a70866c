//! Runner outcome mapping for directly supplied commands.

use super::test_utils::{scripted, CountingLoop, Script, SharedBuffer};
use async_trait::async_trait;
use jersey::cli::RunnerState;
use jersey::logging::{cli_layer, Level, LogContext};
use jersey::{
    Command, CommandFailure, CommandRunner, Configuration, Execute, RunnerConfig, Service,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::layer::SubscriberExt;

fn run(script: Script) -> (i32, usize) {
    let (command, _) = scripted("work", script);
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::new("prog", Arc::new(command), event_loop.clone());
    let code = runner.run();
    assert_eq!(runner.state(), RunnerState::Stopped);
    assert_eq!(runner.exit_value(), code);
    (code, event_loop.stops())
}

#[test]
fn test_explicit_exit_code_is_used() {
    assert_eq!(run(Script::Now(Err(CommandFailure::Exit(78)))), (78, 1));
}

#[test]
fn test_async_explicit_exit_code_is_used() {
    assert_eq!(run(Script::Later(Err(CommandFailure::Exit(2)))), (2, 1));
}

#[test]
fn test_arbitrary_error_is_software_error() {
    assert_eq!(run(Script::Now(Err(CommandFailure::msg("exotic")))), (70, 1));
    assert_eq!(run(Script::Later(Err(CommandFailure::msg("exotic")))), (70, 1));
}

#[test]
fn test_truthy_values_succeed() {
    for value in [json!(true), json!("ok"), json!([1]), json!({"a": 1})] {
        assert_eq!(run(Script::Now(Ok(value))), (0, 1));
    }
}

#[test]
fn test_falsy_values_succeed() {
    for value in [Value::Null, json!(false), json!(""), json!([]), json!({})] {
        assert_eq!(run(Script::Later(Ok(value))), (0, 1));
    }
}

#[test]
fn test_integer_value_is_exit_code() {
    assert_eq!(run(Script::Now(Ok(json!(3)))), (3, 1));
    assert_eq!(run(Script::Now(Ok(json!(0)))), (0, 1));
    assert_eq!(run(Script::Now(Ok(json!(-1)))), (0, 1));
}

#[test]
fn test_configured_software_error_code() {
    let (command, _) = scripted("work", Script::Now(Err(CommandFailure::msg("exotic"))));
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::new("prog", Arc::new(command), event_loop.clone())
        .with_settings(RunnerConfig {
            software_error_code: 1,
            ..RunnerConfig::default()
        });
    assert_eq!(runner.run(), 1);
    assert_eq!(event_loop.stops(), 1);
}

#[test]
fn test_command_started_elsewhere_is_software_error() {
    let (command, calls) = scripted("work", Script::Now(Ok(json!(true))));
    let command = Arc::new(command);
    let first = CommandRunner::new("prog", Arc::clone(&command), CountingLoop::new());
    assert_eq!(first.run(), 0);

    let event_loop = CountingLoop::new();
    let second = CommandRunner::new("prog", command, event_loop.clone());
    assert_eq!(second.run(), 70);
    assert_eq!(event_loop.stops(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_error_is_logged_at_error_level() {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let subscriber = tracing_subscriber::registry().with(cli_layer(
        LogContext::new("prog"),
        Level::Warn,
        out.clone(),
        err.clone(),
    ));

    let (command, _) = scripted("work", Script::Now(Err(CommandFailure::msg("exotic"))));
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::new("prog", Arc::new(command), event_loop.clone());
    let code = tracing::subscriber::with_default(subscriber, || runner.run());

    assert_eq!(code, 70);
    assert_eq!(event_loop.stops(), 1);
    let logged = err.contents();
    assert!(logged.starts_with("prog: ERROR: "), "{}", logged);
    assert!(logged.contains("exotic"), "{}", logged);
    assert_eq!(out.contents(), "");
}

#[test]
fn test_out_of_range_exit_is_software_error() {
    assert_eq!(run(Script::Now(Err(CommandFailure::Exit(256)))), (70, 1));
    assert_eq!(run(Script::Later(Err(CommandFailure::Exit(-2)))), (70, 1));
    assert_eq!(run(Script::Now(Err(CommandFailure::Exit(255)))), (255, 1));
}

struct Explodes;

#[async_trait]
impl Execute for Explodes {
    async fn execute(&self, _config: &Configuration) -> Result<Value, CommandFailure> {
        panic!("execute exploded");
    }
}

#[test]
fn test_panicking_execute_is_software_error() {
    let command = Arc::new(Command::new("work", Configuration::empty("prog"), Explodes));
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::new("prog", Arc::clone(&command), event_loop.clone());

    assert_eq!(runner.run(), 70);
    assert_eq!(event_loop.stops(), 1);
    assert_eq!(runner.state(), RunnerState::Stopped);
    match command.exit().peek() {
        Some(Err(failure)) => assert!(failure.to_string().contains("execute exploded")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

struct ExplodingService;

#[async_trait]
impl Service for ExplodingService {
    fn name(&self) -> &str {
        "listener"
    }

    async fn start(&self) -> anyhow::Result<()> {
        panic!("listener exploded");
    }
}

#[test]
fn test_panicking_service_is_software_error() {
    let (command, calls) = scripted("work", Script::Now(Ok(json!(true))));
    let command = Arc::new(command.with_service(Arc::new(ExplodingService)));
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::new("prog", Arc::clone(&command), event_loop.clone());

    assert_eq!(runner.run(), 70);
    assert_eq!(event_loop.stops(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(matches!(command.exit().peek(), Some(Err(_))));
}

type RunnerSlot = Arc<OnceLock<Arc<CommandRunner>>>;

fn observed_state(slot: &RunnerSlot) -> Option<RunnerState> {
    slot.get().map(|runner| runner.state())
}

/// Records the runner state seen while services start and while executing.
struct StateRecorder {
    slot: RunnerSlot,
    seen: Arc<Mutex<Vec<(&'static str, Option<RunnerState>)>>>,
}

#[async_trait]
impl Service for StateRecorder {
    fn name(&self) -> &str {
        "observer"
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.seen.lock().push(("service", observed_state(&self.slot)));
        Ok(())
    }
}

#[async_trait]
impl Execute for StateRecorder {
    async fn execute(&self, _config: &Configuration) -> Result<Value, CommandFailure> {
        self.seen.lock().push(("execute", observed_state(&self.slot)));
        Ok(json!(true))
    }
}

#[test]
fn test_runner_is_running_only_once_services_started() {
    let slot = RunnerSlot::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = |slot: &RunnerSlot| StateRecorder {
        slot: Arc::clone(slot),
        seen: Arc::clone(&seen),
    };
    let command = Command::new("work", Configuration::empty("prog"), observer(&slot))
        .with_service(Arc::new(observer(&slot)));
    let runner = Arc::new(CommandRunner::new("prog", Arc::new(command), CountingLoop::new()));
    assert!(slot.set(Arc::clone(&runner)).is_ok());

    assert_eq!(runner.run(), 0);
    assert_eq!(
        *seen.lock(),
        vec![
            ("service", Some(RunnerState::Starting)),
            ("execute", Some(RunnerState::Running)),
        ]
    );
}
