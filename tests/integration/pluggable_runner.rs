//! Pluggable dispatch: registry lookup, command building and end-to-end runs.

use super::test_utils::{CountingLoop, Script, ScriptedFactory};
use jersey::cli::{PluginSource, RunnerState, StaticPlugins};
use jersey::{CliError, CommandFactory, CommandRegistry, CommandRunner, Configuration, Options};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CountingSource {
    inner: StaticPlugins,
    scans: Arc<AtomicUsize>,
}

impl PluginSource for CountingSource {
    fn discover(&self) -> Vec<Arc<dyn CommandFactory>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.discover()
    }
}

fn plugins() -> StaticPlugins {
    StaticPlugins::new()
        .with(ScriptedFactory::new("alpha", Script::Now(Ok(json!("ok")))))
        .with(ScriptedFactory::new("beta", Script::Later(Ok(json!(true)))))
}

fn parse(args: &[&str]) -> Configuration {
    Options::pluggable(Some("prog"), CommandRegistry::new(plugins()))
        .parse_args(args.iter().copied())
        .unwrap()
}

#[test]
fn test_alpha_completes_with_ok() {
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::pluggable("prog", parse(&["alpha"]), event_loop.clone());

    assert_eq!(runner.run(), 0);
    assert_eq!(event_loop.stops(), 1);
    let command = runner.build_command().unwrap();
    assert_eq!(command.name(), "alpha");
    assert_eq!(command.exit().peek().unwrap().unwrap(), json!("ok"));
}

#[test]
fn test_beta_waits_for_pending_value() {
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::pluggable("prog", parse(&["beta"]), event_loop.clone());

    assert_eq!(runner.run(), 0);
    assert_eq!(event_loop.stops(), 1);
    let command = runner.build_command().unwrap();
    assert_eq!(command.exit().peek().unwrap().unwrap(), json!(true));
}

#[test]
fn test_build_is_cached() {
    let factory = ScriptedFactory::new("alpha", Script::Now(Ok(json!("ok"))));
    let builds = Arc::clone(&factory.builds);
    let options = Options::pluggable(
        Some("prog"),
        CommandRegistry::new(StaticPlugins::new().with(factory)),
    );
    let config = options.parse_args(["alpha"]).unwrap();
    let runner = CommandRunner::pluggable("prog", config, CountingLoop::new());

    let first = runner.build_command().unwrap();
    let second = runner.build_command().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    assert_eq!(runner.run(), 0);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_registry_lookup_is_idempotent() {
    let scans = Arc::new(AtomicUsize::new(0));
    let registry = CommandRegistry::new(CountingSource {
        inner: plugins(),
        scans: Arc::clone(&scans),
    });
    let config = Options::pluggable(Some("prog"), registry)
        .parse_args(["alpha"])
        .unwrap();

    let first = config.get_command("alpha").unwrap();
    let second = config.get_command("alpha").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(scans.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_name_is_not_found() {
    let config = parse(&["alpha"]);
    match config.get_command("nonexistent") {
        Err(CliError::NotFound(name)) => assert_eq!(name, "nonexistent"),
        Err(other) => panic!("expected NotFound, got {}", other),
        Ok(_) => panic!("expected NotFound"),
    }
}

#[test]
fn test_missing_sub_command_never_starts_loop() {
    let event_loop = CountingLoop::new();
    let runner = CommandRunner::pluggable("prog", Configuration::empty("prog"), event_loop.clone());

    assert_eq!(runner.run(), 64);
    assert_eq!(runner.state(), RunnerState::Stopped);
    assert_eq!(event_loop.stops(), 0);
    assert!(!jersey::cli::EventLoop::is_running(event_loop.as_ref()));
}
