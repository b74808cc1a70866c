//! Property-based tests for the runner's outcome mapping

use async_trait::async_trait;
use futures::future::BoxFuture;
use jersey::cli::{exit_status, EventLoop, TokioEventLoop};
use jersey::{Command, CommandFailure, CommandRunner, Configuration, Execute};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Fails(CommandFailure);

#[async_trait]
impl Execute for Fails {
    async fn execute(&self, _config: &Configuration) -> Result<Value, CommandFailure> {
        Err(self.0.clone())
    }
}

struct StopCounter {
    inner: TokioEventLoop,
    stops: AtomicUsize,
}

impl EventLoop for StopCounter {
    fn run(&self, task: BoxFuture<'static, ()>) {
        self.inner.run(task)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop();
    }

    fn is_running(&self) -> bool {
        self.inner.is_running()
    }
}

fn run_failing(failure: CommandFailure) -> (i32, usize) {
    let event_loop = Arc::new(StopCounter {
        inner: TokioEventLoop::current_thread().unwrap(),
        stops: AtomicUsize::new(0),
    });
    let command = Command::new("prop", Configuration::empty("prop"), Fails(failure));
    let code = CommandRunner::new("prop", Arc::new(command), event_loop.clone()).run();
    (code, event_loop.stops.load(Ordering::SeqCst))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Explicit exit N yields process status N.
    #[test]
    fn test_explicit_exit_maps_one_to_one(code in 0i32..=255) {
        prop_assert_eq!(run_failing(CommandFailure::Exit(code)), (code, 1));
    }

    /// Arbitrary errors yield the software error code.
    #[test]
    fn test_arbitrary_error_is_software_error(message in "[a-z ]{1,40}") {
        prop_assert_eq!(run_failing(CommandFailure::msg(message)), (70, 1));
    }

    /// Non-integer truthy values leave the current status alone.
    #[test]
    fn test_truthy_text_keeps_status(text in "[a-z]{1,20}", current in 0i32..=255) {
        prop_assert_eq!(exit_status(&Ok(json!(text)), current, 70), current);
    }

    /// Integer values in range become the status.
    #[test]
    fn test_integer_value_is_status(code in 0u8..=255, current in 0i32..=255) {
        prop_assert_eq!(exit_status(&Ok(json!(code)), current, 70), i32::from(code));
    }
}
