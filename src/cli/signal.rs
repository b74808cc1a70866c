//! Completion signal: a one-shot outcome broadcast to any number of waiters.

use crate::error::CommandFailure;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Final outcome of a command's execution.
pub type Completion = Result<Value, CommandFailure>;

/// Single-assignment completion signal ("exit").
///
/// Resolved at most once; later resolutions are ignored. Every clone observes
/// the same outcome, and reading a resolved signal has no side effects.
#[derive(Clone)]
pub struct ExitSignal {
    slot: Arc<watch::Sender<Option<Completion>>>,
}

impl ExitSignal {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Store the outcome. Returns `false` if the signal was already resolved.
    pub fn resolve(&self, outcome: Completion) -> bool {
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The outcome, if already resolved.
    pub fn peek(&self) -> Option<Completion> {
        self.slot.borrow().clone()
    }

    /// Wait for the outcome.
    pub async fn wait(&self) -> Completion {
        let mut rx = self.slot.subscribe();
        let resolved = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        // The sender lives in `self`, so the channel cannot close while waiting.
        resolved.unwrap_or_else(|| Err(CommandFailure::msg("completion signal closed")))
    }
}

impl Default for ExitSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExitSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitSignal")
            .field("outcome", &*self.slot.borrow())
            .finish()
    }
}
