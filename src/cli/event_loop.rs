//! Event loop abstraction injected into the runner.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Notify;
use tracing::debug;

/// Drives the runner's work until it finishes or the loop is stopped.
pub trait EventLoop: Send + Sync {
    /// Block the calling thread running `task` until it completes or
    /// [`EventLoop::stop`] is called.
    fn run(&self, task: BoxFuture<'static, ()>);

    fn stop(&self);

    fn is_running(&self) -> bool;
}

/// Event loop backed by a tokio runtime.
pub struct TokioEventLoop {
    runtime: Runtime,
    shutdown: Arc<Notify>,
    running: AtomicBool,
}

impl TokioEventLoop {
    /// Multi-threaded runtime.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self::with_runtime(
            Builder::new_multi_thread().enable_all().build()?,
        ))
    }

    /// Single-threaded runtime; everything runs on the calling thread.
    pub fn current_thread() -> std::io::Result<Self> {
        Ok(Self::with_runtime(
            Builder::new_current_thread().enable_all().build()?,
        ))
    }

    pub fn with_runtime(runtime: Runtime) -> Self {
        Self {
            runtime,
            shutdown: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
        }
    }
}

impl EventLoop for TokioEventLoop {
    fn run(&self, task: BoxFuture<'static, ()>) {
        self.running.store(true, Ordering::SeqCst);
        debug!("Event loop started");
        let shutdown = Arc::clone(&self.shutdown);
        self.runtime.block_on(async move {
            tokio::select! {
                _ = task => {}
                _ = shutdown.notified() => {}
            }
        });
        self.running.store(false, Ordering::SeqCst);
        debug!("Event loop stopped");
    }

    fn stop(&self) {
        self.shutdown.notify_one();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
