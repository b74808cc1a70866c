//! Integration tests for the jersey command lifecycle toolkit

mod logging_capture;
mod pluggable_runner;
mod runner_exit;
