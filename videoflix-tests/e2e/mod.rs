//! End-to-end tests for Videoflix
//!
//! These tests walk complete viewer workflows from catalog listing to
//! resumed playback, using the real API client, file progress storage and
//! an in-process backend.

#[path = "../integration/fake_backend.rs"]
mod fake_backend;

mod watch_workflow;
