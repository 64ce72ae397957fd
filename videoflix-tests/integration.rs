//! Integration tests for Videoflix
//!
//! These tests run the API client and the playback session against an
//! in-process fake backend and real progress files.

#[path = "integration/fake_backend.rs"]
mod fake_backend;

#[path = "integration/api_client.rs"]
mod api_client;
#[path = "integration/playback_session.rs"]
mod playback_session;
#[path = "integration/progress_file.rs"]
mod progress_file;
