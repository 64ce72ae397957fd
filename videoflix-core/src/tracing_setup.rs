//! Logging for the Videoflix client.
//!
//! The console shows Videoflix events at the level the user picked while HTTP
//! and runtime crates stay at `warn`. Every run also appends debug detail to
//! a session log kept beside the progress file. `VIDEOFLIX_LOG` replaces the
//! console filter with any `EnvFilter` directive.

use std::fs::{File, OpenOptions, create_dir_all};
use std::io;
use std::path::{Path, PathBuf};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::StorageConfig;

/// Environment variable overriding the console filter.
pub const LOG_ENV: &str = "VIDEOFLIX_LOG";

const VIDEOFLIX_TARGETS: [&str; 3] = ["videoflix", "videoflix_core", "videoflix_api"];

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Cannot open session log {path}: {source}")]
    SessionLog { path: PathBuf, source: io::Error },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// How much the console shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Warnings and errors
    #[default]
    Normal,
    /// Session and request lifecycle
    Verbose,
    /// Resolver and storage internals
    Debug,
    /// Everything
    Trace,
}

impl Verbosity {
    fn level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }

    /// `EnvFilter` directive for the console at this verbosity.
    ///
    /// Dependencies never go below `warn` so request plumbing does not drown
    /// out session events.
    pub fn console_directive(self) -> String {
        let level = self.level();
        let mut directive = String::from("warn");
        for target in VIDEOFLIX_TARGETS {
            directive.push_str(&format!(",{target}={level}"));
        }
        directive
    }
}

/// Directive for the session log: Videoflix at `debug`, everything else at `info`.
pub fn session_log_directive() -> String {
    let mut directive = String::from("info");
    for target in VIDEOFLIX_TARGETS {
        directive.push_str(&format!(",{target}=debug"));
    }
    directive
}

fn open_session_log(path: &Path) -> Result<File, TracingError> {
    let wrap = |source: io::Error| TracingError::SessionLog {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(wrap)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(wrap)
}

/// Installs the console and session-log subscriber.
///
/// Returns the session log path so the CLI can point users at it.
///
/// # Errors
///
/// - `TracingError::SessionLog` - The log directory or file could not be opened
/// - `TracingError::AlreadyInstalled` - Called more than once in a process
pub fn init_tracing(
    verbosity: Verbosity,
    storage: &StorageConfig,
) -> Result<PathBuf, TracingError> {
    let log_path = storage.session_log_path();
    let log_file = open_session_log(&log_path)?;

    let console_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity.console_directive()));

    let console_layer = fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(console_filter);

    let session_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(log_file)
        .with_filter(EnvFilter::new(session_log_directive()));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(session_layer)
        .try_init()
        .map_err(|_| TracingError::AlreadyInstalled)?;

    tracing::debug!(?verbosity, log = %log_path.display(), "Session logging started");
    Ok(log_path)
}
