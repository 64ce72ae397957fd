//! Centralized configuration for Videoflix.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::QualityTier;

/// Central configuration for all Videoflix components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct VideoflixConfig {
    pub api: ApiConfig,
    pub playback: PlaybackConfig,
    pub storage: StorageConfig,
}

/// Remote content API configuration.
///
/// Controls the base URL of the REST backend and HTTP client behavior.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the API, trailing slash stripped on use
    pub base_url: String,
    /// Overall HTTP request timeout
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: "videoflix/0.1.0",
        }
    }
}

impl ApiConfig {
    /// Base URL without a trailing slash.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Playback session and quality adaptation configuration.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Tier used until the first bandwidth reading arrives
    pub default_quality: QualityTier,
    /// How long a quality-change notice stays visible
    pub quality_notice_ttl: Duration,
    /// How long error and success notices stay visible
    pub message_ttl: Duration,
    /// Maximum polls while waiting for a source before revealing the overlay
    pub source_wait_attempts: u32,
    /// Delay between source polls
    pub source_wait_interval: Duration,
    /// Bandwidth estimate polling interval
    pub bandwidth_poll_interval: Duration,
    /// Capacity of the session command channel
    pub command_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_quality: QualityTier::Standard,
            quality_notice_ttl: Duration::from_secs(4),
            message_ttl: Duration::from_secs(3),
            source_wait_attempts: 20,
            source_wait_interval: Duration::from_millis(100),
            bandwidth_poll_interval: Duration::from_secs(5),
            command_buffer: 100,
        }
    }
}

/// Durable progress storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the progress file
    pub progress_dir: PathBuf,
    /// Name of the progress file inside `progress_dir`
    pub progress_file: &'static str,
    /// Temporary file suffix used for atomic rewrites
    pub temp_file_suffix: &'static str,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            progress_dir: PathBuf::from(".videoflix"),
            progress_file: "progress.json",
            temp_file_suffix: ".tmp",
        }
    }
}

impl StorageConfig {
    /// Full path of the progress file.
    pub fn progress_path(&self) -> PathBuf {
        self.progress_dir.join(self.progress_file)
    }

    /// Append-only client log kept under `progress_dir/logs`.
    pub fn session_log_path(&self) -> PathBuf {
        self.progress_dir.join("logs").join("videoflix-session.log")
    }
}

impl VideoflixConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("VIDEOFLIX_API_URL") {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }

        if let Ok(timeout) = std::env::var("VIDEOFLIX_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.api.request_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(dir) = std::env::var("VIDEOFLIX_PROGRESS_DIR") {
            if !dir.trim().is_empty() {
                config.storage.progress_dir = PathBuf::from(dir);
            }
        }

        if let Ok(quality) = std::env::var("VIDEOFLIX_DEFAULT_QUALITY") {
            if let Ok(tier) = quality.parse::<QualityTier>() {
                config.playback.default_quality = tier;
            }
        }

        if let Ok(poll) = std::env::var("VIDEOFLIX_BANDWIDTH_POLL_MS") {
            if let Ok(millis) = poll.parse::<u64>() {
                config.playback.bandwidth_poll_interval = Duration::from_millis(millis.max(1));
            }
        }

        config
    }

    /// Configuration tuned for tests: fast polling, short notices.
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.playback.source_wait_interval = Duration::from_millis(10);
        config.playback.bandwidth_poll_interval = Duration::from_millis(10);
        config
    }
}
