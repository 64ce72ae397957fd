//! Videoflix Core - playback session coordination
//!
//! This crate provides the client-side building blocks of the Videoflix
//! streaming front end: the playback session actor, signed source
//! resolution with deduplication, durable progress records, network-driven
//! quality selection, user notices and configuration.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod network;
pub mod notice;
pub mod progress;
pub mod session;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::Catalog;
pub use config::VideoflixConfig;
pub use domain::{QualityTier, User, Video, VideoId};
pub use notice::NoticeBoard;
pub use progress::{FileProgressStorage, ProgressStore, StorageError};
pub use session::{SessionHandle, SessionSnapshot, spawn_session_coordinator};
pub use source::{SourceError, SourceProvider};

/// Core errors that can bubble up from any Videoflix subsystem.
#[derive(Debug, thiserror::Error)]
pub enum VideoflixError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Playback session has shut down")]
    SessionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VideoflixError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            VideoflixError::Source(e) => match e {
                SourceError::Unauthorized { .. } => {
                    "Your session has expired, please log in again".to_string()
                }
                _ => "Failed to fetch signed video URL".to_string(),
            },
            VideoflixError::Storage(_) => "Could not save playback progress".to_string(),
            VideoflixError::Configuration { reason } => format!("Invalid configuration: {reason}"),
            VideoflixError::SessionClosed => "Playback has stopped".to_string(),
            VideoflixError::Io(_) => "File system error occurred".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VideoflixError>;
