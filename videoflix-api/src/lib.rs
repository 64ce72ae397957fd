//! Videoflix API - HTTP client for the content backend
#![warn(missing_docs)]
//!
//! Wraps the REST endpoints the player needs (catalog, favorites, signed
//! playback URLs and access refresh) and plugs into the core crate as its
//! [`SourceProvider`](videoflix_core::source::SourceProvider).

pub mod client;
pub mod credentials;
pub mod errors;
pub mod types;

// Re-export main types
pub use client::VideoflixClient;
pub use credentials::Credentials;
pub use errors::ApiError;

/// Convenience type alias for Results with ApiError.
pub type Result<T> = std::result::Result<T, ApiError>;
