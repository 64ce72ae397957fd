//! Error types for content API calls.

use thiserror::Error;

/// Errors that can occur while talking to the content API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configured base URL is not an absolute http(s) URL.
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Request could not be sent or the response could not be read.
    #[error("Network error: {reason}")]
    NetworkError {
        /// The reason for the network error
        reason: String,
    },

    /// Backend answered with a non-success status.
    #[error("Request to {path} failed with status {status}")]
    HttpStatus {
        /// Request path relative to the API base
        path: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body did not match the expected shape.
    #[error("Parse error: {reason}")]
    ParseError {
        /// The reason for the parse error
        reason: String,
    },

    /// Access expired and the refresh call failed; the credential was dropped.
    #[error("Session expired, please log in again")]
    SessionExpired,
}

impl ApiError {
    /// Whether the backend rejected the caller's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::SessionExpired | ApiError::HttpStatus { status: 401, .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::ParseError {
                reason: error.to_string(),
            }
        } else {
            ApiError::NetworkError {
                reason: error.to_string(),
            }
        }
    }
}
