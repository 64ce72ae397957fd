//! Request and response bodies of the content API.

use serde::{Deserialize, Serialize};
use videoflix_core::VideoId;

/// Body of the favorite toggle request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FavoriteRequest {
    /// Video whose favorite membership is toggled
    pub video_id: VideoId,
}

/// Response of the signed URL endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedUrlResponse {
    /// Short-lived playable URL
    pub url: String,
}

/// Optional body of the refresh endpoint.
///
/// Cookie-based backends answer with an empty body; token-based ones return
/// the new access token under one of these names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    /// New access token, when the backend hands one out
    #[serde(default, alias = "access_token", alias = "token")]
    pub access: Option<String>,
}
