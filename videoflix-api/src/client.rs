//! Content API client with transparent access refresh.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use videoflix_core::config::ApiConfig;
use videoflix_core::source::{SourceError, SourceProvider};
use videoflix_core::{NoticeBoard, QualityTier, Video, VideoId};

use crate::credentials::Credentials;
use crate::errors::ApiError;
use crate::types::{FavoriteRequest, RefreshResponse, SignedUrlResponse};

/// Endpoints that must never trigger a refresh themselves.
static AUTH_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/users/(login|refresh|logout)/?$").expect("Auth path regex is valid")
});

const RETRY_HEADER: &str = "X-Retry";
const LIST_FAILURE_NOTICE: &str = "Failed to fetch videos";
const FAVORITE_FAILURE_NOTICE: &str = "Failed to store favorite video";
const SIGNED_URL_FAILURE_NOTICE: &str = "Failed to fetch signed video URL";

/// Whether a 401 from `url` may be answered with a refresh and retry.
pub fn is_refreshable(url: &str) -> bool {
    !AUTH_PATH.is_match(url)
}

#[derive(Debug)]
struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn post(path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }
}

/// HTTP client for the Videoflix content API.
///
/// Sends the cookie jar and, when held, the bearer credential with every
/// call. A 401 on any endpoint other than login, refresh or logout triggers
/// one refresh followed by one retry of the original request.
#[derive(Debug, Clone)]
pub struct VideoflixClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    notices: Option<NoticeBoard>,
}

impl VideoflixClient {
    /// Creates a client for the API described by `config`.
    ///
    /// # Errors
    /// - `ApiError::InvalidBaseUrl` - Base URL is not an absolute http(s) URL
    /// - `ApiError::NetworkError` - HTTP client could not be constructed
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.normalized_base_url().to_string();
        let parsed = Url::parse(&base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url,
            credentials: Credentials::default(),
            notices: None,
        })
    }

    /// Posts failure notices for the public calls to `notices`.
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Uses `credentials` for the bearer header.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Credential shared by this client and its clones.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// API base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetches the full catalog.
    ///
    /// # Errors
    /// - `ApiError::HttpStatus` - Backend rejected the request
    /// - `ApiError::NetworkError` - Backend unreachable
    /// - `ApiError::SessionExpired` - Access could not be refreshed
    pub async fn list_videos(&self) -> Result<Vec<Video>, ApiError> {
        let result = self.call_json(&ApiRequest::get("content/")).await;
        self.notify_failure(&result, LIST_FAILURE_NOTICE);
        let videos: Vec<Video> = result?;
        tracing::debug!(count = videos.len(), "Fetched video catalog");
        Ok(videos)
    }

    /// Toggles `video_id` in the user's favorites.
    ///
    /// Returns the user's favorite set after the toggle.
    ///
    /// # Errors
    /// - `ApiError::HttpStatus` - Backend rejected the request
    /// - `ApiError::NetworkError` - Backend unreachable
    /// - `ApiError::SessionExpired` - Access could not be refreshed
    pub async fn toggle_favorite(&self, video_id: VideoId) -> Result<Vec<VideoId>, ApiError> {
        let body = serde_json::to_value(FavoriteRequest { video_id }).map_err(|e| {
            ApiError::ParseError {
                reason: e.to_string(),
            }
        })?;
        let result = self
            .call_json(&ApiRequest::post("content/add-favorite/", Some(body)))
            .await;
        self.notify_failure(&result, FAVORITE_FAILURE_NOTICE);
        result
    }

    /// Requests a signed playable URL for `video_id`.
    ///
    /// Without a tier the backend picks its default rendition.
    ///
    /// # Errors
    /// - `ApiError::HttpStatus` - Backend rejected the request
    /// - `ApiError::NetworkError` - Backend unreachable
    /// - `ApiError::SessionExpired` - Access could not be refreshed
    pub async fn signed_video_url(
        &self,
        video_id: VideoId,
        tier: Option<QualityTier>,
    ) -> Result<String, ApiError> {
        let result = self.fetch_signed_url(video_id, tier).await;
        self.notify_failure(&result, SIGNED_URL_FAILURE_NOTICE);
        result
    }

    async fn fetch_signed_url(
        &self,
        video_id: VideoId,
        tier: Option<QualityTier>,
    ) -> Result<String, ApiError> {
        let mut request = ApiRequest::get(format!("content/video-url/{video_id}/"));
        if let Some(tier) = tier {
            request.query.push(("quality", tier.label().to_string()));
        }
        let response: SignedUrlResponse = self.call_json(&request).await?;
        Ok(response.url)
    }

    /// Refreshes the access credential.
    ///
    /// A token in the response body replaces the held one; cookie-based
    /// backends rotate their cookies instead.
    ///
    /// # Errors
    /// - `ApiError::HttpStatus` - Refresh was rejected
    /// - `ApiError::NetworkError` - Backend unreachable
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let request = ApiRequest::post("users/refresh/", None);
        let response = self.dispatch(&request, false).await?;
        let response = check_status(&request, response)?;

        let body = response.bytes().await?;
        if !body.is_empty() {
            match serde_json::from_slice::<RefreshResponse>(&body) {
                Ok(RefreshResponse {
                    access: Some(token),
                }) => self.credentials.set_token(token),
                Ok(_) => {}
                Err(e) => tracing::debug!("Ignoring unrecognized refresh body: {e}"),
            }
        }

        tracing::debug!("Access refreshed");
        Ok(())
    }

    async fn call_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::ParseError {
            reason: format!("{}: {e}", request.path),
        })
    }

    async fn execute(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let response = self.dispatch(request, false).await?;
        if response.status() != StatusCode::UNAUTHORIZED
            || !is_refreshable(&self.endpoint(&request.path))
        {
            return check_status(request, response);
        }

        tracing::debug!(path = %request.path, "Access rejected, refreshing");
        if let Err(e) = self.refresh().await {
            tracing::warn!("Access refresh failed: {e}");
            self.credentials.clear();
            return Err(ApiError::SessionExpired);
        }

        let retried = self.dispatch(request, true).await?;
        check_status(request, retried)
    }

    async fn dispatch(&self, request: &ApiRequest, retry: bool) -> Result<Response, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.endpoint(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = self.credentials.token() {
            builder = builder.bearer_auth(token);
        }
        if retry {
            builder = builder.header(RETRY_HEADER, "1");
        }

        tracing::trace!(method = %request.method, path = %request.path, retry, "Sending API request");
        Ok(builder.send().await?)
    }

    fn notify_failure<T>(&self, result: &Result<T, ApiError>, message: &str) {
        if let Err(e) = result {
            tracing::warn!("{message}: {e}");
            if let Some(notices) = &self.notices {
                notices.show_error(message);
            }
        }
    }
}

fn check_status(request: &ApiRequest, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::HttpStatus {
            path: request.path.clone(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl SourceProvider for VideoflixClient {
    async fn signed_url(&self, video_id: VideoId, tier: QualityTier) -> Result<String, SourceError> {
        self.fetch_signed_url(video_id, Some(tier))
            .await
            .map_err(|e| {
                if e.is_unauthorized() {
                    SourceError::Unauthorized { video_id }
                } else {
                    SourceError::RequestFailed {
                        video_id,
                        tier,
                        reason: e.to_string(),
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_auth_endpoints_are_not_refreshable() {
        assert!(!is_refreshable("http://host/api/users/login/"));
        assert!(!is_refreshable("http://host/api/users/refresh"));
        assert!(!is_refreshable("http://host/api/USERS/Logout/"));
        assert!(is_refreshable("http://host/api/content/"));
        assert!(is_refreshable("http://host/api/users/profile/"));
        assert!(is_refreshable("http://host/api/users/login/history/"));
    }

    #[test]
    fn test_auth_path_pattern_compiles() {
        assert!(AUTH_PATH.is_match("/users/refresh/"));
        assert!(!AUTH_PATH.is_match("/content/"));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = VideoflixClient::new(&config("http://127.0.0.1:8000/api/")).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000/api");
        assert_eq!(
            client.endpoint("content/video-url/3/"),
            "http://127.0.0.1:8000/api/content/video-url/3/"
        );
        assert_eq!(
            client.endpoint("/content/"),
            "http://127.0.0.1:8000/api/content/"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            VideoflixClient::new(&config("not a url")),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            VideoflixClient::new(&config("ftp://example.com/api")),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let notices = NoticeBoard::default();
        let credentials = Credentials::with_token("kept-token");
        let client = VideoflixClient::new(&config(&format!("http://127.0.0.1:{port}/api")))
            .unwrap()
            .with_credentials(credentials.clone())
            .with_notices(notices.clone());

        let err = client.list_videos().await.unwrap_err();

        assert!(matches!(err, ApiError::NetworkError { .. }));
        assert!(credentials.is_present());
        assert_eq!(
            notices.current().message(videoflix_core::notice::NoticeKind::Error),
            Some(LIST_FAILURE_NOTICE)
        );
    }

    #[test]
    fn test_unauthorized_errors() {
        assert!(ApiError::SessionExpired.is_unauthorized());
        assert!(
            ApiError::HttpStatus {
                path: "content/".to_string(),
                status: 401
            }
            .is_unauthorized()
        );
        assert!(
            !ApiError::HttpStatus {
                path: "content/".to_string(),
                status: 500
            }
            .is_unauthorized()
        );
    }
}
