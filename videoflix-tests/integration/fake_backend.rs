//! In-process stand-in for the Videoflix REST backend.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use videoflix_core::Video;

/// A signed URL request the backend answered or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCall {
    pub video_id: u64,
    pub quality: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    videos: Vec<Video>,
    favorites: BTreeSet<u64>,
    url_calls: Vec<UrlCall>,
    list_calls: u32,
    refresh_calls: u32,
    retried_requests: u32,
    authorization_headers: Vec<Option<String>>,
    access_expired: bool,
    always_unauthorized: bool,
    refresh_fails: bool,
    url_failures: u32,
    list_fails: bool,
}

/// Shared, inspectable backend state.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub fn with_videos(videos: Vec<Video>) -> Self {
        let backend = Self::default();
        backend.inner.lock().videos = videos;
        backend
    }

    /// Next content call gets a 401 until the client refreshes.
    pub fn expire_access(&self) {
        self.inner.lock().access_expired = true;
    }

    /// Every content call gets a 401, even after a refresh.
    pub fn reject_all(&self) {
        self.inner.lock().always_unauthorized = true;
    }

    pub fn fail_refresh(&self) {
        self.inner.lock().refresh_fails = true;
    }

    pub fn fail_next_urls(&self, count: u32) {
        self.inner.lock().url_failures = count;
    }

    pub fn fail_listing(&self) {
        self.inner.lock().list_fails = true;
    }

    pub fn url_calls(&self) -> Vec<UrlCall> {
        self.inner.lock().url_calls.clone()
    }

    pub fn list_calls(&self) -> u32 {
        self.inner.lock().list_calls
    }

    pub fn refresh_calls(&self) -> u32 {
        self.inner.lock().refresh_calls
    }

    pub fn retried_requests(&self) -> u32 {
        self.inner.lock().retried_requests
    }

    pub fn authorization_headers(&self) -> Vec<Option<String>> {
        self.inner.lock().authorization_headers.clone()
    }

    /// Starts serving on an ephemeral port and returns the API base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/content/", get(list_videos))
            .route("/api/content/add-favorite/", post(toggle_favorite))
            .route("/api/content/video-url/{id}/", get(signed_url))
            .route("/api/users/refresh/", post(refresh))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let address = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend crashed");
        });

        format!("http://{address}/api")
    }

    /// Records the request and decides whether it is authorized.
    fn admit(&self, headers: &HeaderMap) -> bool {
        let mut inner = self.inner.lock();
        let retried = headers.contains_key("x-retry");
        if retried {
            inner.retried_requests += 1;
        }
        inner.authorization_headers.push(
            headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        );
        !(inner.always_unauthorized || inner.access_expired)
    }
}

#[derive(Debug, Deserialize)]
struct FavoriteBody {
    video_id: u64,
}

#[derive(Debug, Deserialize)]
struct QualityQuery {
    quality: Option<String>,
}

async fn list_videos(State(backend): State<FakeBackend>, headers: HeaderMap) -> Response {
    backend.inner.lock().list_calls += 1;
    if !backend.admit(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let inner = backend.inner.lock();
    if inner.list_fails {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(inner.videos.clone()).into_response()
}

async fn toggle_favorite(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<FavoriteBody>,
) -> Response {
    if !backend.admit(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut inner = backend.inner.lock();
    if !inner.favorites.remove(&body.video_id) {
        inner.favorites.insert(body.video_id);
    }
    Json(inner.favorites.iter().copied().collect::<Vec<_>>()).into_response()
}

async fn signed_url(
    State(backend): State<FakeBackend>,
    Path(id): Path<u64>,
    Query(query): Query<QualityQuery>,
    headers: HeaderMap,
) -> Response {
    if !backend.admit(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut inner = backend.inner.lock();
    inner.url_calls.push(UrlCall {
        video_id: id,
        quality: query.quality.clone(),
    });
    if inner.url_failures > 0 {
        inner.url_failures -= 1;
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let quality = query.quality.unwrap_or_else(|| "auto".to_string());
    let signature = inner.url_calls.len();
    Json(json!({
        "url": format!("https://media.videoflix.test/{id}/{quality}/index.m3u8?sig={signature}")
    }))
    .into_response()
}

async fn refresh(State(backend): State<FakeBackend>) -> Response {
    let mut inner = backend.inner.lock();
    inner.refresh_calls += 1;
    if inner.refresh_fails {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    inner.access_expired = false;
    Json(json!({ "access": "fresh-token" })).into_response()
}

/// Client pointed at `base_url` with a short timeout.
pub fn client_for(base_url: &str) -> videoflix_api::VideoflixClient {
    let config = videoflix_core::config::ApiConfig {
        base_url: base_url.to_string(),
        request_timeout: std::time::Duration::from_secs(5),
        ..Default::default()
    };
    videoflix_api::VideoflixClient::new(&config).expect("valid fake backend URL")
}

/// A small catalog spanning two categories.
pub fn sample_videos() -> Vec<Video> {
    vec![
        Video::new(1, "Deep Blue", "Nature"),
        Video::new(2, "Night Shift", "Crime"),
        Video::new(3, "Canopy", "Nature"),
        Video::new(4, "Breaking Point", "Drama"),
    ]
}
