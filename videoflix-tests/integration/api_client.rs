//! Content API client against the fake backend.

use videoflix_api::{ApiError, Credentials};
use videoflix_core::notice::{NoticeBoard, NoticeKind};
use videoflix_core::source::{SourceError, SourceProvider};
use videoflix_core::{Catalog, QualityTier, VideoId};

use crate::fake_backend::{FakeBackend, UrlCall, client_for, sample_videos};

#[tokio::test]
async fn test_list_videos_feeds_catalog() {
    let backend = FakeBackend::with_videos(sample_videos());
    let client = client_for(&backend.spawn().await);

    let catalog = Catalog::new(client.list_videos().await.unwrap());
    let categories: Vec<&str> = catalog.by_category().iter().map(|g| g.category).collect();

    assert_eq!(catalog.len(), 4);
    assert_eq!(categories, vec!["Nature", "Crime", "Drama"]);
    assert_eq!(catalog.teaser().map(|v| v.id), Some(VideoId::new(4)));
}

#[tokio::test]
async fn test_toggle_favorite_round_trips_membership() {
    let backend = FakeBackend::with_videos(sample_videos());
    let client = client_for(&backend.spawn().await);

    let added = client.toggle_favorite(VideoId::new(2)).await.unwrap();
    assert_eq!(added, vec![VideoId::new(2)]);

    let removed = client.toggle_favorite(VideoId::new(2)).await.unwrap();
    assert!(removed.is_empty());
}

#[tokio::test]
async fn test_signed_url_carries_quality_label() {
    let backend = FakeBackend::with_videos(sample_videos());
    let client = client_for(&backend.spawn().await);

    let url = client
        .signed_video_url(VideoId::new(3), Some(QualityTier::Medium))
        .await
        .unwrap();
    let default = client.signed_video_url(VideoId::new(3), None).await.unwrap();

    assert!(url.contains("/3/360p/"));
    assert!(default.contains("/3/auto/"));
    assert_eq!(
        backend.url_calls(),
        vec![
            UrlCall {
                video_id: 3,
                quality: Some("360p".to_string())
            },
            UrlCall {
                video_id: 3,
                quality: None
            },
        ]
    );
}

#[tokio::test]
async fn test_expired_access_refreshes_and_retries_once() {
    let backend = FakeBackend::with_videos(sample_videos());
    let client = client_for(&backend.spawn().await);
    backend.expire_access();

    let videos = client.list_videos().await.unwrap();

    assert_eq!(videos.len(), 4);
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.list_calls(), 2);
    assert_eq!(backend.retried_requests(), 1);
    assert_eq!(
        backend.authorization_headers().last().cloned().flatten().as_deref(),
        Some("Bearer fresh-token")
    );
}

#[tokio::test]
async fn test_persistent_rejection_does_not_loop() {
    let backend = FakeBackend::with_videos(sample_videos());
    let client = client_for(&backend.spawn().await);
    backend.reject_all();

    let err = client.list_videos().await.unwrap_err();

    assert!(matches!(err, ApiError::HttpStatus { status: 401, .. }));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.list_calls(), 2);
}

#[tokio::test]
async fn test_failed_refresh_expires_session() {
    let backend = FakeBackend::with_videos(sample_videos());
    let notices = NoticeBoard::default();
    let credentials = Credentials::with_token("stale-token");
    let client = client_for(&backend.spawn().await)
        .with_credentials(credentials.clone())
        .with_notices(notices.clone());
    backend.expire_access();
    backend.fail_refresh();

    let err = client.list_videos().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(!credentials.is_present());
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.retried_requests(), 0);
    assert_eq!(
        notices.current().message(NoticeKind::Error),
        Some("Failed to fetch videos")
    );
}

#[tokio::test]
async fn test_refresh_endpoint_never_refreshes_itself() {
    let backend = FakeBackend::default();
    let client = client_for(&backend.spawn().await);
    backend.fail_refresh();

    let err = client.refresh().await.unwrap_err();

    assert!(matches!(err, ApiError::HttpStatus { status: 401, .. }));
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test]
async fn test_server_errors_post_notices() {
    let backend = FakeBackend::with_videos(sample_videos());
    let notices = NoticeBoard::default();
    let client = client_for(&backend.spawn().await).with_notices(notices.clone());
    backend.fail_listing();
    backend.fail_next_urls(1);

    assert!(matches!(
        client.list_videos().await,
        Err(ApiError::HttpStatus { status: 500, .. })
    ));
    assert_eq!(
        notices.current().message(NoticeKind::Error),
        Some("Failed to fetch videos")
    );

    assert!(
        client
            .signed_video_url(VideoId::new(1), Some(QualityTier::High))
            .await
            .is_err()
    );
    assert_eq!(
        notices.current().message(NoticeKind::Error),
        Some("Failed to fetch signed video URL")
    );
}

#[tokio::test]
async fn test_source_provider_maps_errors() {
    let backend = FakeBackend::with_videos(sample_videos());
    let client = client_for(&backend.spawn().await);
    backend.fail_next_urls(1);

    let failed = client.signed_url(VideoId::new(1), QualityTier::Low).await;
    assert!(matches!(failed, Err(SourceError::RequestFailed { .. })));

    backend.reject_all();
    let rejected = client.signed_url(VideoId::new(1), QualityTier::Low).await;
    assert!(matches!(rejected, Err(SourceError::Unauthorized { .. })));
}
