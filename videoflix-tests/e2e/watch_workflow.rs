//! Browse, watch, leave and come back.

use std::sync::Arc;

use tempfile::TempDir;
use videoflix_api::Credentials;
use videoflix_core::config::VideoflixConfig;
use videoflix_core::notice::{NoticeBoard, NoticeKind};
use videoflix_core::progress::{FileProgressStorage, ProgressStore};
use videoflix_core::session::{SessionState, spawn_session_coordinator};
use videoflix_core::{Catalog, VideoId};

use crate::fake_backend::{FakeBackend, client_for, sample_videos};

#[tokio::test]
async fn test_watch_leave_and_resume() {
    let backend = FakeBackend::with_videos(sample_videos());
    let dir = TempDir::new().unwrap();

    let mut config = VideoflixConfig::for_testing();
    config.storage.progress_dir = dir.path().join("profile");
    config.playback.source_wait_attempts = 500;

    let notices = NoticeBoard::default();
    let client = client_for(&backend.spawn().await)
        .with_credentials(Credentials::with_token("viewer-token"))
        .with_notices(notices.clone());
    let storage = Arc::new(FileProgressStorage::from_config(&config.storage));
    let session = spawn_session_coordinator(
        config.playback.clone(),
        Arc::new(client.clone()),
        storage.clone(),
        notices.clone(),
    );

    // Browse
    let catalog = Catalog::new(client.list_videos().await.unwrap());
    let nature = catalog
        .by_category()
        .into_iter()
        .find(|group| group.category == "Nature")
        .unwrap();
    let pick = nature.videos[1].clone();
    assert_eq!(pick.id, VideoId::new(3));

    // Watch
    let first_url = session.open_overlay(pick.clone()).await.unwrap().unwrap();
    assert!(first_url.contains("/3/720p/"));
    assert_eq!(
        notices.current().message(NoticeKind::Quality),
        Some("Optimizing video for your screen.")
    );
    for second in [5.0, 30.5, 61.25] {
        session.time_update(second).await.unwrap();
    }

    // Leave
    assert!(session.close_overlay().await.unwrap());
    assert_eq!(session.snapshot().await.unwrap().state, SessionState::Idle);
    let store = ProgressStore::new(storage.clone());
    assert_eq!(store.saved_offset(pick.id).await, Some(61.25));

    // Come back
    let reopened_url = session.open_overlay(pick.clone()).await.unwrap().unwrap();
    let resumed = session.snapshot().await.unwrap();
    assert_eq!(resumed.current_time, 61.25);
    assert!(resumed.start_from_saved_time);
    assert!(resumed.has_saved_progress);
    assert_ne!(reopened_url, first_url);
    assert_eq!(backend.url_calls().len(), 2);

    // Selecting the same video again reuses the signed URL
    session.play(catalog.get(pick.id).unwrap().clone()).await.unwrap();
    assert_eq!(session.wait_for_source(pick.id).await.as_deref(), Some(reopened_url.as_str()));
    assert_eq!(backend.url_calls().len(), 2);

    // Start over
    let restarted = session.begin_from_start(pick.clone()).await.unwrap();
    assert_eq!(restarted.current_time, 0.0);
    assert!(!restarted.start_from_saved_time);
    let fresh_url = session.wait_for_source(pick.id).await.unwrap();
    assert_ne!(fresh_url, reopened_url);
    assert_eq!(backend.url_calls().len(), 3);

    assert_eq!(
        backend.authorization_headers().first().cloned().flatten().as_deref(),
        Some("Bearer viewer-token")
    );
    session.shutdown().await.unwrap();
}
