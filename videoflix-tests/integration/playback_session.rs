//! Playback session driven by the real API client.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use videoflix_core::config::{StorageConfig, VideoflixConfig};
use videoflix_core::notice::{NoticeBoard, NoticeKind};
use videoflix_core::progress::FileProgressStorage;
use videoflix_core::session::{SessionHandle, SessionSnapshot, SessionState, spawn_session_coordinator};
use videoflix_core::{QualityTier, Video};

use crate::fake_backend::{FakeBackend, client_for, sample_videos};

struct Harness {
    backend: FakeBackend,
    handle: SessionHandle,
    notices: NoticeBoard,
    storage_config: StorageConfig,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let backend = FakeBackend::with_videos(sample_videos());
    let client = client_for(&backend.spawn().await);
    let dir = TempDir::new().unwrap();

    let mut config = VideoflixConfig::for_testing();
    config.storage.progress_dir = dir.path().to_path_buf();
    let notices = NoticeBoard::default();

    let handle = spawn_session_coordinator(
        config.playback.clone(),
        Arc::new(client),
        Arc::new(FileProgressStorage::from_config(&config.storage)),
        notices.clone(),
    );

    Harness {
        backend,
        handle,
        notices,
        storage_config: config.storage,
        _dir: dir,
    }
}

fn video(id: u64) -> Video {
    sample_videos()
        .into_iter()
        .find(|video| video.id.as_u64() == id)
        .unwrap()
}

async fn wait_for(handle: &SessionHandle, predicate: impl Fn(&SessionSnapshot) -> bool) -> SessionSnapshot {
    let mut updates = handle.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for session")
        .expect("session closed");
    snapshot.clone()
}

#[tokio::test]
async fn test_repeated_selection_hits_backend_once() {
    let harness = harness().await;

    harness.handle.play(video(1)).await.unwrap();
    let first = wait_for(&harness.handle, |s| s.source_url().is_some()).await;
    harness.handle.play(video(1)).await.unwrap();
    let second = wait_for(&harness.handle, |s| s.source_url().is_some()).await;

    assert_eq!(first.source_url(), second.source_url());
    assert_eq!(harness.backend.url_calls().len(), 1);
    assert_eq!(
        harness.backend.url_calls()[0].quality.as_deref(),
        Some("720p")
    );
}

#[tokio::test]
async fn test_override_and_bandwidth_choose_requested_label() {
    let harness = harness().await;

    harness.handle.report_bandwidth(0.5).await.unwrap();
    harness.handle.play(video(2)).await.unwrap();
    let low = wait_for(&harness.handle, |s| s.source_url().is_some()).await;
    assert!(low.source_url().unwrap().contains("/2/120p/"));

    harness
        .handle
        .set_quality_override(Some(QualityTier::High))
        .await
        .unwrap();
    let high = wait_for(&harness.handle, |s| {
        s.source_url().is_some_and(|url| url.contains("/2/1080p/"))
    })
    .await;

    assert_eq!(high.network_tier, QualityTier::Low);
    let labels: Vec<Option<String>> = harness
        .backend
        .url_calls()
        .into_iter()
        .map(|call| call.quality)
        .collect();
    assert_eq!(
        labels,
        vec![Some("120p".to_string()), Some("1080p".to_string())]
    );
}

#[tokio::test]
async fn test_teaser_writes_no_progress_file() {
    let harness = harness().await;

    let url = harness.handle.prepare_teaser(video(4)).await.unwrap();

    assert!(url.is_some_and(|url| url.contains("/4/")));
    assert!(!harness.storage_config.progress_path().exists());
    assert_eq!(
        harness.handle.snapshot().await.unwrap().state,
        SessionState::Idle
    );
}

#[tokio::test]
async fn test_backend_failure_recovers_on_retry() {
    let harness = harness().await;
    harness.backend.fail_next_urls(1);

    harness.handle.play(video(3)).await.unwrap();
    wait_for(&harness.handle, |s| matches!(s.state, SessionState::Failed { .. })).await;
    assert_eq!(
        harness.notices.current().message(NoticeKind::Error),
        Some("Failed to fetch signed video URL")
    );

    harness.handle.retry().await.unwrap();
    let ready = wait_for(&harness.handle, |s| s.source_url().is_some()).await;

    assert!(ready.source_url().unwrap().contains("/3/720p/"));
    assert_eq!(harness.backend.url_calls().len(), 2);
}

#[tokio::test]
async fn test_expired_access_is_transparent_to_session() {
    let harness = harness().await;
    harness.backend.expire_access();

    harness.handle.play(video(1)).await.unwrap();
    wait_for(&harness.handle, |s| s.source_url().is_some()).await;

    assert_eq!(harness.backend.refresh_calls(), 1);
    assert_eq!(harness.backend.url_calls().len(), 1);
}
