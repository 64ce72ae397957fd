//! Progress records persisted through the JSON file backend.

use std::sync::Arc;

use futures::future::join_all;
use tempfile::TempDir;
use videoflix_core::config::VideoflixConfig;
use videoflix_core::notice::NoticeBoard;
use videoflix_core::progress::{FileProgressStorage, ProgressStorage, ProgressStore};
use videoflix_core::session::spawn_session_coordinator;
use videoflix_core::test_mocks::MockSourceProvider;
use videoflix_core::{Video, VideoId};

fn config_in(dir: &TempDir) -> VideoflixConfig {
    let mut config = VideoflixConfig::for_testing();
    config.storage.progress_dir = dir.path().join("state");
    config
}

#[tokio::test]
async fn test_session_progress_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let video = Video::new(21, "Harbor Lights", "Drama");

    let first = spawn_session_coordinator(
        config.playback.clone(),
        Arc::new(MockSourceProvider::new()),
        Arc::new(FileProgressStorage::from_config(&config.storage)),
        NoticeBoard::default(),
    );
    first.play(video.clone()).await.unwrap();
    first.time_update(1234.75).await.unwrap();
    assert!(first.close_overlay().await.unwrap());
    first.shutdown().await.unwrap();

    let raw = std::fs::read_to_string(config.storage.progress_path()).unwrap();
    assert!(raw.contains("\"videoProgress_21\": \"1234.75\""));

    let second = spawn_session_coordinator(
        config.playback.clone(),
        Arc::new(MockSourceProvider::new()),
        Arc::new(FileProgressStorage::from_config(&config.storage)),
        NoticeBoard::default(),
    );
    let snapshot = second.play(video).await.unwrap();
    assert_eq!(snapshot.current_time, 1234.75);
    assert!(snapshot.start_from_saved_time);
}

#[tokio::test]
async fn test_clear_removes_single_record() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let storage = Arc::new(FileProgressStorage::from_config(&config.storage));
    storage.set("videoProgress_1", "10").await.unwrap();
    storage.set("videoProgress_2", "20").await.unwrap();

    let store = ProgressStore::new(storage.clone());
    store.clear(VideoId::new(1)).await.unwrap();

    assert_eq!(store.saved_offset(VideoId::new(1)).await, None);
    assert_eq!(store.saved_offset(VideoId::new(2)).await, Some(20.0));
}

#[tokio::test]
async fn test_concurrent_saves_keep_every_record() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let storage: Arc<dyn ProgressStorage> =
        Arc::new(FileProgressStorage::from_config(&config.storage));

    let saves = (1..=8u64).map(|id| {
        let mut store = ProgressStore::new(storage.clone());
        store.update(id as f64 * 10.0);
        async move { store.save(VideoId::new(id)).await }
    });
    for result in join_all(saves).await {
        assert!(result.unwrap());
    }

    let store = ProgressStore::new(storage);
    for id in 1..=8u64 {
        assert_eq!(
            store.saved_offset(VideoId::new(id)).await,
            Some(id as f64 * 10.0)
        );
    }
}
