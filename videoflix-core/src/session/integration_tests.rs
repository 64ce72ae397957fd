//! End-to-end tests for the playback session actor.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::VideoflixError;
    use crate::config::VideoflixConfig;
    use crate::domain::{QualityTier, Video, VideoId};
    use crate::notice::{NoticeBoard, NoticeKind};
    use crate::progress::MemoryProgressStorage;
    use crate::session::{SessionHandle, SessionSnapshot, SessionState, spawn_session_coordinator};
    use crate::test_mocks::MockSourceProvider;

    fn spawn(provider: &MockSourceProvider, storage: &MemoryProgressStorage) -> SessionHandle {
        spawn_session_coordinator(
            VideoflixConfig::for_testing().playback,
            Arc::new(provider.clone()),
            Arc::new(storage.clone()),
            NoticeBoard::default(),
        )
    }

    fn video(id: u64) -> Video {
        Video::new(id, format!("Video {id}"), "Documentary")
    }

    async fn wait_for_state(
        handle: &SessionHandle,
        predicate: impl Fn(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut receiver = handle.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(|s| predicate(s)))
            .await
            .expect("timed out waiting for session state")
            .expect("session closed");
        snapshot.clone()
    }

    async fn ready_url(handle: &SessionHandle) -> String {
        let snapshot = wait_for_state(handle, |s| s.source_url().is_some()).await;
        snapshot.source_url().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_first_play_starts_at_zero() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();
        let handle = spawn(&provider, &storage);

        let snapshot = handle.play(video(1)).await.unwrap();
        assert_eq!(snapshot.current_time, 0.0);
        assert!(!snapshot.has_saved_progress);
        assert!(!snapshot.start_from_saved_time);
        assert!(matches!(snapshot.state, SessionState::Resolving { .. }));
    }

    #[tokio::test]
    async fn test_saved_progress_resumes_in_new_session() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();

        let handle = spawn(&provider, &storage);
        handle.play(video(1)).await.unwrap();
        handle.time_update(42.5).await.unwrap();
        assert!(handle.save_progress().await.unwrap());
        handle.shutdown().await.unwrap();

        let resumed = spawn(&provider, &storage);
        let snapshot = resumed.play(video(1)).await.unwrap();
        assert_eq!(snapshot.current_time, 42.5);
        assert!(snapshot.start_from_saved_time);
        assert!(snapshot.has_saved_progress);
    }

    #[tokio::test]
    async fn test_zero_offset_save_keeps_existing_record() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();
        storage.insert("videoProgress_9", "41");
        let handle = spawn(&provider, &storage);

        let snapshot = handle.begin_from_start(video(9)).await.unwrap();
        assert_eq!(snapshot.current_time, 0.0);
        assert!(!snapshot.start_from_saved_time);
        assert!(!handle.save_progress().await.unwrap());

        handle.play(video(10)).await.unwrap();
        assert!(!handle.save_progress().await.unwrap());

        let records = storage.snapshot();
        assert_eq!(records.get("videoProgress_9").map(String::as_str), Some("41"));
        assert!(!records.contains_key("videoProgress_10"));
    }

    #[tokio::test]
    async fn test_selecting_same_video_twice_resolves_once() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(1)).await.unwrap();
        let first = ready_url(&handle).await;
        handle.play(video(1)).await.unwrap();
        let second = ready_url(&handle).await;

        assert_eq!(first, second);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_request_is_not_repeated() {
        let provider = MockSourceProvider::with_delay(Duration::from_millis(200));
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(3)).await.unwrap();
        handle.play(video(3)).await.unwrap();
        handle.report_bandwidth(5.0).await.unwrap();
        ready_url(&handle).await;

        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_selections_share_one_fetch() {
        let provider = MockSourceProvider::with_delay(Duration::from_millis(50));
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        let selections = (0..6).map(|_| handle.play(video(8)));
        for result in futures::future::join_all(selections).await {
            tokio_test::assert_ok!(result);
        }
        let url = ready_url(&handle).await;

        assert!(url.starts_with("https://cdn.videoflix.test/8/"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_tier_change_requests_new_url_once() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(1)).await.unwrap();
        let standard = ready_url(&handle).await;

        handle.set_quality_override(Some(QualityTier::High)).await.unwrap();
        let snapshot = wait_for_state(&handle, |s| {
            s.tier == QualityTier::High && s.source_url().is_some()
        })
        .await;

        let high = snapshot.source_url().unwrap();
        assert_ne!(high, standard);
        assert_eq!(high, MockSourceProvider::url_for(VideoId::new(1), QualityTier::High, 2));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_bandwidth_readings_pick_tier_and_post_notice() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        for (mbps, tier) in [
            (10.0, QualityTier::High),
            (5.0, QualityTier::Standard),
            (2.0, QualityTier::Medium),
            (0.5, QualityTier::Low),
        ] {
            handle.report_bandwidth(mbps).await.unwrap();
            let snapshot = handle.snapshot().await.unwrap();
            assert_eq!(snapshot.network_tier, tier);
            assert_eq!(snapshot.tier, tier);
        }

        assert_eq!(
            handle.notices().current().message(NoticeKind::Quality),
            Some("Video quality has been reduced due to your slow connection.")
        );
    }

    #[tokio::test]
    async fn test_pinned_quality_suppresses_bandwidth_notice() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle
            .set_quality_override(Some(QualityTier::Medium))
            .await
            .unwrap();
        handle.report_bandwidth(12.0).await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.network_tier, QualityTier::High);
        assert_eq!(snapshot.tier, QualityTier::Medium);
        assert_eq!(handle.notices().current().message(NoticeKind::Quality), None);

        handle.set_quality_override(None).await.unwrap();
        handle.report_bandwidth(3.0).await.unwrap();
        assert_eq!(
            handle.notices().current().message(NoticeKind::Quality),
            Some("Video quality has been adjusted due to your moderate connection.")
        );
    }

    #[tokio::test]
    async fn test_network_change_refetches_active_video() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(4)).await.unwrap();
        ready_url(&handle).await;
        handle.report_bandwidth(0.8).await.unwrap();
        let snapshot = wait_for_state(&handle, |s| {
            s.tier == QualityTier::Low && s.source_url().is_some()
        })
        .await;

        assert_eq!(
            provider.calls().last().map(|key| key.tier),
            Some(QualityTier::Low)
        );
        assert!(snapshot.source_url().unwrap().contains("120p"));
    }

    #[tokio::test]
    async fn test_teaser_leaves_no_progress_record() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();
        let handle = spawn(&provider, &storage);

        let url = handle.prepare_teaser(video(7)).await.unwrap();
        assert!(url.is_some());

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(snapshot.video.is_none());
        assert!(storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_preview_session_refuses_to_save() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();
        let handle = spawn(&provider, &storage);

        handle
            .set_active_video(Some(video(8)), crate::session::StartPolicy::Preview)
            .await
            .unwrap();
        handle.time_update(12.0).await.unwrap();

        assert!(!handle.save_progress().await.unwrap());
        assert!(handle.snapshot().await.unwrap().preview);
        assert!(storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_cleared_preview_drops_its_offset() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();
        let handle = spawn(&provider, &storage);

        handle
            .set_active_video(Some(video(8)), crate::session::StartPolicy::Preview)
            .await
            .unwrap();
        handle.time_update(12.0).await.unwrap();
        let cleared = handle.clear_active_video().await.unwrap();

        assert_eq!(cleared.current_time, 0.0);
        assert!(!handle.save_progress_for(VideoId::new(8)).await.unwrap());
        assert!(storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_cleared_video_keeps_offset_for_explicit_save() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();
        let handle = spawn(&provider, &storage);

        handle.play(video(9)).await.unwrap();
        handle.time_update(33.0).await.unwrap();
        handle.clear_active_video().await.unwrap();

        assert!(handle.save_progress_for(VideoId::new(9)).await.unwrap());
        assert_eq!(
            storage.snapshot().get("videoProgress_9").map(String::as_str),
            Some("33")
        );
    }

    #[tokio::test]
    async fn test_reset_clears_session_and_allows_refetch() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(5)).await.unwrap();
        ready_url(&handle).await;
        handle.time_update(17.0).await.unwrap();
        handle.reset().await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(snapshot.current_time, 0.0);
        assert!(!snapshot.has_saved_progress);
        assert!(snapshot.source_url().is_none());

        handle.play(video(5)).await.unwrap();
        ready_url(&handle).await;
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_begin_from_start_forces_fresh_url() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(6)).await.unwrap();
        let first = ready_url(&handle).await;
        handle.begin_from_start(video(6)).await.unwrap();
        let snapshot = wait_for_state(&handle, |s| {
            s.source_url().is_some_and(|url| url != first)
        })
        .await;

        assert!(!snapshot.start_from_saved_time);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_resolution_is_discarded() {
        let provider = MockSourceProvider::with_delay(Duration::from_millis(100));
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(1)).await.unwrap();
        handle.play(video(2)).await.unwrap();
        let url = ready_url(&handle).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(url.starts_with("https://cdn.videoflix.test/2/"));
        assert_eq!(handle.current().source_url(), Some(url.as_str()));
        assert_eq!(handle.current().video_id(), Some(VideoId::new(2)));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_ignores_source_of_another_video() {
        let provider = MockSourceProvider::with_delay(Duration::from_millis(100));
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        let other_view = handle.clone();
        let switch = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            other_view.play(video(13)).await.unwrap();
        });

        let opened = handle.open_overlay(video(12)).await.unwrap();
        switch.await.unwrap();

        assert_eq!(opened, None);
        let url = ready_url(&handle).await;
        assert!(url.starts_with("https://cdn.videoflix.test/13/"));
        assert_eq!(handle.wait_for_source(VideoId::new(12)).await, None);
        assert_eq!(handle.wait_for_source(VideoId::new(13)).await, Some(url));
    }

    #[tokio::test]
    async fn test_failed_resolution_posts_notice_and_retries() {
        let provider = MockSourceProvider::new();
        provider.fail_next(1);
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(2)).await.unwrap();
        wait_for_state(&handle, |s| matches!(s.state, SessionState::Failed { .. })).await;
        assert_eq!(
            handle.notices().current().message(NoticeKind::Error),
            Some("Failed to fetch signed video URL")
        );

        handle.retry().await.unwrap();
        ready_url(&handle).await;
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_close_overlay_saves_then_clears() {
        let provider = MockSourceProvider::new();
        let storage = MemoryProgressStorage::new();
        let handle = spawn(&provider, &storage);

        let url = handle.open_overlay(video(11)).await.unwrap();
        assert!(url.is_some());
        handle.time_update(64.0).await.unwrap();

        assert!(handle.close_overlay().await.unwrap());
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.video.is_none());
        assert_eq!(
            storage.snapshot().get("videoProgress_11").map(String::as_str),
            Some("64")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_wait_is_bounded() {
        let provider = MockSourceProvider::with_delay(Duration::from_secs(60));
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        let started = tokio::time::Instant::now();
        let url = handle.open_overlay(video(12)).await.unwrap();

        assert!(url.is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(
            handle.notices().current().message(NoticeKind::Quality),
            Some("Optimizing video for your screen.")
        );
    }

    #[tokio::test]
    async fn test_player_error_surfaces_notice() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.play(video(13)).await.unwrap();
        handle.player_error("decode failure").await.unwrap();
        handle.playback_ended().await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.playback_ended);
        assert_eq!(
            handle.notices().current().message(NoticeKind::Error),
            Some("Video playback failed")
        );
    }

    #[tokio::test]
    async fn test_calls_fail_after_shutdown() {
        let provider = MockSourceProvider::new();
        let handle = spawn(&provider, &MemoryProgressStorage::new());

        handle.shutdown().await.unwrap();
        let result = handle.play(video(1)).await;
        assert!(matches!(result, Err(VideoflixError::SessionClosed)));
    }
}
