//! Periodic bandwidth polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::BandwidthSource;
use crate::session::SessionHandle;

/// Polls `source` every `interval` and pushes changed readings to the session.
///
/// The first reading is taken immediately. Identical consecutive readings
/// and missing signals are not forwarded. The task ends once the session
/// actor has stopped.
pub fn spawn_bandwidth_monitor(
    source: Arc<dyn BandwidthSource>,
    handle: SessionHandle,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_sent: Option<f64> = None;

        loop {
            ticker.tick().await;

            let Some(reading) = source.downlink_mbps() else {
                continue;
            };
            if last_sent == Some(reading) {
                continue;
            }

            if handle.report_bandwidth(reading).await.is_err() {
                tracing::debug!("Session closed, stopping bandwidth monitor");
                break;
            }
            last_sent = Some(reading);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VideoflixConfig;
    use crate::domain::QualityTier;
    use crate::network::{ManualBandwidth, NoBandwidthSignal};
    use crate::notice::NoticeBoard;
    use crate::progress::MemoryProgressStorage;
    use crate::session::spawn_session_coordinator;
    use crate::test_mocks::MockSourceProvider;

    fn spawn_session() -> SessionHandle {
        spawn_session_coordinator(
            VideoflixConfig::for_testing().playback,
            Arc::new(MockSourceProvider::new()),
            Arc::new(MemoryProgressStorage::new()),
            NoticeBoard::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_pushes_changed_readings() {
        let handle = spawn_session();
        let bandwidth = ManualBandwidth::new(Some(12.0));
        let task = spawn_bandwidth_monitor(
            Arc::new(bandwidth.clone()),
            handle.clone(),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.snapshot().await.unwrap().network_tier, QualityTier::High);

        bandwidth.set(Some(0.4));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.snapshot().await.unwrap().network_tier, QualityTier::Low);

        handle.shutdown().await.unwrap();
        bandwidth.set(Some(6.0));
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor should stop after shutdown")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_signal_keeps_default_tier() {
        let handle = spawn_session();
        let _task = spawn_bandwidth_monitor(
            Arc::new(NoBandwidthSignal),
            handle.clone(),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.network_tier, QualityTier::Standard);
        assert!(handle.notices().current().quality.is_none());
    }
}
