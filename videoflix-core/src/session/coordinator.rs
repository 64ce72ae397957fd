//! Playback session state owned by the session actor.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::commands::{PlayerEvent, SessionCommand, StartPolicy};
use crate::config::PlaybackConfig;
use crate::domain::{QualityTier, Video, VideoId};
use crate::network::NetworkQualityMonitor;
use crate::notice::NoticeBoard;
use crate::progress::{ProgressStorage, ProgressStore, StorageError};
use crate::source::{Completion, DedupKey, ResolveStep, ResolveTicket, SourceError, SourceProvider, SourceResolver};

const SOURCE_FAILURE_NOTICE: &str = "Failed to fetch signed video URL";
const PLAYBACK_FAILURE_NOTICE: &str = "Video playback failed";

/// Where the session stands with respect to a playable source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No active video
    Idle,
    /// A URL for `key` has been requested
    Resolving { key: DedupKey },
    /// The player may load `url`
    Ready { key: DedupKey, url: String },
    /// The last request for `key` failed; a retry or new trigger re-requests
    Failed { key: DedupKey, reason: String },
}

/// Observable state of a playback session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub video: Option<Video>,
    /// In-memory playback offset in seconds
    pub current_time: f64,
    /// Whether the player should seek to `current_time` on load
    pub start_from_saved_time: bool,
    pub has_saved_progress: bool,
    /// Tier used for resolution: the override if set, else the monitor's
    pub tier: QualityTier,
    pub quality_override: Option<QualityTier>,
    /// Tier suggested by the last bandwidth reading
    pub network_tier: QualityTier,
    pub preview: bool,
    pub playback_ended: bool,
}

impl SessionSnapshot {
    /// Snapshot of a session that has never been used.
    pub fn idle(default_tier: QualityTier) -> Self {
        Self {
            state: SessionState::Idle,
            video: None,
            current_time: 0.0,
            start_from_saved_time: false,
            has_saved_progress: false,
            tier: default_tier,
            quality_override: None,
            network_tier: default_tier,
            preview: false,
            playback_ended: false,
        }
    }

    /// Playable URL, once the session is ready.
    pub fn source_url(&self) -> Option<&str> {
        match &self.state {
            SessionState::Ready { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Id of the active video.
    pub fn video_id(&self) -> Option<VideoId> {
        self.video.as_ref().map(|video| video.id)
    }
}

/// Session state machine driven by the actor loop.
///
/// Holds the active video, the progress store, the source resolver and the
/// network monitor. Every trigger recomputes the `(video, tier)` key and only
/// a key that is not already pending or resolved issues a provider call.
pub struct SessionCoordinator {
    config: PlaybackConfig,
    video: Option<Video>,
    policy: StartPolicy,
    start_from_saved_time: bool,
    playback_ended: bool,
    quality_override: Option<QualityTier>,
    monitor: NetworkQualityMonitor,
    progress: ProgressStore,
    resolver: SourceResolver,
    last_failure: Option<(DedupKey, String)>,
    notices: NoticeBoard,
    snapshot_sender: watch::Sender<SessionSnapshot>,
    completion_sender: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionCoordinator {
    pub fn new(
        config: PlaybackConfig,
        provider: Arc<dyn SourceProvider>,
        storage: Arc<dyn ProgressStorage>,
        notices: NoticeBoard,
        snapshot_sender: watch::Sender<SessionSnapshot>,
        completion_sender: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        Self {
            monitor: NetworkQualityMonitor::new(config.default_quality),
            config,
            video: None,
            policy: StartPolicy::Resume,
            start_from_saved_time: false,
            playback_ended: false,
            quality_override: None,
            progress: ProgressStore::new(storage),
            resolver: SourceResolver::new(provider),
            last_failure: None,
            notices,
            snapshot_sender,
            completion_sender,
        }
    }

    /// Tier used for resolution.
    pub fn effective_tier(&self) -> QualityTier {
        self.quality_override.unwrap_or(self.monitor.tier())
    }

    fn active_key(&self) -> Option<DedupKey> {
        self.video
            .as_ref()
            .map(|video| DedupKey::new(video.id, self.effective_tier()))
    }

    /// Selects `video` under `policy`, or clears the selection.
    ///
    /// Clearing keeps the in-memory offset so a caller can still save it,
    /// unless the cleared video was a preview.
    pub async fn set_active_video(
        &mut self,
        video: Option<Video>,
        policy: StartPolicy,
    ) -> SessionSnapshot {
        match video {
            None => self.clear_video(),
            Some(video) => {
                match policy {
                    StartPolicy::Resume => {
                        self.progress.load(video.id).await;
                        self.start_from_saved_time = self.progress.has_saved_progress();
                    }
                    StartPolicy::FromStart | StartPolicy::Preview => {
                        self.progress.reset();
                        self.start_from_saved_time = false;
                        self.resolver.invalidate();
                    }
                }

                tracing::info!(video_id = %video.id, ?policy, "Active video set");
                self.video = Some(video);
                self.policy = policy;
                self.playback_ended = false;
                self.last_failure = None;
                self.refresh_source();
            }
        }
        self.publish()
    }

    fn clear_video(&mut self) {
        if let Some(video) = self.video.take() {
            tracing::info!(video_id = %video.id, "Active video cleared");
        }
        if self.policy == StartPolicy::Preview {
            self.progress.reset();
        }
        self.policy = StartPolicy::Resume;
        self.start_from_saved_time = false;
        self.playback_ended = false;
        self.last_failure = None;
        self.resolver.invalidate();
    }

    /// Pins the tier, or hands it back to the network monitor.
    pub fn set_quality_override(&mut self, tier: Option<QualityTier>) -> SessionSnapshot {
        let before = self.effective_tier();
        self.quality_override = tier;
        if self.effective_tier() != before {
            tracing::info!(from = %before, to = %self.effective_tier(), "Quality override changed");
            self.refresh_source();
        }
        self.publish()
    }

    /// Feeds a bandwidth reading into the monitor.
    pub fn report_bandwidth(&mut self, mbps: f64) {
        let before = self.effective_tier();
        let Some(observation) = self.monitor.observe(mbps) else {
            return;
        };

        match self.quality_override {
            None => {
                self.notices.show_quality(observation.notice());
            }
            Some(pinned) => {
                tracing::debug!(%pinned, network = %observation.tier, "Quality pinned, notice suppressed");
            }
        }
        if self.effective_tier() != before {
            self.refresh_source();
        }
        self.publish();
    }

    /// Applies a player event.
    pub fn player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::TimeUpdate(time) => {
                if self.video.is_none() {
                    return;
                }
                self.progress.update(time);
            }
            PlayerEvent::Ended => {
                tracing::info!(video_id = ?self.video.as_ref().map(|v| v.id), "Playback ended");
                self.playback_ended = true;
            }
            PlayerEvent::Error(reason) => {
                tracing::warn!(video_id = ?self.video.as_ref().map(|v| v.id), "Player error: {reason}");
                self.notices.show_error(PLAYBACK_FAILURE_NOTICE);
            }
        }
        self.publish();
    }

    /// Persists the in-memory offset for `video_id`, or the active video.
    ///
    /// Preview sessions never write progress.
    pub async fn save_progress(&self, video_id: Option<VideoId>) -> Result<bool, StorageError> {
        let Some(target) = video_id.or_else(|| self.video.as_ref().map(|v| v.id)) else {
            return Ok(false);
        };

        if self.policy == StartPolicy::Preview {
            tracing::debug!(video_id = %target, "Skipping progress save during preview");
            return Ok(false);
        }

        self.progress.save(target).await.inspect_err(|e| {
            tracing::warn!(video_id = %target, "Failed to save progress: {e}");
        })
    }

    /// Saves progress for the active video, then clears it.
    ///
    /// The video is cleared even when the save fails.
    pub async fn close_overlay(&mut self) -> Result<bool, StorageError> {
        let saved = self.save_progress(None).await;
        self.clear_video();
        self.publish();
        saved
    }

    /// Returns to idle without persisting anything.
    pub fn reset(&mut self) {
        self.clear_video();
        self.progress.reset();
        tracing::debug!("Session reset");
        self.publish();
    }

    /// Re-requests the source for the active pair.
    pub fn retry(&mut self) -> SessionSnapshot {
        self.refresh_source();
        self.publish()
    }

    /// Applies the outcome of a provider call.
    pub fn resolution_finished(&mut self, ticket: ResolveTicket, result: Result<String, SourceError>) {
        match self.resolver.complete(ticket, result) {
            Completion::Ready(_) => {
                self.last_failure = None;
                self.notices.clear_quality_after(self.config.quality_notice_ttl);
            }
            Completion::Failed(e) => {
                self.last_failure = Some((ticket.key, e.to_string()));
                self.notices.show_error(SOURCE_FAILURE_NOTICE);
            }
            Completion::Stale => return,
        }
        self.publish();
    }

    fn refresh_source(&mut self) {
        let Some(key) = self.active_key() else {
            return;
        };

        if let ResolveStep::Fetch(ticket) = self.resolver.request(key, None) {
            self.last_failure = None;
            let fetch = self.resolver.fetch(ticket);
            let sender = self.completion_sender.clone();
            tokio::spawn(async move {
                let result = fetch.await;
                let _ = sender.send(SessionCommand::ResolutionFinished { ticket, result });
            });
        }
    }

    /// Current observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = match self.active_key() {
            None => SessionState::Idle,
            Some(key) => match (self.resolver.key(), self.resolver.current_url()) {
                (Some(current), Some(url)) if current == key => SessionState::Ready {
                    key,
                    url: url.to_string(),
                },
                _ => match &self.last_failure {
                    Some((failed, reason)) if *failed == key => SessionState::Failed {
                        key,
                        reason: reason.clone(),
                    },
                    _ => SessionState::Resolving { key },
                },
            },
        };

        SessionSnapshot {
            state,
            video: self.video.clone(),
            current_time: self.progress.current_time(),
            start_from_saved_time: self.start_from_saved_time,
            has_saved_progress: self.progress.has_saved_progress(),
            tier: self.effective_tier(),
            quality_override: self.quality_override,
            network_tier: self.monitor.tier(),
            preview: self.video.is_some() && self.policy == StartPolicy::Preview,
            playback_ended: self.playback_ended,
        }
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        self.snapshot_sender.send_replace(snapshot.clone());
        snapshot
    }
}
