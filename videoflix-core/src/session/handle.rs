//! Handle for communicating with the playback session actor.

use tokio::sync::{mpsc, oneshot, watch};

use super::commands::{PlayerEvent, SessionCommand, StartPolicy};
use super::coordinator::SessionSnapshot;
use crate::config::PlaybackConfig;
use crate::domain::{QualityTier, Video, VideoId};
use crate::notice::NoticeBoard;
use crate::VideoflixError;

/// Handle for communicating with the playback session actor.
///
/// Cheap to clone; every clone talks to the same session. Once the actor has
/// stopped every call fails with `VideoflixError::SessionClosed`.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    notices: NoticeBoard,
    config: PlaybackConfig,
}

impl SessionHandle {
    /// Creates a new handle with the given command sender.
    pub fn new(
        sender: mpsc::Sender<SessionCommand>,
        snapshots: watch::Receiver<SessionSnapshot>,
        notices: NoticeBoard,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            sender,
            snapshots,
            notices,
            config,
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), VideoflixError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| VideoflixError::SessionClosed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, VideoflixError> {
        let (responder, rx) = oneshot::channel();
        self.send(build(responder)).await?;
        rx.await.map_err(|_| VideoflixError::SessionClosed)
    }

    /// Selects `video` with the given start policy, or clears the selection.
    ///
    /// Returns as soon as the session has recomputed its key; the URL
    /// arrives later through [`subscribe`](Self::subscribe).
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn set_active_video(
        &self,
        video: Option<Video>,
        policy: StartPolicy,
    ) -> Result<SessionSnapshot, VideoflixError> {
        self.request(|responder| SessionCommand::SetActiveVideo {
            video,
            policy,
            responder,
        })
        .await
    }

    /// Selects `video`, resuming from its saved offset.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn play(&self, video: Video) -> Result<SessionSnapshot, VideoflixError> {
        self.set_active_video(Some(video), StartPolicy::Resume).await
    }

    /// Selects `video` from zero with a freshly signed URL.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn begin_from_start(&self, video: Video) -> Result<SessionSnapshot, VideoflixError> {
        self.set_active_video(Some(video), StartPolicy::FromStart)
            .await
    }

    /// Clears the active video without saving.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn clear_active_video(&self) -> Result<SessionSnapshot, VideoflixError> {
        self.set_active_video(None, StartPolicy::Resume).await
    }

    /// Pins the quality tier, or returns control to the network monitor.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn set_quality_override(
        &self,
        tier: Option<QualityTier>,
    ) -> Result<SessionSnapshot, VideoflixError> {
        self.request(|responder| SessionCommand::SetQualityOverride { tier, responder })
            .await
    }

    /// Pushes a downlink bandwidth reading in Mbps.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn report_bandwidth(&self, mbps: f64) -> Result<(), VideoflixError> {
        self.send(SessionCommand::ReportBandwidth { mbps }).await
    }

    /// Reports the player's current position in seconds.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn time_update(&self, seconds: f64) -> Result<(), VideoflixError> {
        self.send(SessionCommand::Player(PlayerEvent::TimeUpdate(seconds)))
            .await
    }

    /// Reports that playback reached the end.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn playback_ended(&self) -> Result<(), VideoflixError> {
        self.send(SessionCommand::Player(PlayerEvent::Ended)).await
    }

    /// Reports a player failure; surfaced to the user as a notice.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn player_error(&self, reason: impl Into<String>) -> Result<(), VideoflixError> {
        self.send(SessionCommand::Player(PlayerEvent::Error(reason.into())))
            .await
    }

    /// Persists the in-memory offset for the active video.
    ///
    /// Returns whether a record was written. Nothing is written for a zero
    /// offset, a preview session or when no video is active.
    ///
    /// # Errors
    /// - `VideoflixError::Storage` - Record could not be written
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn save_progress(&self) -> Result<bool, VideoflixError> {
        self.save_progress_inner(None).await
    }

    /// Persists the in-memory offset as the record for `video_id`.
    ///
    /// # Errors
    /// - `VideoflixError::Storage` - Record could not be written
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn save_progress_for(&self, video_id: VideoId) -> Result<bool, VideoflixError> {
        self.save_progress_inner(Some(video_id)).await
    }

    async fn save_progress_inner(&self, video_id: Option<VideoId>) -> Result<bool, VideoflixError> {
        let result = self
            .request(|responder| SessionCommand::SaveProgress {
                video_id,
                responder,
            })
            .await?;
        Ok(result?)
    }

    /// Saves progress for the active video, then clears it.
    ///
    /// # Errors
    /// - `VideoflixError::Storage` - Record could not be written; the video
    ///   is cleared regardless
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn close_overlay(&self) -> Result<bool, VideoflixError> {
        let result = self
            .request(|responder| SessionCommand::CloseOverlay { responder })
            .await?;
        Ok(result?)
    }

    /// Returns the session to idle without persisting anything.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn reset(&self) -> Result<(), VideoflixError> {
        self.request(|responder| SessionCommand::Reset { responder })
            .await
    }

    /// Requests the source for the active pair again after a failure.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn retry(&self) -> Result<SessionSnapshot, VideoflixError> {
        self.request(|responder| SessionCommand::Retry { responder })
            .await
    }

    /// Fetches the session state from the actor.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn snapshot(&self) -> Result<SessionSnapshot, VideoflixError> {
        self.request(|responder| SessionCommand::GetSnapshot { responder })
            .await
    }

    /// Last published state, without a round trip to the actor.
    pub fn current(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Notice board shared with the session.
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Playback configuration the session was spawned with.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Stops the session actor.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor already stopped
    pub async fn shutdown(&self) -> Result<(), VideoflixError> {
        self.request(|responder| SessionCommand::Shutdown { responder })
            .await
    }
}
