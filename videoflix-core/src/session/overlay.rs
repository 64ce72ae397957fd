//! Player overlay and teaser flows built on the session handle.

use super::commands::StartPolicy;
use super::coordinator::SessionState;
use super::handle::SessionHandle;
use crate::VideoflixError;
use crate::domain::{Video, VideoId};

const OPTIMIZING_NOTICE: &str = "Optimizing video for your screen.";

impl SessionHandle {
    /// Polls the published state until a playable URL for `video_id` appears.
    ///
    /// Gives up after the configured number of attempts, or as soon as the
    /// session reports a failed or idle state or switches to another video,
    /// and returns `None` so the caller can proceed without a source.
    pub async fn wait_for_source(&self, video_id: VideoId) -> Option<String> {
        let attempts = self.config().source_wait_attempts;
        let interval = self.config().source_wait_interval;

        for attempt in 0..=attempts {
            let snapshot = self.current();
            match &snapshot.state {
                SessionState::Ready { key, url } if key.video_id == video_id => {
                    return Some(url.clone());
                }
                SessionState::Resolving { key } if key.video_id == video_id => {}
                SessionState::Failed { .. } | SessionState::Idle => return None,
                SessionState::Ready { key, .. } | SessionState::Resolving { key } => {
                    tracing::debug!(
                        expected = %video_id,
                        active = %key.video_id,
                        "Active video changed while waiting for source"
                    );
                    return None;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        tracing::debug!(attempts, "No playable source yet, continuing without one");
        None
    }

    /// Opens the player overlay for `video`, resuming from saved progress.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn open_overlay(&self, video: Video) -> Result<Option<String>, VideoflixError> {
        let video_id = video.id;
        self.notices().show_quality(OPTIMIZING_NOTICE);
        self.play(video).await?;
        Ok(self.wait_for_source(video_id).await)
    }

    /// Resolves a teaser URL for `video` without touching saved progress.
    ///
    /// The video is active only while the URL is fetched; the session is
    /// reset afterwards and no progress record is written.
    ///
    /// # Errors
    /// - `VideoflixError::SessionClosed` - Session actor has stopped
    pub async fn prepare_teaser(&self, video: Video) -> Result<Option<String>, VideoflixError> {
        let video_id = video.id;
        self.set_active_video(Some(video), StartPolicy::Preview)
            .await?;
        let source = self.wait_for_source(video_id).await;
        self.reset().await?;

        tracing::debug!(video_id = %video_id, resolved = source.is_some(), "Teaser prepared");
        Ok(source)
    }
}
