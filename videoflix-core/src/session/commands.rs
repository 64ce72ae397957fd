//! Command definitions for the playback session actor.

use tokio::sync::oneshot;

use super::coordinator::SessionSnapshot;
use crate::domain::{QualityTier, Video, VideoId};
use crate::progress::StorageError;
use crate::source::{ResolveTicket, SourceError};

/// Where playback of a newly selected video starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartPolicy {
    /// Continue from the saved offset, if any
    #[default]
    Resume,
    /// Ignore saved progress and request a fresh URL
    FromStart,
    /// Transient teaser preview; never writes progress
    Preview,
}

/// Events reported by the media player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playback position in seconds
    TimeUpdate(f64),
    /// Playback reached the end of the media
    Ended,
    /// The player failed to decode or fetch the media
    Error(String),
}

/// Commands that can be sent to the session actor.
pub enum SessionCommand {
    /// Select a video, or clear the selection with `None`.
    SetActiveVideo {
        video: Option<Video>,
        policy: StartPolicy,
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Pin the tier, or return to the monitor's choice with `None`.
    SetQualityOverride {
        tier: Option<QualityTier>,
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Feed a downlink bandwidth reading in Mbps.
    ReportBandwidth { mbps: f64 },
    /// Forward a player event.
    Player(PlayerEvent),
    /// Persist the in-memory offset; `None` means the active video.
    SaveProgress {
        video_id: Option<VideoId>,
        responder: oneshot::Sender<Result<bool, StorageError>>,
    },
    /// Save progress for the active video, then clear it.
    CloseOverlay {
        responder: oneshot::Sender<Result<bool, StorageError>>,
    },
    /// Return to idle without persisting anything.
    Reset { responder: oneshot::Sender<()> },
    /// Re-request the source for the active pair after a failure.
    Retry {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Current session snapshot.
    GetSnapshot {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Shutdown the session actor.
    Shutdown { responder: oneshot::Sender<()> },
    /// Internal notification when a provider call finishes.
    ResolutionFinished {
        ticket: ResolveTicket,
        result: Result<String, SourceError>,
    },
}
