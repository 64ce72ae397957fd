//! Actor implementation for the playback session.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::commands::SessionCommand;
use super::coordinator::{SessionCoordinator, SessionSnapshot};
use super::handle::SessionHandle;
use crate::config::PlaybackConfig;
use crate::notice::NoticeBoard;
use crate::progress::ProgressStorage;
use crate::source::SourceProvider;

/// Spawns the playback session actor and returns its handle.
///
/// The actor owns all session state and processes commands one at a time.
/// Provider calls run in their own tasks and report back through an internal
/// channel, so a slow backend never blocks time updates or saves.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() {
/// use std::sync::Arc;
///
/// use videoflix_core::config::VideoflixConfig;
/// use videoflix_core::notice::NoticeBoard;
/// use videoflix_core::progress::FileProgressStorage;
/// use videoflix_core::session::spawn_session_coordinator;
/// # use videoflix_core::source::{SourceError, SourceProvider};
/// # use videoflix_core::domain::{QualityTier, VideoId};
/// # #[derive(Debug)]
/// # struct Backend;
/// # #[async_trait::async_trait]
/// # impl SourceProvider for Backend {
/// #     async fn signed_url(&self, _: VideoId, _: QualityTier) -> Result<String, SourceError> {
/// #         Ok(String::new())
/// #     }
/// # }
///
/// let config = VideoflixConfig::default();
/// let storage = Arc::new(FileProgressStorage::from_config(&config.storage));
/// let handle = spawn_session_coordinator(
///     config.playback,
///     Arc::new(Backend),
///     storage,
///     NoticeBoard::default(),
/// );
/// # }
/// ```
pub fn spawn_session_coordinator(
    config: PlaybackConfig,
    provider: Arc<dyn SourceProvider>,
    storage: Arc<dyn ProgressStorage>,
    notices: NoticeBoard,
) -> SessionHandle {
    let (sender, receiver) = mpsc::channel(config.command_buffer.max(1));
    let (completion_sender, completion_receiver) = mpsc::unbounded_channel();
    let (snapshot_sender, snapshot_receiver) =
        watch::channel(SessionSnapshot::idle(config.default_quality));

    let coordinator = SessionCoordinator::new(
        config.clone(),
        provider,
        storage,
        notices.clone(),
        snapshot_sender,
        completion_sender,
    );

    tokio::spawn(async move {
        run_actor_loop(coordinator, receiver, completion_receiver).await;
    });

    SessionHandle::new(sender, snapshot_receiver, notices, config)
}

/// Processes commands until every handle is dropped or shutdown is requested.
///
/// The coordinator keeps a sender for the completion channel, so that channel
/// never closes on its own; the loop ends on the command channel alone.
async fn run_actor_loop(
    mut coordinator: SessionCoordinator,
    mut receiver: mpsc::Receiver<SessionCommand>,
    mut completion_receiver: mpsc::UnboundedReceiver<SessionCommand>,
) {
    tracing::debug!("Session actor started");

    loop {
        let command = tokio::select! {
            command = receiver.recv() => match command {
                Some(command) => command,
                None => break,
            },
            Some(command) = completion_receiver.recv() => command,
        };

        if !handle_command(&mut coordinator, command).await {
            break;
        }
    }

    tracing::debug!("Session actor stopped");
}

/// Handles a single command. Returns false to shut down.
async fn handle_command(coordinator: &mut SessionCoordinator, command: SessionCommand) -> bool {
    match command {
        SessionCommand::SetActiveVideo {
            video,
            policy,
            responder,
        } => {
            let snapshot = coordinator.set_active_video(video, policy).await;
            let _ = responder.send(snapshot);
        }

        SessionCommand::SetQualityOverride { tier, responder } => {
            let snapshot = coordinator.set_quality_override(tier);
            let _ = responder.send(snapshot);
        }

        SessionCommand::ReportBandwidth { mbps } => {
            coordinator.report_bandwidth(mbps);
        }

        SessionCommand::Player(event) => {
            coordinator.player_event(event);
        }

        SessionCommand::SaveProgress {
            video_id,
            responder,
        } => {
            let result = coordinator.save_progress(video_id).await;
            let _ = responder.send(result);
        }

        SessionCommand::CloseOverlay { responder } => {
            let result = coordinator.close_overlay().await;
            let _ = responder.send(result);
        }

        SessionCommand::Reset { responder } => {
            coordinator.reset();
            let _ = responder.send(());
        }

        SessionCommand::Retry { responder } => {
            let snapshot = coordinator.retry();
            let _ = responder.send(snapshot);
        }

        SessionCommand::GetSnapshot { responder } => {
            let _ = responder.send(coordinator.snapshot());
        }

        SessionCommand::Shutdown { responder } => {
            tracing::debug!("Session actor shutting down");
            let _ = responder.send(());
            return false;
        }

        SessionCommand::ResolutionFinished { ticket, result } => {
            coordinator.resolution_finished(ticket, result);
        }
    }

    true
}
