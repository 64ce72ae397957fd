//! CLI command implementations

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Subcommand;
use videoflix_api::{Credentials, VideoflixClient};
use videoflix_core::config::VideoflixConfig;
use videoflix_core::network::{quality_notice, tier_for_speed};
use videoflix_core::notice::{NoticeBoard, NoticeKind};
use videoflix_core::progress::{FileProgressStorage, ProgressStore};
use videoflix_core::session::{SessionHandle, SessionState, spawn_session_coordinator};
use videoflix_core::{Catalog, QualityTier, VideoId};

const TOKEN_ENV: &str = "VIDEOFLIX_TOKEN";

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the catalog grouped by category
    Catalog,
    /// Toggle a video in your favorites
    Favorite {
        /// Video id
        id: u64,
    },
    /// Resolve a playable URL for a video
    Play {
        /// Video id
        id: u64,
        /// Pin the quality (120p, 360p, 720p, 1080p)
        #[arg(short, long)]
        quality: Option<QualityTier>,
        /// Ignore saved progress
        #[arg(long)]
        from_start: bool,
        /// Downlink estimate in Mbps used to pick the quality
        #[arg(long)]
        bandwidth: Option<f64>,
        /// Record this playback position (seconds) after resolving
        #[arg(long)]
        position: Option<f64>,
    },
    /// Resolve the URL of the featured teaser
    Teaser,
    /// Inspect or clear saved progress
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
    /// Show the quality picked for a downlink speed
    Quality {
        /// Downlink speed in Mbps
        #[arg(long)]
        speed: f64,
    },
}

/// Saved progress operations
#[derive(Subcommand)]
pub enum ProgressAction {
    /// Show the saved offset of a video
    Show {
        /// Video id
        id: u64,
    },
    /// Delete the saved offset of a video
    Clear {
        /// Video id
        id: u64,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands, config: VideoflixConfig) -> anyhow::Result<()> {
    match command {
        Commands::Catalog => show_catalog(&config).await,
        Commands::Favorite { id } => toggle_favorite(&config, VideoId::new(id)).await,
        Commands::Play {
            id,
            quality,
            from_start,
            bandwidth,
            position,
        } => {
            let options = PlayOptions {
                quality,
                from_start,
                bandwidth,
                position,
            };
            play(&config, VideoId::new(id), options).await
        }
        Commands::Teaser => show_teaser(&config).await,
        Commands::Progress { action } => manage_progress(&config, action).await,
        Commands::Quality { speed } => {
            show_quality(speed);
            Ok(())
        }
    }
}

struct PlayOptions {
    quality: Option<QualityTier>,
    from_start: bool,
    bandwidth: Option<f64>,
    position: Option<f64>,
}

/// Builds the API client, taking the access token from the environment.
///
/// The token is held in memory for this process only.
fn build_client(config: &VideoflixConfig, notices: &NoticeBoard) -> anyhow::Result<VideoflixClient> {
    let mut client = VideoflixClient::new(&config.api)
        .context("Invalid API configuration")?
        .with_notices(notices.clone());

    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            client = client.with_credentials(Credentials::with_token(token.trim()));
        }
    }
    tracing::debug!(
        api = client.base_url(),
        authenticated = client.credentials().is_present(),
        "API client ready"
    );

    Ok(client)
}

fn spawn_session(config: &VideoflixConfig, client: &VideoflixClient, notices: &NoticeBoard) -> SessionHandle {
    spawn_session_coordinator(
        config.playback.clone(),
        Arc::new(client.clone()),
        Arc::new(FileProgressStorage::from_config(&config.storage)),
        notices.clone(),
    )
}

async fn load_catalog(client: &VideoflixClient) -> anyhow::Result<Catalog> {
    let videos = client
        .list_videos()
        .await
        .context("Failed to fetch videos")?;
    Ok(Catalog::new(videos))
}

fn print_notice(notices: &NoticeBoard) {
    let current = notices.current();
    for kind in [NoticeKind::Quality, NoticeKind::Success, NoticeKind::Error] {
        if let Some(message) = current.message(kind) {
            println!("[{kind:?}] {message}");
        }
    }
}

/// Print the catalog grouped by category
async fn show_catalog(config: &VideoflixConfig) -> anyhow::Result<()> {
    let notices = NoticeBoard::new(config.playback.message_ttl, config.playback.quality_notice_ttl);
    let client = build_client(config, &notices)?;
    let catalog = load_catalog(&client).await?;

    if catalog.is_empty() {
        println!("No videos available.");
        return Ok(());
    }

    for group in catalog.by_category() {
        println!("{}", group.category);
        for video in group.videos {
            let state = if video.is_playable() {
                String::new()
            } else {
                format!(" ({:?})", video.processing_state)
            };
            println!("  [{}] {}{}", video.id, video.title, state);
        }
    }

    if let Some(teaser) = catalog.teaser() {
        println!();
        println!("Featured: [{}] {}", teaser.id, teaser.title);
    }

    Ok(())
}

/// Toggle favorite membership and print the resulting set
async fn toggle_favorite(config: &VideoflixConfig, video_id: VideoId) -> anyhow::Result<()> {
    let notices = NoticeBoard::new(config.playback.message_ttl, config.playback.quality_notice_ttl);
    let client = build_client(config, &notices)?;

    let favorites = client
        .toggle_favorite(video_id)
        .await
        .context("Failed to store favorite video")?;

    let state = if favorites.contains(&video_id) {
        "added to"
    } else {
        "removed from"
    };
    println!("Video {video_id} {state} favorites.");
    let ids: Vec<String> = favorites.iter().map(ToString::to_string).collect();
    println!("Favorites: [{}]", ids.join(", "));

    Ok(())
}

/// Resolve a playable URL through a playback session
async fn play(config: &VideoflixConfig, video_id: VideoId, options: PlayOptions) -> anyhow::Result<()> {
    let notices = NoticeBoard::new(config.playback.message_ttl, config.playback.quality_notice_ttl);
    let client = build_client(config, &notices)?;
    let catalog = load_catalog(&client).await?;
    let Some(video) = catalog.get(video_id).cloned() else {
        bail!("Video {video_id} is not in the catalog");
    };

    let session = spawn_session(config, &client, &notices);
    if let Some(mbps) = options.bandwidth {
        session.report_bandwidth(mbps).await?;
    }
    if options.quality.is_some() {
        session.set_quality_override(options.quality).await?;
    }

    let snapshot = if options.from_start {
        session.begin_from_start(video.clone()).await?
    } else {
        session.play(video.clone()).await?
    };

    let url = wait_for_resolution(&session, config).await;
    print_notice(&notices);
    let Some(url) = url else {
        tracing::warn!(video_id = %video_id, state = ?session.current().state, "No source resolved");
        session.shutdown().await?;
        bail!("No playable URL for video {video_id}");
    };

    let resolved = session.current();
    tracing::info!(
        video_id = %video_id,
        tier = %resolved.tier,
        network_tier = %resolved.network_tier,
        pinned = resolved.quality_override.is_some(),
        "Source resolved"
    );
    println!("{} ({})", video.title, resolved.tier);
    println!("{url}");
    if snapshot.start_from_saved_time {
        println!("Resume at {:.1}s", snapshot.current_time);
    }

    if let Some(position) = options.position {
        session.time_update(position).await?;
        if session.save_progress().await? {
            println!("Saved position {position:.1}s");
        }
    }

    session.shutdown().await?;
    Ok(())
}

/// Waits for the session to settle on a URL or a failure.
async fn wait_for_resolution(session: &SessionHandle, config: &VideoflixConfig) -> Option<String> {
    let mut updates = session.subscribe();
    let settled = tokio::time::timeout(
        config.api.request_timeout,
        updates.wait_for(|snapshot| {
            matches!(
                snapshot.state,
                SessionState::Ready { .. } | SessionState::Failed { .. } | SessionState::Idle
            )
        }),
    )
    .await;

    match settled {
        Ok(Ok(snapshot)) => snapshot.source_url().map(str::to_string),
        _ => None,
    }
}

/// Resolve the featured teaser without touching saved progress
async fn show_teaser(config: &VideoflixConfig) -> anyhow::Result<()> {
    let notices = NoticeBoard::new(config.playback.message_ttl, config.playback.quality_notice_ttl);
    let client = build_client(config, &notices)?;
    let catalog = load_catalog(&client).await?;
    let Some(teaser) = catalog.teaser().cloned() else {
        println!("No videos available.");
        return Ok(());
    };

    let session = spawn_session(config, &client, &notices);
    let url = session.prepare_teaser(teaser.clone()).await?;
    session.shutdown().await?;

    match url {
        Some(url) => {
            println!("{}", teaser.title);
            println!("{url}");
        }
        None => {
            print_notice(&notices);
            println!("Teaser for '{}' is not available yet.", teaser.title);
        }
    }
    Ok(())
}

/// Show or clear saved progress records
async fn manage_progress(config: &VideoflixConfig, action: ProgressAction) -> anyhow::Result<()> {
    let storage = FileProgressStorage::from_config(&config.storage);
    let path = storage.path().display().to_string();
    let store = ProgressStore::new(Arc::new(storage));
    tracing::debug!(path = %path, "Using progress file");

    match action {
        ProgressAction::Show { id } => match store.saved_offset(VideoId::new(id)).await {
            Some(offset) => println!("Video {id}: {offset:.1}s"),
            None => println!("Video {id}: no saved progress"),
        },
        ProgressAction::Clear { id } => {
            store
                .clear(VideoId::new(id))
                .await
                .with_context(|| format!("Failed to update {path}"))?;
            println!("Cleared saved progress for video {id}");
        }
    }
    Ok(())
}

/// Print the tier and notice for a downlink speed
fn show_quality(speed: f64) {
    let tier = tier_for_speed(speed);
    println!("{speed} Mbps -> {tier}");
    println!("{}", quality_notice(tier));
}
