//! Authenticated user as seen by the playback core.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::video::VideoId;

/// User profile owned by the authentication component.
///
/// The core only reads the favorite set; everything else is carried for
/// display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub favorite_videos: BTreeSet<VideoId>,
}

impl User {
    /// Whether `video_id` is in the user's favorites.
    pub fn is_favorite(&self, video_id: VideoId) -> bool {
        self.favorite_videos.contains(&video_id)
    }

    /// Replaces the favorite set with the one returned by the toggle endpoint.
    pub fn set_favorites(&mut self, favorites: impl IntoIterator<Item = VideoId>) {
        self.favorite_videos = favorites.into_iter().collect();
    }
}
