//! Video catalog entries as delivered by the content API.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quality::QualityTier;

/// Unique identifier for a video.
///
/// The backend uses positive integers; `0` marks a placeholder entry that
/// never had an identifier assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(u64);

impl VideoId {
    /// Creates a video identifier from its numeric value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric value of the identifier.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether the backend assigned this identifier.
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VideoId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Transcoding state reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    /// Upload accepted, transcoding not yet started
    Pending,
    /// Transcoding in progress
    Processing,
    /// All renditions available
    #[default]
    Ready,
    /// Transcoding failed, see `processing_error`
    Error,
}

/// A catalog video.
///
/// Immutable once loaded; the catalog replaces the whole list on reload.
/// Missing fields fall back to empty values so a partially populated
/// response still yields a usable entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub id: VideoId,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Thumbnail reference, relative to the media host
    #[serde(default)]
    pub image_file: String,
    /// Original upload reference
    #[serde(default)]
    pub video_file: String,
    /// Rendition label (`360p`, ...) to file reference
    #[serde(default)]
    pub converted_files: BTreeMap<String, String>,
    #[serde(default)]
    pub processing_state: ProcessingState,
    #[serde(default)]
    pub processing_error: Option<String>,
}

impl Video {
    /// Creates a ready video with only the identifying fields populated.
    pub fn new(id: impl Into<VideoId>, title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            title: title.into(),
            description: String::new(),
            category: category.into(),
            image_file: String::new(),
            video_file: String::new(),
            converted_files: BTreeMap::new(),
            processing_state: ProcessingState::Ready,
            processing_error: None,
        }
    }

    /// File reference of the rendition for `tier`, if it was transcoded.
    pub fn file_for(&self, tier: QualityTier) -> Option<&str> {
        self.converted_files.get(tier.label()).map(String::as_str)
    }

    /// Whether the backend finished transcoding this video.
    pub fn is_playable(&self) -> bool {
        self.processing_state == ProcessingState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_payload() {
        let json = r#"{
            "id": 7,
            "created_at": "2025-03-01T10:15:00Z",
            "title": "Ocean",
            "description": "Waves",
            "category": "Nature",
            "image_file": "/media/thumbs/ocean.jpg",
            "video_file": "/media/videos/ocean.mp4",
            "converted_files": {"360p": "/media/ocean_360p.mp4", "720p": "/media/ocean_720p.mp4"},
            "processing_state": "processing",
            "processing_error": null
        }"#;

        let video: Video = serde_json::from_str(json).unwrap();
        assert_eq!(video.id, VideoId::new(7));
        assert_eq!(video.category, "Nature");
        assert_eq!(video.processing_state, ProcessingState::Processing);
        assert_eq!(video.file_for(QualityTier::Medium), Some("/media/ocean_360p.mp4"));
        assert_eq!(video.file_for(QualityTier::High), None);
        assert!(!video.is_playable());
    }

    #[test]
    fn test_deserialize_sparse_payload_uses_defaults() {
        let video: Video = serde_json::from_str(r#"{"title": "Untitled"}"#).unwrap();
        assert!(!video.id.is_assigned());
        assert_eq!(video.title, "Untitled");
        assert!(video.converted_files.is_empty());
        assert_eq!(video.processing_state, ProcessingState::Ready);
        assert!(video.processing_error.is_none());
    }

    #[test]
    fn test_video_id_display() {
        assert_eq!(VideoId::new(42).to_string(), "42");
        assert!(VideoId::from(1).is_assigned());
    }
}
