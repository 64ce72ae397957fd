//! Playback progress persistence.
//!
//! [`ProgressStore`] holds the offset of the current session in memory and
//! persists it per video through a [`ProgressStorage`] key-value backend.
//! Records live under `videoProgress_<id>` as a decimal seconds string and
//! are only ever written for offsets greater than zero, so an absent record
//! always means "start from zero".

pub mod file_storage;
pub mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
pub use file_storage::FileProgressStorage;
pub use memory::MemoryProgressStorage;

use crate::domain::VideoId;

/// Durable key-value storage for progress records.
///
/// Mirrors the small string-to-string interface of browser local storage so
/// records stay portable between front ends.
#[async_trait]
pub trait ProgressStorage: Send + Sync + Debug {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the backing medium could not be read
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the backing medium could not be written
    /// - `StorageError::Serialization` - If the record set could not be encoded
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes the value stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the backing medium could not be written
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Errors that occur while reading or writing progress records.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Record set could not be encoded or decoded
    #[error("Progress serialization failed: {reason}")]
    Serialization {
        /// Description of the encoding failure
        reason: String,
    },

    /// Standard I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage key of the progress record for `video_id`.
pub fn progress_key(video_id: VideoId) -> String {
    format!("videoProgress_{video_id}")
}

/// In-memory offset of the current session plus durable per-video records.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    storage: Arc<dyn ProgressStorage>,
    current_time: f64,
    has_saved_progress: bool,
}

impl ProgressStore {
    /// Creates a store over `storage` with an empty session.
    pub fn new(storage: Arc<dyn ProgressStorage>) -> Self {
        Self {
            storage,
            current_time: 0.0,
            has_saved_progress: false,
        }
    }

    /// Current in-memory playback offset in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Whether the last `load` found a saved record.
    pub fn has_saved_progress(&self) -> bool {
        self.has_saved_progress
    }

    /// Loads the saved offset for `video_id` into the session.
    ///
    /// A missing, unreadable or malformed record is treated as no progress:
    /// the offset becomes zero and the saved flag is cleared.
    pub async fn load(&mut self, video_id: VideoId) -> f64 {
        match self.saved_offset(video_id).await {
            Some(offset) => {
                self.current_time = offset;
                self.has_saved_progress = true;
            }
            None => {
                self.current_time = 0.0;
                self.has_saved_progress = false;
            }
        }
        tracing::debug!(
            video_id = %video_id,
            offset = self.current_time,
            saved = self.has_saved_progress,
            "Progress loaded"
        );
        self.current_time
    }

    /// Overwrites the in-memory offset. Nothing is persisted.
    ///
    /// Negative or non-finite times are recorded as zero.
    pub fn update(&mut self, time: f64) {
        self.current_time = if time.is_finite() && time > 0.0 {
            time
        } else {
            0.0
        };
    }

    /// Persists the in-memory offset as the record for `video_id`.
    ///
    /// Returns `Ok(false)` without touching storage when the offset is zero or
    /// the id was never assigned, so an uninitialized session can never
    /// clobber a real saved position.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the record could not be written
    /// - `StorageError::Serialization` - If the record set could not be encoded
    pub async fn save(&self, video_id: VideoId) -> Result<bool, StorageError> {
        if !video_id.is_assigned() || self.current_time <= 0.0 {
            tracing::trace!(video_id = %video_id, "Skipping progress save for empty offset");
            return Ok(false);
        }

        self.storage
            .set(&progress_key(video_id), &self.current_time.to_string())
            .await?;
        tracing::debug!(video_id = %video_id, offset = self.current_time, "Progress saved");
        Ok(true)
    }

    /// Clears the in-memory session without persisting anything.
    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.has_saved_progress = false;
    }

    /// Reads the saved offset for `video_id` without touching the session.
    pub async fn saved_offset(&self, video_id: VideoId) -> Option<f64> {
        let raw = match self.storage.get(&progress_key(video_id)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(video_id = %video_id, "Failed to read progress record: {e}");
                return None;
            }
        };

        match raw.trim().parse::<f64>() {
            Ok(offset) if offset.is_finite() && offset > 0.0 => Some(offset),
            _ => {
                tracing::warn!(video_id = %video_id, record = %raw, "Ignoring malformed progress record");
                None
            }
        }
    }

    /// Deletes the durable record for `video_id`.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the record could not be removed
    pub async fn clear(&self, video_id: VideoId) -> Result<(), StorageError> {
        self.storage.remove(&progress_key(video_id)).await
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn store_over(storage: &MemoryProgressStorage) -> ProgressStore {
        ProgressStore::new(Arc::new(storage.clone()))
    }

    #[tokio::test]
    async fn test_load_without_record_starts_at_zero() {
        let storage = MemoryProgressStorage::new();
        let mut store = store_over(&storage);

        assert_eq!(store.load(VideoId::new(1)).await, 0.0);
        assert!(!store.has_saved_progress());
    }

    #[tokio::test]
    async fn test_save_then_load_in_new_store() {
        let storage = MemoryProgressStorage::new();
        let mut store = store_over(&storage);
        store.update(93.25);
        assert!(store.save(VideoId::new(4)).await.unwrap());

        let mut fresh = store_over(&storage);
        assert_eq!(fresh.load(VideoId::new(4)).await, 93.25);
        assert!(fresh.has_saved_progress());
        assert_eq!(
            storage.snapshot().get("videoProgress_4").map(String::as_str),
            Some("93.25")
        );
    }

    #[tokio::test]
    async fn test_zero_offset_never_overwrites_record() {
        let storage = MemoryProgressStorage::new();
        storage.insert("videoProgress_9", "41");

        let store = store_over(&storage);
        assert!(!store.save(VideoId::new(9)).await.unwrap());
        assert!(!store.save(VideoId::new(10)).await.unwrap());

        assert_eq!(
            storage.snapshot().get("videoProgress_9").map(String::as_str),
            Some("41")
        );
        assert!(!storage.snapshot().contains_key("videoProgress_10"));
    }

    #[tokio::test]
    async fn test_unassigned_id_is_never_saved() {
        let storage = MemoryProgressStorage::new();
        let mut store = store_over(&storage);
        store.update(12.0);
        assert!(!store.save(VideoId::default()).await.unwrap());
        assert!(storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_record_treated_as_absent() {
        let storage = MemoryProgressStorage::new();
        storage.insert("videoProgress_2", "soon");
        let mut store = store_over(&storage);

        assert_eq!(store.load(VideoId::new(2)).await, 0.0);
        assert!(!store.has_saved_progress());
    }

    #[tokio::test]
    async fn test_reset_clears_session_only() {
        let storage = MemoryProgressStorage::new();
        let mut store = store_over(&storage);
        store.update(5.0);
        store.save(VideoId::new(3)).await.unwrap();
        store.load(VideoId::new(3)).await;

        store.reset();
        assert_eq!(store.current_time(), 0.0);
        assert!(!store.has_saved_progress());
        assert_eq!(store.saved_offset(VideoId::new(3)).await, Some(5.0));
    }

    #[tokio::test]
    async fn test_clear_removes_record() {
        let storage = MemoryProgressStorage::new();
        let mut store = store_over(&storage);
        store.update(8.0);
        store.save(VideoId::new(6)).await.unwrap();

        store.clear(VideoId::new(6)).await.unwrap();
        assert_eq!(store.saved_offset(VideoId::new(6)).await, None);
    }

    #[test]
    fn test_update_clamps_invalid_times() {
        let mut store = store_over(&MemoryProgressStorage::new());
        store.update(-4.0);
        assert_eq!(store.current_time(), 0.0);
        store.update(f64::NAN);
        assert_eq!(store.current_time(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_positive_offsets_round_trip(offset in 0.001f64..1.0e7, id in 1u64..10_000) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let storage = MemoryProgressStorage::new();
                let mut store = store_over(&storage);
                store.update(offset);
                store.save(VideoId::new(id)).await.unwrap();

                let mut fresh = store_over(&storage);
                let loaded = fresh.load(VideoId::new(id)).await;
                assert_eq!(loaded, offset);
            });
        }
    }
}
