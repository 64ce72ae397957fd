//! JSON file backed progress storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::{ProgressStorage, StorageError};
use crate::config::StorageConfig;

/// Progress records persisted as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous record set intact.
/// Reads always go to disk; separate instances over the same path observe
/// each other's writes. An unparsable file reads as empty and is moved to
/// a `.corrupt` sibling before the next write replaces it.
#[derive(Debug)]
pub struct FileProgressStorage {
    path: PathBuf,
    temp_path: PathBuf,
    corrupt_path: PathBuf,
    write_lock: Mutex<()>,
}

enum FileContents {
    Records(BTreeMap<String, String>),
    Damaged,
}

impl FileContents {
    fn into_records(self) -> BTreeMap<String, String> {
        match self {
            FileContents::Records(records) => records,
            FileContents::Damaged => BTreeMap::new(),
        }
    }
}

impl FileProgressStorage {
    /// Creates storage backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            temp_path: temp_sibling(&path, ".tmp"),
            corrupt_path: temp_sibling(&path, CORRUPT_SUFFIX),
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates storage at the location described by `config`.
    pub fn from_config(config: &StorageConfig) -> Self {
        let path = config.progress_path();
        Self {
            temp_path: temp_sibling(&path, config.temp_file_suffix),
            corrupt_path: temp_sibling(&path, CORRUPT_SUFFIX),
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the progress file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a damaged progress file is kept for manual recovery.
    pub fn corrupt_path(&self) -> &Path {
        &self.corrupt_path
    }

    async fn read_contents(&self) -> Result<FileContents, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FileContents::Records(BTreeMap::new()));
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(FileContents::Records(BTreeMap::new()));
        }

        match serde_json::from_str(&contents) {
            Ok(records) => Ok(FileContents::Records(records)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Unreadable progress file: {e}");
                Ok(FileContents::Damaged)
            }
        }
    }

    /// Reads the record set for a rewrite. Caller holds `write_lock`.
    async fn records_for_update(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_contents().await? {
            FileContents::Records(records) => Ok(records),
            FileContents::Damaged => {
                fs::rename(&self.path, &self.corrupt_path).await?;
                tracing::warn!(
                    path = %self.path.display(),
                    kept = %self.corrupt_path.display(),
                    "Moved damaged progress file aside"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    async fn write_records(&self, records: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let encoded =
            serde_json::to_vec_pretty(records).map_err(|e| StorageError::Serialization {
                reason: e.to_string(),
            })?;

        fs::write(&self.temp_path, encoded).await?;
        fs::rename(&self.temp_path, &self.path).await?;
        Ok(())
    }
}

const CORRUPT_SUFFIX: &str = ".corrupt";

fn temp_sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[async_trait]
impl ProgressStorage for FileProgressStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let records = self.read_contents().await?.into_records();
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.records_for_update().await?;
        records.insert(key.to_string(), value.to_string());
        self.write_records(&records).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.records_for_update().await?;
        if records.remove(key).is_some() {
            self.write_records(&records).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::domain::VideoId;
    use crate::progress::ProgressStore;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileProgressStorage::new(dir.path().join("progress.json"));
        assert_eq!(storage.get("videoProgress_1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_records_survive_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("progress.json");

        let mut store = ProgressStore::new(Arc::new(FileProgressStorage::new(&path)));
        store.update(311.5);
        store.save(VideoId::new(12)).await.unwrap();

        let mut reopened = ProgressStore::new(Arc::new(FileProgressStorage::new(&path)));
        assert_eq!(reopened.load(VideoId::new(12)).await, 311.5);
        assert!(!temp_sibling(&path, ".tmp").exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.get("videoProgress_12").map(String::as_str), Some("311.5"));
    }

    #[tokio::test]
    async fn test_corrupted_file_is_kept_aside_on_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        let damaged = r#"{"videoProgress_1": "40", "videoProgress_2": "#;
        std::fs::write(&path, damaged).unwrap();

        let storage = FileProgressStorage::new(&path);
        assert_eq!(storage.get("videoProgress_3").await.unwrap(), None);
        assert!(!storage.corrupt_path().exists());

        storage.set("videoProgress_3", "7").await.unwrap();
        assert_eq!(
            storage.get("videoProgress_3").await.unwrap().as_deref(),
            Some("7")
        );
        assert_eq!(
            std::fs::read_to_string(storage.corrupt_path()).unwrap(),
            damaged
        );
        assert_eq!(storage.corrupt_path(), dir.path().join("progress.json.corrupt"));
    }

    #[tokio::test]
    async fn test_remove_on_corrupted_file_keeps_it_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let storage = FileProgressStorage::new(&path);
        storage.remove("videoProgress_1").await.unwrap();

        assert!(!path.exists());
        assert!(storage.corrupt_path().exists());
    }

    #[tokio::test]
    async fn test_remove_deletes_only_target_key() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            progress_dir: dir.path().to_path_buf(),
            ..StorageConfig::default()
        };
        let storage = FileProgressStorage::from_config(&config);
        storage.set("videoProgress_1", "10").await.unwrap();
        storage.set("videoProgress_2", "20").await.unwrap();

        storage.remove("videoProgress_1").await.unwrap();
        storage.remove("videoProgress_404").await.unwrap();

        assert_eq!(storage.get("videoProgress_1").await.unwrap(), None);
        assert_eq!(
            storage.get("videoProgress_2").await.unwrap().as_deref(),
            Some("20")
        );
    }
}
