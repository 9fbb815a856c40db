use std::{
  future::Future,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
};

use crate::{error::StoreError, record::OfflineRecord};

/// Key the offline record list is stored under.
pub const STORAGE_KEY: &str = "offline-data";

/// Durable key-value storage for the full record list. The queue is the only
/// writer.
pub trait RecordStore {
  fn load(&self) -> impl Future<Output = Result<Vec<OfflineRecord>, StoreError>> + Send;

  fn save(&self, records: &[OfflineRecord]) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Stores the list as `<key>.json` inside a data directory.
pub struct JsonFileStore {
  directory: Arc<Path>,
  key: Arc<str>,
}

impl JsonFileStore {
  pub fn new<P: AsRef<Path>>(directory: P) -> JsonFileStore {
    Self::with_key(directory, STORAGE_KEY)
  }

  pub fn with_key<P: AsRef<Path>>(directory: P, key: &str) -> JsonFileStore {
    JsonFileStore {
      directory: Arc::from(directory.as_ref()),
      key: Arc::from(key),
    }
  }

  pub fn path(&self) -> PathBuf {
    self.directory.join(format!("{}.json", self.key))
  }
}

impl RecordStore for JsonFileStore {
  async fn load(&self) -> Result<Vec<OfflineRecord>, StoreError> {
    let path = self.path();
    match tokio::fs::read(&path).await {
      Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
      Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(vec![]),
      Err(error) => Err(error.into()),
    }
  }

  async fn save(&self, records: &[OfflineRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_vec(records)?;
    tokio::fs::create_dir_all(&self.directory).await?;

    // Write aside and rename so a crash never leaves a truncated list behind.
    let path = self.path();
    let temp = path.with_extension("json.tmp");
    tokio::fs::write(&temp, json).await?;
    tokio::fs::rename(&temp, &path).await?;
    Ok(())
  }
}

/// In-memory store that still goes through JSON, so reloads behave like the
/// file store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  contents: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn raw(&self) -> Option<String> {
    self.contents.lock().ok().and_then(|contents| contents.clone())
  }
}

impl RecordStore for MemoryStore {
  async fn load(&self) -> Result<Vec<OfflineRecord>, StoreError> {
    match self.raw() {
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Ok(vec![]),
    }
  }

  async fn save(&self, records: &[OfflineRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_string(records)?;
    if let Ok(mut contents) = self.contents.lock() {
      *contents = Some(json);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::{RecordId, RecordKind, RecordStatus};
  use serde_json::json;

  fn sample() -> Vec<OfflineRecord> {
    let mut synced = OfflineRecord::new(RecordId(2), RecordKind::Report, json!({ "jobId": "J-1001" }));
    synced.status = RecordStatus::Synced;
    let mut failed = OfflineRecord::new(RecordId(3), RecordKind::Timesheet, json!({ "hours": 7.5 }));
    failed.status = RecordStatus::Failed {
      reason: "remote endpoint unreachable".to_string(),
      attempts: 3,
    };

    vec![
      OfflineRecord::new(RecordId(1), RecordKind::Photo, json!({ "file": "site.jpg" })),
      synced,
      failed,
    ]
  }

  #[tokio::test]
  async fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested"));

    assert!(store.load().await.unwrap().is_empty());

    let records = sample();
    store.save(&records).await.unwrap();

    let reopened = JsonFileStore::new(dir.path().join("nested"));
    let loaded = reopened.load().await.unwrap();
    assert_eq!(loaded, records);
    assert!(reopened.path().ends_with("offline-data.json"));
    assert!(!reopened.path().with_extension("json.tmp").exists());
  }

  #[tokio::test]
  async fn test_file_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::with_key(dir.path(), "queue");
    std::fs::write(store.path(), b"{not json").unwrap();

    assert!(matches!(store.load().await, Err(StoreError::Json(_))));
  }

  #[tokio::test]
  async fn test_memory_store_clones_share_contents() {
    let store = MemoryStore::new();
    let other = store.clone();
    store.save(&sample()).await.unwrap();

    let loaded = other.load().await.unwrap();
    let ids: Vec<_> = loaded.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RecordId(1), RecordId(2), RecordId(3)]);
    assert!(other.raw().unwrap().contains("\"state\":\"failed\""));
  }
}
