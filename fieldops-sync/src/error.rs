use thiserror::Error;

use crate::record::RecordId;

#[derive(Error, Debug)]
pub enum SyncError {
  /// Flush requested while the client is offline.
  #[error("No connection, records stay queued")]
  NoConnection,

  #[error("Record not found: {0}")]
  RecordNotFound(RecordId),

  #[error("Local store error: {0}")]
  Store(#[from] StoreError),

  /// The task owning the queue has stopped.
  #[error("Offline queue is closed")]
  Closed,
}

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Why a single delivery to the remote sink did not go through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
  #[error("remote endpoint unreachable")]
  Unreachable,

  #[error("rejected by remote: {0}")]
  Rejected(String),

  #[error("timed out")]
  Timeout,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("Invalid value {value:?} for {key}")]
  Invalid { key: &'static str, value: String },
}

impl ConfigError {
  pub(crate) fn invalid(key: &'static str, value: &str) -> Self {
    ConfigError::Invalid {
      key,
      value: value.to_string(),
    }
  }
}
