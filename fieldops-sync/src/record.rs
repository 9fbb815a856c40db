use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Millisecond timestamp of creation, bumped when two records land in the
/// same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
  Photo,
  Report,
  Timesheet,
  Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RecordStatus {
  /// Never attempted.
  Pending,
  Synced,
  /// Attempted and not delivered. Retried on every flush.
  Failed { reason: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineRecord {
  pub id: RecordId,
  pub kind: RecordKind,
  pub payload: serde_json::Value,
  pub created_at: DateTime<Utc>,
  pub status: RecordStatus,
}

impl OfflineRecord {
  pub fn new(id: RecordId, kind: RecordKind, payload: serde_json::Value) -> Self {
    Self {
      id,
      kind,
      payload,
      created_at: Utc::now(),
      status: RecordStatus::Pending,
    }
  }

  pub fn is_synced(&self) -> bool {
    self.status == RecordStatus::Synced
  }

  pub fn attempts(&self) -> u32 {
    match self.status {
      RecordStatus::Failed { attempts, .. } => attempts,
      _ => 0,
    }
  }
}

/// Hands out strictly increasing, time-based record ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
  last: i64,
}

impl IdGenerator {
  pub fn starting_after(last: Option<RecordId>) -> Self {
    Self {
      last: last.map(|id| id.0).unwrap_or(0),
    }
  }

  pub fn next_id_at(&mut self, now: DateTime<Utc>) -> RecordId {
    self.last = now.timestamp_millis().max(self.last.saturating_add(1));
    RecordId(self.last)
  }

  pub fn next_id(&mut self) -> RecordId {
    self.next_id_at(Utc::now())
  }
}
