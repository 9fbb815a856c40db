use std::{
  future::Future,
  sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use tokio::time::sleep;

use crate::{
  error::SinkError,
  record::{OfflineRecord, RecordId},
};

/// Where queued records are delivered once the client is back online.
pub trait RemoteSink {
  fn deliver(&self, record: &OfflineRecord) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Stands in for the upload endpoint: waits `latency`, then accepts the
/// record unless it has been told to fail.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSink {
  latency: Duration,
  unreachable: Arc<AtomicBool>,
  failures_remaining: Arc<AtomicU32>,
  delivered: Arc<Mutex<Vec<RecordId>>>,
}

impl SimulatedSink {
  pub fn new(latency: Duration) -> Self {
    Self {
      latency,
      ..Self::default()
    }
  }

  pub fn set_reachable(&self, reachable: bool) {
    self.unreachable.store(!reachable, Ordering::SeqCst);
  }

  /// The next `count` deliveries are rejected.
  pub fn fail_next(&self, count: u32) {
    self.failures_remaining.store(count, Ordering::SeqCst);
  }

  pub fn delivered(&self) -> Vec<RecordId> {
    self
      .delivered
      .lock()
      .map(|delivered| delivered.clone())
      .unwrap_or_default()
  }
}

impl RemoteSink for SimulatedSink {
  async fn deliver(&self, record: &OfflineRecord) -> Result<(), SinkError> {
    sleep(self.latency).await;

    if self.unreachable.load(Ordering::SeqCst) {
      return Err(SinkError::Unreachable);
    }

    let rejected = self
      .failures_remaining
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if rejected {
      return Err(SinkError::Rejected(format!("record {} refused", record.id)));
    }

    if let Ok(mut delivered) = self.delivered.lock() {
      delivered.push(record.id);
    }
    Ok(())
  }
}
