use std::time::Duration;

use tokio::{sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  connectivity::ConnectivityEvent,
  error::{SinkError, SyncError},
  record::{IdGenerator, OfflineRecord, RecordId, RecordKind, RecordStatus},
  sink::RemoteSink,
  store::RecordStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
  pub sync_timeout: Duration,
  pub retry_attempts: u32,
  pub retry_backoff: Duration,
}

impl Default for QueueOptions {
  fn default() -> Self {
    Self {
      sync_timeout: Duration::from_secs(10),
      retry_attempts: 1,
      retry_backoff: Duration::from_millis(500),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushProgress {
  pub done: usize,
  pub total: usize,
}

impl FlushProgress {
  /// Completed share of the current flush; 1.0 when there was nothing to do.
  pub fn fraction(&self) -> f64 {
    if self.total == 0 {
      1.0
    } else {
      self.done as f64 / self.total as f64
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
  pub attempted: usize,
  pub synced: usize,
  pub failed: usize,
  pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  Synced,
  AlreadySynced,
  Failed(SinkError),
  /// Torn down mid-delivery; the record keeps its previous state.
  Cancelled,
}

enum Delivery {
  Delivered,
  Failed(SinkError, u32),
  Cancelled,
}

/// Records created while disconnected, in creation order, mirrored to the
/// store after every change.
pub struct OfflineQueue<S, K> {
  records: Vec<OfflineRecord>,
  is_online: bool,
  ids: IdGenerator,
  store: S,
  sink: K,
  options: QueueOptions,
  progress: watch::Sender<FlushProgress>,
  cancel: CancellationToken,
}

impl<S: RecordStore, K: RemoteSink> OfflineQueue<S, K> {
  /// Loads whatever the store holds and starts in the given connectivity state.
  pub async fn open(
    store: S,
    sink: K,
    options: QueueOptions,
    is_online: bool,
    cancel: CancellationToken,
  ) -> Result<Self, SyncError> {
    let mut records = store.load().await?;
    records.sort_by_key(|record| record.id);

    let ids = IdGenerator::starting_after(records.last().map(|record| record.id));
    let (progress, _) = watch::channel(FlushProgress::default());

    info!(
      "Opened offline queue with {} records ({} waiting), online: {}",
      records.len(),
      records.iter().filter(|r| !r.is_synced()).count(),
      is_online
    );

    Ok(Self {
      records,
      is_online,
      ids,
      store,
      sink,
      options,
      progress,
      cancel,
    })
  }

  pub fn is_online(&self) -> bool {
    self.is_online
  }

  pub fn records(&self) -> &[OfflineRecord] {
    &self.records
  }

  pub fn record(&self, id: RecordId) -> Option<&OfflineRecord> {
    self.records.iter().find(|record| record.id == id)
  }

  /// Records not yet delivered, including ones whose last attempt failed.
  pub fn pending_count(&self) -> usize {
    self.records.iter().filter(|r| !r.is_synced()).count()
  }

  pub fn failed_count(&self) -> usize {
    self
      .records
      .iter()
      .filter(|r| matches!(r.status, RecordStatus::Failed { .. }))
      .count()
  }

  pub fn synced_count(&self) -> usize {
    self.records.iter().filter(|r| r.is_synced()).count()
  }

  pub fn progress(&self) -> watch::Receiver<FlushProgress> {
    self.progress.subscribe()
  }

  /// Going online flushes everything waiting; going offline only flips the
  /// flag.
  pub async fn apply(&mut self, event: ConnectivityEvent) -> Result<Option<FlushReport>, SyncError> {
    match event {
      ConnectivityEvent::WentOnline => {
        info!("Connection restored");
        self.is_online = true;
        self.flush_all().await.map(Some)
      }
      ConnectivityEvent::WentOffline => {
        warn!("Connection lost, new records will be queued");
        self.is_online = false;
        Ok(None)
      }
    }
  }

  /// Queues a record and, when online, tries to deliver it straight away.
  pub async fn enqueue(
    &mut self,
    kind: RecordKind,
    payload: serde_json::Value,
  ) -> Result<OfflineRecord, SyncError> {
    let record = OfflineRecord::new(self.ids.next_id(), kind, payload);
    let id = record.id;

    let mut records = self.records.clone();
    records.push(record);
    self.commit(records).await?;
    info!("Queued {:?} record {}", kind, id);

    if self.is_online {
      self.sync_one(id).await?;
    }

    self.record(id).cloned().ok_or(SyncError::RecordNotFound(id))
  }

  /// Delivers one record. A failure leaves it `Failed` for the next flush.
  pub async fn sync_one(&mut self, id: RecordId) -> Result<SyncOutcome, SyncError> {
    let index = self
      .records
      .iter()
      .position(|record| record.id == id)
      .ok_or(SyncError::RecordNotFound(id))?;

    if self.records[index].is_synced() {
      return Ok(SyncOutcome::AlreadySynced);
    }

    let delivery = self.deliver(&self.records[index]).await;
    let outcome = match delivery {
      Delivery::Delivered => {
        info!("Synced record {}", id);
        self.records[index].status = RecordStatus::Synced;
        SyncOutcome::Synced
      }
      Delivery::Failed(error, attempts) => {
        let record = &mut self.records[index];
        let attempts = record.attempts() + attempts;
        warn!(
          "Sync of record {} failed after {} attempt(s): {}",
          id, attempts, error
        );
        record.status = RecordStatus::Failed {
          reason: error.to_string(),
          attempts,
        };
        SyncOutcome::Failed(error)
      }
      Delivery::Cancelled => {
        debug!("Sync of record {} cancelled", id);
        return Ok(SyncOutcome::Cancelled);
      }
    };

    self.persist().await?;
    Ok(outcome)
  }

  /// Delivers every waiting record, oldest first, one at a time.
  pub async fn flush_all(&mut self) -> Result<FlushReport, SyncError> {
    if !self.is_online {
      warn!("Flush requested while offline");
      return Err(SyncError::NoConnection);
    }

    let waiting: Vec<RecordId> = self
      .records
      .iter()
      .filter(|record| !record.is_synced())
      .map(|record| record.id)
      .collect();

    let total = waiting.len();
    let mut report = FlushReport::default();
    self.progress.send_replace(FlushProgress { done: 0, total });

    if total == 0 {
      debug!("Nothing to flush");
      return Ok(report);
    }

    info!("Flushing {} record(s)", total);

    for (done, id) in waiting.into_iter().enumerate() {
      if self.cancel.is_cancelled() {
        report.cancelled = true;
        break;
      }

      report.attempted += 1;
      match self.sync_one(id).await? {
        SyncOutcome::Synced => report.synced += 1,
        SyncOutcome::Failed(_) => report.failed += 1,
        SyncOutcome::AlreadySynced => {}
        SyncOutcome::Cancelled => {
          report.cancelled = true;
          break;
        }
      }

      self.progress.send_replace(FlushProgress { done: done + 1, total });
    }

    info!(
      "Flush finished: {} synced, {} failed{}",
      report.synced,
      report.failed,
      if report.cancelled { " (cancelled)" } else { "" }
    );
    Ok(report)
  }

  /// Drops every synced record. Waiting records are kept.
  pub async fn purge_synced(&mut self) -> Result<usize, SyncError> {
    let kept: Vec<OfflineRecord> = self
      .records
      .iter()
      .filter(|record| !record.is_synced())
      .cloned()
      .collect();
    let removed = self.records.len() - kept.len();

    if removed > 0 {
      self.commit(kept).await?;
      info!("Purged {} synced record(s)", removed);
    }
    Ok(removed)
  }

  async fn deliver(&self, record: &OfflineRecord) -> Delivery {
    let attempts = self.options.retry_attempts.max(1);
    let mut backoff = self.options.retry_backoff;

    let mut attempt = 1;

    loop {
      let result = tokio::select! {
        _ = self.cancel.cancelled() => return Delivery::Cancelled,
        result = tokio::time::timeout(self.options.sync_timeout, self.sink.deliver(record)) => {
          result.unwrap_or(Err(SinkError::Timeout))
        }
      };

      match result {
        Ok(()) => return Delivery::Delivered,
        Err(error) if attempt >= attempts => return Delivery::Failed(error, attempt),
        Err(error) => {
          debug!(
            "Attempt {}/{} for record {} failed: {}, retrying in {:?}",
            attempt, attempts, record.id, error, backoff
          );
          tokio::select! {
            _ = self.cancel.cancelled() => return Delivery::Cancelled,
            _ = sleep(backoff) => {}
          }
          backoff *= 2;
          attempt += 1;
        }
      }
    }
  }

  /// Replaces the record list only once the store has accepted it, so a
  /// failed save leaves memory and disk agreeing.
  async fn commit(&mut self, records: Vec<OfflineRecord>) -> Result<(), SyncError> {
    self.store.save(&records).await?;
    self.records = records;
    Ok(())
  }

  async fn persist(&self) -> Result<(), SyncError> {
    self.store.save(&self.records).await?;
    Ok(())
  }
}
