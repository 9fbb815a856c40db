use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
  connectivity::ConnectivityEvent,
  error::SyncError,
  error_tracker::ErrorTracker,
  queue::{FlushProgress, FlushReport, OfflineQueue},
  record::{OfflineRecord, RecordKind},
  shutdown::{shutdown_manager::Shutdown, shutdown_reason::ShutdownReason},
  sink::RemoteSink,
  store::RecordStore,
};

/// Point-in-time view of the queue for display.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
  pub is_online: bool,
  pub records: Vec<OfflineRecord>,
  pub pending: usize,
  pub failed: usize,
  pub synced: usize,
}

pub(crate) enum Command {
  Enqueue {
    kind: RecordKind,
    payload: serde_json::Value,
    reply: oneshot::Sender<Result<OfflineRecord, SyncError>>,
  },
  Flush {
    reply: oneshot::Sender<Result<FlushReport, SyncError>>,
  },
  PurgeSynced {
    reply: oneshot::Sender<Result<usize, SyncError>>,
  },
  Snapshot {
    reply: oneshot::Sender<QueueSnapshot>,
  },
}

/// What producers (photo capture, timesheets, notes) hold to reach the queue.
/// Cheap to clone; every call is served in order by the task that owns the
/// queue.
#[derive(Clone)]
pub struct QueueHandle {
  commands: mpsc::Sender<Command>,
  progress: watch::Receiver<FlushProgress>,
}

impl QueueHandle {
  pub(crate) fn new(
    buffer: usize,
    progress: watch::Receiver<FlushProgress>,
  ) -> (Self, mpsc::Receiver<Command>) {
    let (commands, receiver) = mpsc::channel(buffer);
    (Self { commands, progress }, receiver)
  }

  pub async fn enqueue(
    &self,
    kind: RecordKind,
    payload: serde_json::Value,
  ) -> Result<OfflineRecord, SyncError> {
    self
      .request(|reply| Command::Enqueue {
        kind,
        payload,
        reply,
      })
      .await?
  }

  pub async fn flush(&self) -> Result<FlushReport, SyncError> {
    self.request(|reply| Command::Flush { reply }).await?
  }

  pub async fn purge_synced(&self) -> Result<usize, SyncError> {
    self.request(|reply| Command::PurgeSynced { reply }).await?
  }

  pub async fn snapshot(&self) -> Result<QueueSnapshot, SyncError> {
    self.request(|reply| Command::Snapshot { reply }).await
  }

  /// Progress of the most recent flush.
  pub fn progress(&self) -> watch::Receiver<FlushProgress> {
    self.progress.clone()
  }

  async fn request<T>(
    &self,
    command: impl FnOnce(oneshot::Sender<T>) -> Command,
  ) -> Result<T, SyncError> {
    let (reply, response) = oneshot::channel();
    self
      .commands
      .send(command(reply))
      .await
      .map_err(|_| SyncError::Closed)?;
    response.await.map_err(|_| SyncError::Closed)
  }
}

/// Owns the queue: serves handle commands and connectivity changes one at a
/// time until every handle is gone or the queue is cancelled.
pub(crate) async fn serve<S, K>(
  mut queue: OfflineQueue<S, K>,
  mut commands: mpsc::Receiver<Command>,
  online: watch::Receiver<bool>,
  store_failure_tolerance: usize,
  error_tracker: Arc<RwLock<ErrorTracker>>,
  shutdown: Arc<Shutdown<ShutdownReason>>,
  cancel: CancellationToken,
) where
  S: RecordStore,
  K: RemoteSink,
{
  let mut connectivity = WatchStream::from_changes(online);

  // Records left over from a previous run go out as soon as we know we are online.
  if queue.is_online() && queue.pending_count() > 0 {
    let failure = store_failure(&queue.flush_all().await);
    if track_store(failure, store_failure_tolerance, &error_tracker, &shutdown).await {
      return;
    }
  }

  loop {
    let failure = tokio::select! {
      _ = cancel.cancelled() => break,
      Some(is_online) = connectivity.next() => {
        if is_online == queue.is_online() {
          continue;
        }
        store_failure(&queue.apply(ConnectivityEvent::from_online(is_online)).await)
      }
      command = commands.recv() => match command {
        Some(command) => handle_command(&mut queue, command).await,
        None => {
          info!("All queue handles dropped");
          break;
        }
      },
    };

    if track_store(failure, store_failure_tolerance, &error_tracker, &shutdown).await {
      break;
    }
  }

  info!("Offline queue stopped with {} record(s) waiting", queue.pending_count());
}

// Replies go straight back to the caller. The returned message, if any, is a
// store failure for the serve loop to count.
async fn handle_command<S, K>(queue: &mut OfflineQueue<S, K>, command: Command) -> Option<String>
where
  S: RecordStore,
  K: RemoteSink,
{
  match command {
    Command::Enqueue {
      kind,
      payload,
      reply,
    } => {
      let result = queue.enqueue(kind, payload).await;
      let failure = store_failure(&result);
      let _ = reply.send(result);
      failure
    }
    Command::Flush { reply } => {
      let result = queue.flush_all().await;
      let failure = store_failure(&result);
      let _ = reply.send(result);
      failure
    }
    Command::PurgeSynced { reply } => {
      let result = queue.purge_synced().await;
      let failure = store_failure(&result);
      let _ = reply.send(result);
      failure
    }
    Command::Snapshot { reply } => {
      let _ = reply.send(QueueSnapshot {
        is_online: queue.is_online(),
        records: queue.records().to_vec(),
        pending: queue.pending_count(),
        failed: queue.failed_count(),
        synced: queue.synced_count(),
      });
      None
    }
  }
}

fn store_failure<T>(result: &Result<T, SyncError>) -> Option<String> {
  match result {
    Err(SyncError::Store(error)) => Some(error.to_string()),
    Err(other) => {
      debug!("Offline queue operation failed: {}", other);
      None
    }
    Ok(_) => None,
  }
}

/// Counts consecutive store failures. Returns true once the tolerance is
/// exceeded and shutdown has been requested.
async fn track_store(
  failure: Option<String>,
  tolerance: usize,
  error_tracker: &Arc<RwLock<ErrorTracker>>,
  shutdown: &Arc<Shutdown<ShutdownReason>>,
) -> bool {
  let Some(failure) = failure else {
    error_tracker.write().await.store.clear();
    return false;
  };

  error!("Failed to persist offline records: {}", failure);

  let should_shutdown = {
    let mut errors = error_tracker.write().await;
    errors.store.push(failure);

    if errors.store.len() > tolerance {
      Some(errors.clone())
    } else {
      None
    }
  };

  if let Some(errors) = should_shutdown {
    error!("Reached max store error tolerance, shutting down");
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      shutdown.trigger(ShutdownReason::StoreFailure(errors)).await;
    });
    return true;
  }
  false
}
