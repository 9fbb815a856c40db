use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
  connectivity::{start_connectivity_fiber, Probe},
  error::SyncError,
  error_tracker::ErrorTracker,
  handle::{serve, QueueHandle},
  queue::OfflineQueue,
  shutdown::{
    shutdown_manager::{Shutdown, ShutdownManager},
    shutdown_reason::ShutdownReason,
  },
  sink::RemoteSink,
  store::RecordStore,
  sync_config::SyncConfig,
};

const COMMAND_BUFFER: usize = 64;

/// Long-running owner of the offline queue plus the connectivity monitor
/// feeding it.
pub struct SyncAgent {
  handle: QueueHandle,
  shutdown: ShutdownManager<ShutdownReason>,
  error_tracker: Arc<RwLock<ErrorTracker>>,
}

impl SyncAgent {
  pub async fn start<S, K, P>(config: SyncConfig, store: S, sink: K, probe: P) -> Result<Self, SyncError>
  where
    S: RecordStore + Send + Sync + 'static,
    K: RemoteSink + Send + Sync + 'static,
    P: Probe + Send + Sync + 'static,
  {
    info!("Starting sync agent with config: {:?}", config);

    let initially_online = probe.probe().await.is_ok();
    info!("Initial connectivity: {}", if initially_online { "online" } else { "offline" });

    let cancel = CancellationToken::new();
    let queue = OfflineQueue::open(
      store,
      sink,
      config.queue_options(),
      initially_online,
      cancel.child_token(),
    )
    .await?;

    let shutdown_manager = ShutdownManager::with_deadline(config.teardown_deadline);
    let error_tracker = Arc::new(RwLock::new(ErrorTracker::default()));
    let (online_tx, online_rx) = watch::channel(initially_online);
    let (handle, commands) = QueueHandle::new(COMMAND_BUFFER, queue.progress());

    let queue_fiber = tokio::spawn(serve(
      queue,
      commands,
      online_rx,
      config.store_failure_tolerance,
      error_tracker.clone(),
      shutdown_manager.shutdown.clone(),
      cancel.clone(),
    ));

    shutdown_manager
      .shutdown
      .register_shutdown_task(
        || {
          Box::pin(async move {
            cancel.cancel();
            info!("Cancelled offline queue");
            let exit = queue_fiber.await;
            info!("offline queue exited: {:?}", exit);
          })
        },
        "offline queue",
      )
      .await;

    start_connectivity_fiber(
      probe,
      config.probe_interval,
      config.probe_failure_tolerance,
      error_tracker.clone(),
      online_tx,
      shutdown_manager.shutdown.clone(),
    )
    .await;

    Ok(SyncAgent {
      handle,
      shutdown: shutdown_manager,
      error_tracker,
    })
  }

  /// Producers get a clone of this; nothing else touches the queue.
  pub fn handle(&self) -> QueueHandle {
    self.handle.clone()
  }

  pub fn shutdown(&self) -> Arc<Shutdown<ShutdownReason>> {
    self.shutdown.shutdown.clone()
  }

  pub async fn errors(&self) -> ErrorTracker {
    self.error_tracker.read().await.clone()
  }

  pub async fn await_shutdown(self) -> Result<ShutdownReason, tokio::sync::oneshot::error::RecvError> {
    self.shutdown.await_shutdown().await
  }
}
