use std::{future::Future, io, sync::Arc, time::Duration};

use fieldops_core::Address;
use tokio::{
  net::TcpStream,
  sync::{watch, RwLock},
  time::{sleep, timeout},
};
use tracing::{debug, info, warn};

use crate::{
  error_tracker::ErrorTracker,
  shutdown::{shutdown_manager::Shutdown, shutdown_reason::ShutdownReason},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
  WentOnline,
  WentOffline,
}

impl ConnectivityEvent {
  pub fn from_online(online: bool) -> Self {
    if online {
      ConnectivityEvent::WentOnline
    } else {
      ConnectivityEvent::WentOffline
    }
  }
}

/// One reachability check against the outside world.
pub trait Probe {
  fn probe(&self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Online means a TCP connection to `address` opens within `timeout`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
  address: Address,
  timeout: Duration,
}

impl TcpProbe {
  pub fn new(address: Address, timeout: Duration) -> Self {
    Self { address, timeout }
  }
}

impl Probe for TcpProbe {
  async fn probe(&self) -> io::Result<()> {
    let stream = timeout(self.timeout, TcpStream::connect(self.address.0))
      .await
      .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "probe timed out"))??;
    drop(stream);
    Ok(())
  }
}

/// Probes every `probe_interval` and publishes the online flag on `online`.
/// Going offline needs more than `max_error_tolerance` failures in a row;
/// one success is enough to come back.
pub async fn start_connectivity_fiber<P>(
  probe: P,
  probe_interval: Duration,
  max_error_tolerance: usize,
  error_tracker: Arc<RwLock<ErrorTracker>>,
  online: watch::Sender<bool>,
  shutdown: Arc<Shutdown<ShutdownReason>>,
) where
  P: Probe + Send + Sync + 'static,
{
  let fiber = tokio::spawn(async move {
    loop {
      sleep(probe_interval).await;

      match probe.probe().await {
        Ok(()) => {
          debug!("Connectivity probe succeeded");
          error_tracker.write().await.probe.clear();

          online.send_if_modified(|online| {
            let changed = !*online;
            if changed {
              info!("Connectivity probe reached the remote, going online");
            }
            *online = true;
            changed
          });
        }
        Err(error) => {
          debug!("Connectivity probe failed: {}", error);

          let over_tolerance = {
            let mut errors = error_tracker.write().await;
            errors.probe.push(error.to_string());
            errors.probe.len() > max_error_tolerance
          };

          if over_tolerance {
            online.send_if_modified(|online| {
              let changed = *online;
              if changed {
                warn!(
                  "Connectivity probe failed more than {} times in a row, going offline",
                  max_error_tolerance
                );
              }
              *online = false;
              changed
            });
          }
        }
      }
    }
  });

  shutdown
    .register_shutdown_task(
      || {
        Box::pin(async {
          fiber.abort();
          info!("Aborted connectivity fiber");
          let exit = fiber.await;
          debug!("connectivity fiber exited: {:?}", exit);
        })
      },
      "connectivity monitor",
    )
    .await;
}
