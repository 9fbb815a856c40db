use fieldops_sync::{
  shutdown::shutdown_reason::ShutdownReason, JsonFileStore, SimulatedSink, SyncAgent, SyncConfig,
  TcpProbe,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let subscriber = FmtSubscriber::builder()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .finish();

  tracing::subscriber::set_global_default(subscriber)?;

  let config = SyncConfig::from_env()?;

  let store = JsonFileStore::new(&config.data_directory);
  info!("Offline records are kept in {:?}", store.path());

  let sink = SimulatedSink::new(config.simulated_latency);
  let probe = TcpProbe::new(config.probe_address, config.probe_timeout);

  let agent = SyncAgent::start(config, store, sink, probe).await?;

  let snapshot = agent.handle().snapshot().await?;
  info!(
    "{} record(s) waiting, {} synced, {} failed",
    snapshot.pending, snapshot.synced, snapshot.failed
  );

  let shutdown = agent.shutdown();
  tokio::spawn(async move {
    match tokio::signal::ctrl_c().await {
      Ok(()) => {
        if let Some(summary) = shutdown.trigger(ShutdownReason::Requested).await {
          if !summary.abandoned.is_empty() {
            error!("Teardown abandoned: {:?}", summary.abandoned);
          }
        }
      }
      Err(err) => error!("Failed to listen for Ctrl-C: {}", err),
    }
  });

  let shutdown_reason = agent.await_shutdown().await?;

  info!("Shutting down due to: {:?}", shutdown_reason);

  Ok(())
}
