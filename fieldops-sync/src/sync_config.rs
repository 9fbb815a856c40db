use std::{path::PathBuf, time::Duration};

use fieldops_core::Address;

use crate::{
  error::ConfigError, queue::QueueOptions, shutdown::shutdown_manager::DEFAULT_TEARDOWN_DEADLINE,
};

#[derive(Debug, Clone)]
pub struct SyncConfig {
  // Directory holding the durable record list.
  pub data_directory: PathBuf,
  // Endpoint probed to decide whether we are online.
  pub probe_address: Address,
  pub probe_interval: Duration,
  pub probe_timeout: Duration,
  // Consecutive failed probes tolerated before going offline.
  pub probe_failure_tolerance: usize,
  // Consecutive failed store writes tolerated before the agent shuts down.
  pub store_failure_tolerance: usize,
  pub sync_timeout: Duration,
  // Tries per record per sync; 1 means no in-flush retry.
  pub retry_attempts: u32,
  // Delay before the first retry, doubled for each further one.
  pub retry_backoff: Duration,
  // Latency of the simulated upload endpoint.
  pub simulated_latency: Duration,
  // Time each teardown step gets on shutdown.
  pub teardown_deadline: Duration,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      data_directory: PathBuf::from("data"),
      probe_address: Address(([127, 0, 0, 1], 8080).into()),
      probe_interval: Duration::from_secs(5),
      probe_timeout: Duration::from_secs(2),
      probe_failure_tolerance: 2,
      store_failure_tolerance: 3,
      sync_timeout: Duration::from_secs(10),
      retry_attempts: 1,
      retry_backoff: Duration::from_millis(500),
      simulated_latency: Duration::from_millis(1000),
      teardown_deadline: DEFAULT_TEARDOWN_DEADLINE,
    }
  }
}

impl SyncConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(value) = lookup("FIELDOPS_DATA_DIRECTORY") {
      config.data_directory = PathBuf::from(value);
    }
    if let Some(value) = lookup("FIELDOPS_PROBE_ADDRESS") {
      let address = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid("FIELDOPS_PROBE_ADDRESS", &value))?;
      config.probe_address = Address(address);
    }
    if let Some(value) = lookup("FIELDOPS_PROBE_INTERVAL_MS") {
      config.probe_interval = parse_millis("FIELDOPS_PROBE_INTERVAL_MS", &value)?;
    }
    if let Some(value) = lookup("FIELDOPS_PROBE_TIMEOUT_MS") {
      config.probe_timeout = parse_millis("FIELDOPS_PROBE_TIMEOUT_MS", &value)?;
    }
    if let Some(value) = lookup("FIELDOPS_PROBE_FAILURE_TOLERANCE") {
      config.probe_failure_tolerance = parse_number("FIELDOPS_PROBE_FAILURE_TOLERANCE", &value)?;
    }
    if let Some(value) = lookup("FIELDOPS_STORE_FAILURE_TOLERANCE") {
      config.store_failure_tolerance = parse_number("FIELDOPS_STORE_FAILURE_TOLERANCE", &value)?;
    }
    if let Some(value) = lookup("FIELDOPS_SYNC_TIMEOUT_MS") {
      config.sync_timeout = parse_millis("FIELDOPS_SYNC_TIMEOUT_MS", &value)?;
    }
    if let Some(value) = lookup("FIELDOPS_RETRY_ATTEMPTS") {
      let attempts: u32 = parse_number("FIELDOPS_RETRY_ATTEMPTS", &value)?;
      if attempts == 0 {
        return Err(ConfigError::invalid("FIELDOPS_RETRY_ATTEMPTS", &value));
      }
      config.retry_attempts = attempts;
    }
    if let Some(value) = lookup("FIELDOPS_RETRY_BACKOFF_MS") {
      config.retry_backoff = parse_millis("FIELDOPS_RETRY_BACKOFF_MS", &value)?;
    }
    if let Some(value) = lookup("FIELDOPS_SIMULATED_LATENCY_MS") {
      config.simulated_latency = parse_millis("FIELDOPS_SIMULATED_LATENCY_MS", &value)?;
    }
    if let Some(value) = lookup("FIELDOPS_TEARDOWN_DEADLINE_MS") {
      config.teardown_deadline = parse_millis("FIELDOPS_TEARDOWN_DEADLINE_MS", &value)?;
    }

    Ok(config)
  }

  pub fn queue_options(&self) -> QueueOptions {
    QueueOptions {
      sync_timeout: self.sync_timeout,
      retry_attempts: self.retry_attempts,
      retry_backoff: self.retry_backoff,
    }
  }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
  value
    .trim()
    .parse()
    .map_err(|_| ConfigError::invalid(key, value))
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
  parse_number::<u64>(key, value).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = SyncConfig::from_lookup(|_| None).unwrap();
    assert_eq!(config.retry_attempts, 1);
    assert_eq!(config.data_directory, PathBuf::from("data"));
    assert_eq!(format!("{:?}", config.probe_address), "127.0.0.1:8080");
  }

  #[test]
  fn test_reads_overrides() {
    let config = SyncConfig::from_lookup(|key| match key {
      "FIELDOPS_PROBE_ADDRESS" => Some("10.0.0.2:443".to_string()),
      "FIELDOPS_SYNC_TIMEOUT_MS" => Some("250".to_string()),
      "FIELDOPS_RETRY_ATTEMPTS" => Some("4".to_string()),
      "FIELDOPS_DATA_DIRECTORY" => Some("/var/lib/fieldops".to_string()),
      "FIELDOPS_TEARDOWN_DEADLINE_MS" => Some("1500".to_string()),
      _ => None,
    })
    .unwrap();

    assert_eq!(format!("{:?}", config.probe_address), "10.0.0.2:443");
    assert_eq!(config.sync_timeout, Duration::from_millis(250));
    assert_eq!(config.queue_options().retry_attempts, 4);
    assert_eq!(config.data_directory, PathBuf::from("/var/lib/fieldops"));
    assert_eq!(config.teardown_deadline, Duration::from_millis(1500));
  }

  #[test]
  fn test_rejects_bad_values() {
    for (key, value) in [
      ("FIELDOPS_PROBE_ADDRESS", "localhost"),
      ("FIELDOPS_PROBE_INTERVAL_MS", "-5"),
      ("FIELDOPS_RETRY_ATTEMPTS", "0"),
      ("FIELDOPS_STORE_FAILURE_TOLERANCE", "many"),
    ] {
      let result = SyncConfig::from_lookup(|k| (k == key).then(|| value.to_string()));
      assert_eq!(
        result.err(),
        Some(ConfigError::Invalid {
          key,
          value: value.to_string()
        })
      );
    }
  }
}
