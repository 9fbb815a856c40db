//! Offline buffering of field records (photos, reports, timesheets, notes)
//! with delivery once the device is back online.

pub mod agent;
pub mod connectivity;
pub mod error;
pub mod error_tracker;
pub mod handle;
pub mod queue;
pub mod record;
pub mod shutdown;
pub mod sink;
pub mod store;
pub mod sync_config;

pub use agent::SyncAgent;
pub use connectivity::{ConnectivityEvent, Probe, TcpProbe};
pub use error::{ConfigError, SinkError, StoreError, SyncError};
pub use handle::{QueueHandle, QueueSnapshot};
pub use queue::{FlushProgress, FlushReport, OfflineQueue, QueueOptions, SyncOutcome};
pub use record::{OfflineRecord, RecordId, RecordKind, RecordStatus};
pub use sink::{RemoteSink, SimulatedSink};
pub use store::{JsonFileStore, MemoryStore, RecordStore, STORAGE_KEY};
pub use sync_config::SyncConfig;
