//! Radius-based assignment of field personnel to pending jobs and
//! appointments.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod state;
pub mod task;

pub use config::AssignmentSettings;
pub use dispatcher::{Assignment, AutoAssignReport, Dispatcher};
pub use error::{ConfigError, DispatchError};
pub use state::{Availability, Board, Personnel, PersonnelId};
pub use task::{Priority, WorkItem, WorkItemId, WorkItemKind, WorkItemStatus};
