use thiserror::Error;

use crate::{
    state::PersonnelId,
    task::{WorkItemId, WorkItemStatus},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Nobody passed the radius, skill and workload filters.
    #[error("No eligible personnel for work item {0}")]
    NoEligibleCandidate(WorkItemId),

    #[error("Work item not found: {0}")]
    WorkItemNotFound(WorkItemId),

    #[error("Personnel not found: {0}")]
    PersonnelNotFound(PersonnelId),

    /// Only pending work items can be assigned.
    #[error("Work item {id} is not pending (status: {status:?})")]
    NotPending { id: WorkItemId, status: WorkItemStatus },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: &str) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
        }
    }
}
