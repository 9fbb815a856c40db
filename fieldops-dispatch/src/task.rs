use std::{collections::BTreeSet, fmt};

use fieldops_core::Coordinates;
use serde::{Deserialize, Serialize};

use crate::state::PersonnelId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub String);

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItemId {
    fn from(id: &str) -> Self {
        WorkItemId(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkItemKind {
    Job,
    Appointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Pending -> Assigned -> Completed. The assignee only exists once the item
/// has left `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkItemStatus {
    Pending,
    Assigned {
        #[serde(rename = "assignedPersonnelId")]
        personnel: PersonnelId,
    },
    Completed {
        #[serde(rename = "assignedPersonnelId")]
        personnel: PersonnelId,
    },
}

impl WorkItemStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, WorkItemStatus::Pending)
    }

    pub fn assignee(&self) -> Option<&PersonnelId> {
        match self {
            WorkItemStatus::Pending => None,
            WorkItemStatus::Assigned { personnel } | WorkItemStatus::Completed { personnel } => {
                Some(personnel)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: WorkItemId,
    pub title: String,
    pub kind: WorkItemKind,
    pub location: Coordinates,
    pub priority: Priority,
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    pub estimated_hours: f64,
    #[serde(flatten)]
    pub status: WorkItemStatus,
}

impl WorkItem {
    /// Marks an assigned item as done. Anything else is left untouched and
    /// reported back as `false`.
    pub fn complete(&mut self) -> bool {
        match &self.status {
            WorkItemStatus::Assigned { personnel } => {
                self.status = WorkItemStatus::Completed {
                    personnel: personnel.clone(),
                };
                true
            }
            _ => false,
        }
    }
}
