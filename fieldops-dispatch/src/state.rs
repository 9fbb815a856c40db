use std::{collections::BTreeSet, fmt};

use fieldops_core::Coordinates;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{
    config::{WORKLOAD_CAP, WORKLOAD_POINTS_PER_HOUR},
    task::{WorkItem, WorkItemId},
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonnelId(pub String);

impl fmt::Display for PersonnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonnelId {
    fn from(id: &str) -> Self {
        PersonnelId(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Busy,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personnel {
    pub id: PersonnelId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub location: Coordinates,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    pub availability: Availability,
    // Utilization percentage, 0..=100.
    #[serde(deserialize_with = "workload_percentage")]
    pub workload: u8,
}

impl Personnel {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    pub fn shares_skill_with(&self, required: &BTreeSet<String>) -> bool {
        !self.skills.is_disjoint(required)
    }

    /// Adds the workload for `hours` of work, clamped to the cap. Returns the
    /// new workload. Negative or NaN hours add nothing.
    pub fn take_on(&mut self, hours: f64) -> u8 {
        let added = (hours.max(0.0) * WORKLOAD_POINTS_PER_HOUR).round();
        let total = (f64::from(self.workload) + added).min(f64::from(WORKLOAD_CAP));
        self.workload = total as u8;
        self.workload
    }
}

fn workload_percentage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let workload = u8::deserialize(deserializer)?;
    if workload > WORKLOAD_CAP {
        return Err(de::Error::custom(format!(
            "workload {} is above {}",
            workload, WORKLOAD_CAP
        )));
    }
    Ok(workload)
}

/// Everything the dispatcher works over: the roster and the work items, in
/// input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(default)]
    pub personnel: Vec<Personnel>,
    #[serde(default)]
    pub work_items: Vec<WorkItem>,
}

impl Board {
    pub fn new(personnel: Vec<Personnel>, work_items: Vec<WorkItem>) -> Self {
        Self {
            personnel,
            work_items,
        }
    }

    pub fn personnel(&self, id: &PersonnelId) -> Option<&Personnel> {
        self.personnel.iter().find(|p| &p.id == id)
    }

    pub fn work_item(&self, id: &WorkItemId) -> Option<&WorkItem> {
        self.work_items.iter().find(|w| &w.id == id)
    }

    pub(crate) fn personnel_index(&self, id: &PersonnelId) -> Option<usize> {
        self.personnel.iter().position(|p| &p.id == id)
    }

    pub(crate) fn work_item_index(&self, id: &WorkItemId) -> Option<usize> {
        self.work_items.iter().position(|w| &w.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &WorkItem> {
        self.work_items.iter().filter(|w| w.status.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech(workload: u8) -> Personnel {
        Personnel {
            id: "p1".into(),
            name: "Mike Johnson".to_string(),
            email: String::new(),
            phone: String::new(),
            location: Coordinates::new(39.7392, -104.9903),
            skills: ["plumbing".to_string()].into_iter().collect(),
            availability: Availability::Available,
            workload,
        }
    }

    #[test]
    fn test_take_on_adds_ten_points_per_hour() {
        let mut p = tech(45);
        assert_eq!(p.take_on(2.0), 65);
        assert_eq!(p.take_on(1.5), 80);
    }

    #[test]
    fn test_take_on_clamps_at_cap() {
        for start in [0u8, 50, 95, 100] {
            for hours in [0.0, 0.25, 3.0, 12.0, 1000.0] {
                let mut p = tech(start);
                let after = p.take_on(hours);
                assert!(after <= WORKLOAD_CAP);
                assert!(after >= start);
            }
        }
    }

    #[test]
    fn test_take_on_ignores_negative_and_nan_hours() {
        let mut p = tech(30);
        assert_eq!(p.take_on(-4.0), 30);
        assert_eq!(p.take_on(f64::NAN), 30);
    }

    #[test]
    fn test_shares_skill_with() {
        let p = tech(0);
        let needs_plumbing: BTreeSet<String> = ["plumbing".to_string()].into_iter().collect();
        let needs_hvac: BTreeSet<String> = ["hvac".to_string()].into_iter().collect();
        assert!(p.shares_skill_with(&needs_plumbing));
        assert!(!p.shares_skill_with(&needs_hvac));
        assert!(!p.shares_skill_with(&BTreeSet::new()));
    }

    #[test]
    fn test_personnel_json_shape() {
        let json = r#"{
            "id": "p7",
            "name": "Sarah Davis",
            "location": { "lat": 39.75, "lon": -105.0 },
            "skills": ["hvac", "electrical"],
            "availability": "busy",
            "workload": 60
        }"#;
        let p: Personnel = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, PersonnelId::from("p7"));
        assert_eq!(p.availability, Availability::Busy);
        assert!(p.skills.contains("hvac"));
        assert_eq!(p.email, "");
    }

    #[test]
    fn test_workload_above_cap_is_rejected_on_load() {
        let json = |workload: u32| {
            format!(
                r#"{{"id":"p3","name":"Tom Brown","location":{{"lat":39.7,"lon":-105.0}},"availability":"available","workload":{}}}"#,
                workload
            )
        };

        assert_eq!(serde_json::from_str::<Personnel>(&json(100)).unwrap().workload, 100);

        let error = serde_json::from_str::<Personnel>(&json(150)).unwrap_err();
        assert!(error.to_string().contains("workload 150 is above 100"));
    }
}
