use tracing::{info, warn};

use crate::{
    config::AssignmentSettings,
    error::DispatchError,
    matcher::{self, Candidate},
    state::{Board, Personnel, PersonnelId},
    task::{WorkItem, WorkItemId, WorkItemStatus},
};

/// What the operator sees after a successful assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub work_item_id: WorkItemId,
    pub personnel_id: PersonnelId,
    pub personnel_name: String,
    pub distance_miles: f64,
    pub workload_after: u8,
}

#[derive(Debug, Default)]
pub struct AutoAssignReport {
    pub assigned: Vec<Assignment>,
    pub unassigned: Vec<(WorkItemId, DispatchError)>,
}

#[derive(Debug)]
pub struct Dispatcher {
    settings: AssignmentSettings,
    board: Board,
}

impl Dispatcher {
    pub fn new(settings: AssignmentSettings, board: Board) -> Self {
        Self { settings, board }
    }

    pub fn settings(&self) -> &AssignmentSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AssignmentSettings) {
        info!("Updating assignment settings: {:?}", settings);
        self.settings = settings;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn personnel(&self, id: &PersonnelId) -> Option<&Personnel> {
        self.board.personnel(id)
    }

    pub fn work_item(&self, id: &WorkItemId) -> Option<&WorkItem> {
        self.board.work_item(id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &WorkItem> {
        self.board.pending()
    }

    pub fn find_eligible(&self, work_item_id: &WorkItemId) -> Result<Vec<Candidate<'_>>, DispatchError> {
        let work_item = self
            .board
            .work_item(work_item_id)
            .ok_or_else(|| DispatchError::WorkItemNotFound(work_item_id.clone()))?;
        Ok(matcher::find_eligible(
            work_item,
            &self.board.personnel,
            &self.settings,
        ))
    }

    /// Assigns the best eligible technician to a pending work item.
    pub fn auto_assign(&mut self, work_item_id: &WorkItemId) -> Result<Assignment, DispatchError> {
        let item_index = self.pending_index(work_item_id)?;
        let work_item = &self.board.work_items[item_index];

        let (personnel_id, distance_miles) =
            match matcher::best_candidate(work_item, &self.board.personnel, &self.settings) {
                Some(best) => (best.personnel.id.clone(), best.distance_miles),
                None => {
                    warn!("No eligible personnel for work item {}", work_item_id);
                    return Err(DispatchError::NoEligibleCandidate(work_item_id.clone()));
                }
            };

        let assignment = self.commit(item_index, &personnel_id, distance_miles)?;
        info!(
            "Auto-assigned {} to {} ({:.1} mi, workload now {}%)",
            assignment.work_item_id,
            assignment.personnel_name,
            assignment.distance_miles,
            assignment.workload_after
        );
        Ok(assignment)
    }

    /// Operator override: assigns `personnel_id` regardless of radius, skills
    /// or availability. The distance is reported but never checked.
    pub fn force_assign(
        &mut self,
        work_item_id: &WorkItemId,
        personnel_id: &PersonnelId,
    ) -> Result<Assignment, DispatchError> {
        let item_index = self.pending_index(work_item_id)?;
        let personnel_index = self
            .board
            .personnel_index(personnel_id)
            .ok_or_else(|| DispatchError::PersonnelNotFound(personnel_id.clone()))?;

        let distance_miles = self.board.work_items[item_index]
            .location
            .distance_miles(&self.board.personnel[personnel_index].location);

        let assignment = self.commit(item_index, personnel_id, distance_miles)?;
        info!(
            "Force-assigned {} to {} ({:.1} mi, workload now {}%)",
            assignment.work_item_id,
            assignment.personnel_name,
            assignment.distance_miles,
            assignment.workload_after
        );
        Ok(assignment)
    }

    /// Runs auto-assignment over every pending item in board order. Later items
    /// see the workload added by earlier ones.
    pub fn auto_assign_all(&mut self) -> AutoAssignReport {
        let pending: Vec<WorkItemId> = self.board.pending().map(|w| w.id.clone()).collect();
        let mut report = AutoAssignReport::default();

        for id in pending {
            match self.auto_assign(&id) {
                Ok(assignment) => report.assigned.push(assignment),
                Err(error) => report.unassigned.push((id, error)),
            }
        }

        info!(
            "Auto-assign finished: {} assigned, {} left pending",
            report.assigned.len(),
            report.unassigned.len()
        );
        report
    }

    fn pending_index(&self, work_item_id: &WorkItemId) -> Result<usize, DispatchError> {
        let index = self
            .board
            .work_item_index(work_item_id)
            .ok_or_else(|| DispatchError::WorkItemNotFound(work_item_id.clone()))?;

        let status = &self.board.work_items[index].status;
        if !status.is_pending() {
            return Err(DispatchError::NotPending {
                id: work_item_id.clone(),
                status: status.clone(),
            });
        }
        Ok(index)
    }

    // Status and workload change together under &mut self.
    fn commit(
        &mut self,
        item_index: usize,
        personnel_id: &PersonnelId,
        distance_miles: f64,
    ) -> Result<Assignment, DispatchError> {
        let personnel_index = self
            .board
            .personnel_index(personnel_id)
            .ok_or_else(|| DispatchError::PersonnelNotFound(personnel_id.clone()))?;

        let work_item = &mut self.board.work_items[item_index];
        let personnel = &mut self.board.personnel[personnel_index];

        work_item.status = WorkItemStatus::Assigned {
            personnel: personnel.id.clone(),
        };
        let workload_after = personnel.take_on(work_item.estimated_hours);

        Ok(Assignment {
            work_item_id: work_item.id.clone(),
            personnel_id: personnel.id.clone(),
            personnel_name: personnel.name.clone(),
            distance_miles,
            workload_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::Availability,
        task::{Priority, WorkItemKind},
    };
    use fieldops_core::Coordinates;

    fn plumber(workload: u8) -> Personnel {
        Personnel {
            id: "p1".into(),
            name: "Mike Johnson".to_string(),
            email: "mike@example.com".to_string(),
            phone: "555-0101".to_string(),
            location: Coordinates::new(39.7392, -104.9903),
            skills: ["plumbing".to_string()].into_iter().collect(),
            availability: Availability::Available,
            workload,
        }
    }

    fn leak(id: &str, hours: f64) -> WorkItem {
        WorkItem {
            id: id.into(),
            title: "Fix kitchen leak".to_string(),
            kind: WorkItemKind::Job,
            location: Coordinates::new(39.7392, -104.9847),
            priority: Priority::High,
            required_skills: ["plumbing".to_string()].into_iter().collect(),
            estimated_hours: hours,
            status: WorkItemStatus::Pending,
        }
    }

    fn dispatcher(personnel: Vec<Personnel>, items: Vec<WorkItem>) -> Dispatcher {
        Dispatcher::new(
            AssignmentSettings {
                max_radius_miles: 25.0,
                require_skill_match: true,
                consider_workload: true,
                prioritize_distance: true,
            },
            Board::new(personnel, items),
        )
    }

    #[test]
    fn test_auto_assign_nearby_plumber() {
        let mut d = dispatcher(vec![plumber(45)], vec![leak("w1", 2.0)]);
        let w1 = WorkItemId::from("w1");

        let eligible = d.find_eligible(&w1).unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].personnel.id, PersonnelId::from("p1"));

        let assignment = d.auto_assign(&w1).unwrap();
        assert_eq!(assignment.personnel_id, PersonnelId::from("p1"));
        assert_eq!(assignment.workload_after, 65);
        assert!(assignment.distance_miles < 0.31);

        let item = d.work_item(&w1).unwrap();
        assert_eq!(
            item.status,
            WorkItemStatus::Assigned {
                personnel: "p1".into()
            }
        );
        assert_eq!(d.personnel(&"p1".into()).unwrap().workload, 65);
    }

    #[test]
    fn test_auto_assign_overloaded_plumber_leaves_item_pending() {
        let mut d = dispatcher(vec![plumber(85)], vec![leak("w1", 2.0)]);
        let w1 = WorkItemId::from("w1");

        assert!(d.find_eligible(&w1).unwrap().is_empty());
        assert_eq!(
            d.auto_assign(&w1),
            Err(DispatchError::NoEligibleCandidate(w1.clone()))
        );
        assert!(d.work_item(&w1).unwrap().status.is_pending());
        assert_eq!(d.personnel(&"p1".into()).unwrap().workload, 85);
    }

    #[test]
    fn test_auto_assign_unknown_item() {
        let mut d = dispatcher(vec![plumber(0)], vec![]);
        assert_eq!(
            d.auto_assign(&"nope".into()),
            Err(DispatchError::WorkItemNotFound("nope".into()))
        );
    }

    #[test]
    fn test_cannot_assign_twice() {
        let mut d = dispatcher(vec![plumber(0)], vec![leak("w1", 1.0)]);
        let w1 = WorkItemId::from("w1");
        d.auto_assign(&w1).unwrap();

        assert!(matches!(
            d.auto_assign(&w1),
            Err(DispatchError::NotPending { .. })
        ));
        assert!(matches!(
            d.force_assign(&w1, &"p1".into()),
            Err(DispatchError::NotPending { .. })
        ));
        assert_eq!(d.personnel(&"p1".into()).unwrap().workload, 10);
    }

    #[test]
    fn test_force_assign_bypasses_every_filter() {
        let mut far_away = plumber(95);
        far_away.location = Coordinates::new(40.7128, -74.0060);
        far_away.skills.clear();
        far_away.availability = Availability::Offline;

        let mut d = dispatcher(vec![far_away], vec![leak("w1", 3.0)]);
        let w1 = WorkItemId::from("w1");
        assert!(d.find_eligible(&w1).unwrap().is_empty());

        let assignment = d.force_assign(&w1, &"p1".into()).unwrap();
        assert!(assignment.distance_miles > 1000.0);
        assert_eq!(assignment.workload_after, 100);
        assert_eq!(
            d.work_item(&w1).unwrap().status.assignee(),
            Some(&PersonnelId::from("p1"))
        );
    }

    #[test]
    fn test_force_assign_not_found() {
        let mut d = dispatcher(vec![plumber(0)], vec![leak("w1", 1.0)]);
        assert_eq!(
            d.force_assign(&"w1".into(), &"ghost".into()),
            Err(DispatchError::PersonnelNotFound("ghost".into()))
        );
        assert_eq!(
            d.force_assign(&"w9".into(), &"p1".into()),
            Err(DispatchError::WorkItemNotFound("w9".into()))
        );
        assert!(d.work_item(&"w1".into()).unwrap().status.is_pending());
        assert_eq!(d.personnel(&"p1".into()).unwrap().workload, 0);
    }

    #[test]
    fn test_auto_assign_all_accumulates_workload() {
        let mut d = dispatcher(
            vec![plumber(40)],
            vec![leak("w1", 2.0), leak("w2", 2.0), leak("w3", 2.0)],
        );

        let report = d.auto_assign_all();

        // 40 -> 60 -> 80 -> 100. A workload of exactly 80 is still eligible.
        assert_eq!(report.assigned.len(), 3);
        assert_eq!(d.personnel(&"p1".into()).unwrap().workload, 100);
        assert!(report.unassigned.is_empty());

        let mut d = dispatcher(
            vec![plumber(50)],
            vec![leak("w1", 2.0), leak("w2", 2.0), leak("w3", 2.0)],
        );
        let report = d.auto_assign_all();
        // 50 -> 70 -> 90, then 90 is over the threshold.
        assert_eq!(report.assigned.len(), 2);
        assert_eq!(report.unassigned.len(), 1);
        assert_eq!(report.unassigned[0].0, WorkItemId::from("w3"));
        assert_eq!(d.pending().count(), 1);
    }

    #[test]
    fn test_every_assigned_item_has_exactly_one_assignee() {
        let mut second = plumber(10);
        second.id = "p2".into();
        second.location = Coordinates::new(39.75, -104.99);

        let mut d = dispatcher(
            vec![plumber(0), second],
            vec![leak("w1", 1.0), leak("w2", 4.0), leak("w3", 12.0)],
        );
        d.auto_assign_all();
        d.force_assign(&"w3".into(), &"p2".into()).ok();

        for item in &d.board().work_items {
            match &item.status {
                WorkItemStatus::Pending => assert!(item.status.assignee().is_none()),
                status => assert!(status.assignee().is_some()),
            }
        }
        for p in &d.board().personnel {
            assert!(p.workload <= 100);
        }
    }
}
