use crate::{
    config::{AssignmentSettings, WORKLOAD_BUSY_THRESHOLD},
    state::Personnel,
    task::WorkItem,
};

/// A technician who passed every filter, with their distance to the job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'a> {
    pub personnel: &'a Personnel,
    pub distance_miles: f64,
}

/// Filters `pool` down to the personnel that may be auto-assigned to
/// `work_item`. Roster order is preserved; ranking happens in [`rank`].
///
/// Filters apply in order: availability, radius, skill overlap (if
/// required), workload (if considered).
pub fn find_eligible<'a>(
    work_item: &WorkItem,
    pool: &'a [Personnel],
    settings: &AssignmentSettings,
) -> Vec<Candidate<'a>> {
    pool.iter()
        .filter(|personnel| personnel.is_available())
        .map(|personnel| Candidate {
            personnel,
            distance_miles: work_item.location.distance_miles(&personnel.location),
        })
        .filter(|candidate| candidate.distance_miles <= settings.max_radius_miles)
        .filter(|candidate| {
            !settings.require_skill_match
                || candidate
                    .personnel
                    .shares_skill_with(&work_item.required_skills)
        })
        .filter(|candidate| {
            !settings.consider_workload
                || candidate.personnel.workload <= WORKLOAD_BUSY_THRESHOLD
        })
        .collect()
}

/// Orders candidates best first: nearest when `prioritize_distance`, least
/// loaded otherwise. Ties go to the lexicographically smallest personnel id.
pub fn rank(candidates: &mut [Candidate<'_>], settings: &AssignmentSettings) {
    candidates.sort_by(|a, b| {
        let primary = if settings.prioritize_distance {
            a.distance_miles.total_cmp(&b.distance_miles)
        } else {
            a.personnel.workload.cmp(&b.personnel.workload)
        };
        primary.then_with(|| a.personnel.id.cmp(&b.personnel.id))
    });
}

pub fn best_candidate<'a>(
    work_item: &WorkItem,
    pool: &'a [Personnel],
    settings: &AssignmentSettings,
) -> Option<Candidate<'a>> {
    let mut candidates = find_eligible(work_item, pool, settings);
    rank(&mut candidates, settings);
    candidates.into_iter().next()
}
