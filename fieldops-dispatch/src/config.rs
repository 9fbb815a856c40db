use crate::error::ConfigError;

/// Workload above this percentage makes a technician ineligible when
/// `consider_workload` is on.
pub const WORKLOAD_BUSY_THRESHOLD: u8 = 80;

/// Workload points added per estimated hour of an assigned work item.
pub const WORKLOAD_POINTS_PER_HOUR: f64 = 10.0;

pub const WORKLOAD_CAP: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentSettings {
    // Personnel farther than this from the work item are never auto-assigned.
    pub max_radius_miles: f64,
    // Require at least one skill in common with the work item.
    pub require_skill_match: bool,
    // Skip personnel whose workload is above WORKLOAD_BUSY_THRESHOLD.
    pub consider_workload: bool,
    // Rank by distance when true, by workload otherwise. Does not affect eligibility.
    pub prioritize_distance: bool,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            max_radius_miles: 25.0,
            require_skill_match: true,
            consider_workload: true,
            prioritize_distance: true,
        }
    }
}

impl AssignmentSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `FIELDOPS_*` overrides through `lookup`, keeping defaults for
    /// anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup("FIELDOPS_MAX_RADIUS_MILES") {
            let radius = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|radius| radius.is_finite() && *radius >= 0.0)
                .ok_or_else(|| ConfigError::invalid("FIELDOPS_MAX_RADIUS_MILES", &value))?;
            settings.max_radius_miles = radius;
        }
        if let Some(value) = lookup("FIELDOPS_REQUIRE_SKILL_MATCH") {
            settings.require_skill_match = parse_flag("FIELDOPS_REQUIRE_SKILL_MATCH", &value)?;
        }
        if let Some(value) = lookup("FIELDOPS_CONSIDER_WORKLOAD") {
            settings.consider_workload = parse_flag("FIELDOPS_CONSIDER_WORKLOAD", &value)?;
        }
        if let Some(value) = lookup("FIELDOPS_PRIORITIZE_DISTANCE") {
            settings.prioritize_distance = parse_flag("FIELDOPS_PRIORITIZE_DISTANCE", &value)?;
        }

        Ok(settings)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value)),
    }
}
