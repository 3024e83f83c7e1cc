use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::work_item::ItemType;

pub const DEFAULT_TIMEZONE: &str = "+08:00";
const DEFAULT_UNKNOWN_PRIORITY: i32 = 99;
const DEFAULT_SESSION_HOURS: f64 = 1.0;
const DEFAULT_HORIZON_FLOOR_DAYS: i64 = 7;
const DEFAULT_MAX_HORIZON_DAYS: i64 = 366;
const DEFAULT_ACTIVE_CONTEXT_DAYS: i64 = 30;
/// Upper bound accepted for any configured day count.
pub const MAX_HORIZON_LIMIT_DAYS: i64 = 3660;

/// Tunables for one scheduling run. Lower priority scores are more urgent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    /// Fixed offset (`+08:00`) or IANA zone name that naive deadlines and "today" are
    /// interpreted in.
    pub timezone: String,
    pub priority_table: BTreeMap<String, i32>,
    pub unknown_priority: i32,
    /// Ideal hours per session, keyed by item type label.
    pub session_hours: BTreeMap<String, f64>,
    pub default_session_hours: f64,
    pub horizon_floor_days: i64,
    /// Hard ceiling on how many calendar days any walk may visit.
    pub max_horizon_days: i64,
    pub active_context_days: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let priority_table = [
            ("top", 0),
            ("high", 1),
            ("medium", 2),
            ("low", 3),
            ("exam", 1),
            ("project", 2),
            ("quiz", 3),
            ("assignment", 4),
            ("seatwork", 5),
        ]
        .into_iter()
        .map(|(label, score)| (label.to_string(), score))
        .collect();

        let session_hours = [
            (ItemType::Exam, 3.0),
            (ItemType::Project, 2.0),
            (ItemType::Quiz, 1.0),
            (ItemType::Assignment, 1.0),
            (ItemType::Seatwork, 0.5),
        ]
        .into_iter()
        .map(|(item_type, hours)| (item_type.as_str().to_string(), hours))
        .collect();

        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            priority_table,
            unknown_priority: DEFAULT_UNKNOWN_PRIORITY,
            session_hours,
            default_session_hours: DEFAULT_SESSION_HOURS,
            horizon_floor_days: DEFAULT_HORIZON_FLOOR_DAYS,
            max_horizon_days: DEFAULT_MAX_HORIZON_DAYS,
            active_context_days: DEFAULT_ACTIVE_CONTEXT_DAYS,
        }
    }
}

impl PlannerConfig {
    pub fn priority_for(&self, label: &str) -> i32 {
        self.priority_table
            .get(&label.trim().to_lowercase())
            .copied()
            .unwrap_or(self.unknown_priority)
    }

    pub fn session_hours_for(&self, item_type: Option<ItemType>) -> f64 {
        item_type
            .and_then(|kind| self.session_hours.get(kind.as_str()).copied())
            .unwrap_or(self.default_session_hours)
    }
}
