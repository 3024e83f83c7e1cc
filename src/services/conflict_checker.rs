use serde::{Deserialize, Serialize};

use crate::models::schedule::{DayOfWeek, FixedCommitment};
use crate::services::schedule_utils;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub conflict: bool,
    #[serde(default)]
    pub blocking_subject: Option<String>,
}

impl ConflictReport {
    fn clear() -> Self {
        Self::default()
    }

    fn blocked_by(subject: &str) -> Self {
        Self {
            conflict: true,
            blocking_subject: Some(subject.to_string()),
        }
    }
}

/// Reports the first class (in input order) on `day` that overlaps `[start, end)`.
pub fn check_conflict(
    day: DayOfWeek,
    start_minute: i64,
    end_minute: i64,
    classes: &[FixedCommitment],
) -> ConflictReport {
    classes
        .iter()
        .filter(|class| class.day == day)
        .find(|class| {
            schedule_utils::intervals_overlap(
                start_minute,
                end_minute,
                schedule_utils::time_to_minutes(&class.start_time),
                schedule_utils::time_to_minutes(&class.end_time),
            )
        })
        .map(|class| ConflictReport::blocked_by(&class.subject))
        .unwrap_or_else(ConflictReport::clear)
}

/// Class intervals on `day` as minute ranges, for carving free time out of a window.
pub fn busy_intervals(day: DayOfWeek, classes: &[FixedCommitment]) -> Vec<(i64, i64)> {
    classes
        .iter()
        .filter(|class| class.day == day)
        .map(|class| {
            (
                schedule_utils::time_to_minutes(&class.start_time),
                schedule_utils::time_to_minutes(&class.end_time),
            )
        })
        .collect()
}
