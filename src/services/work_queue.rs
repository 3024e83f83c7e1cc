use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::settings::PlannerConfig;
use crate::models::user::RawWorkRecord;
use crate::models::work_item::{Demand, ItemType, WorkItem};
use crate::services::schedule_utils;

const FALLBACK_PRIORITY_LABEL: &str = "low";

/// Normalizes raw task/test records into the pending work queue, most urgent first.
///
/// Naive deadlines are read in the configured operating zone. Records with a missing or unparseable
/// deadline are logged and skipped; deadlines strictly before `now` are dropped.
pub fn build_work_queue<'a, I>(
    records: I,
    now: DateTime<FixedOffset>,
    config: &PlannerConfig,
) -> Vec<WorkItem>
where
    I: IntoIterator<Item = RawWorkRecord<'a>>,
{
    let zone = schedule_utils::OperatingZone::for_config(config, now);
    let mut items = Vec::new();

    for record in records {
        let Some(raw_deadline) = record.deadline else {
            warn!(target: "app::planner", item = record.name, "skipping item without a deadline");
            continue;
        };

        let deadline = match schedule_utils::parse_deadline(raw_deadline, &zone) {
            Ok(deadline) => deadline,
            Err(err) => {
                warn!(target: "app::planner", item = record.name, error = %err, "skipping item due to parse error");
                continue;
            }
        };

        if deadline < now {
            debug!(target: "app::planner", item = record.name, "dropping item past its deadline");
            continue;
        }

        let priority_label = record
            .priority
            .or(record.type_label)
            .unwrap_or(FALLBACK_PRIORITY_LABEL);

        let blocks_needed = match record.duration_hours {
            Some(hours) => Demand::Bounded(hours.max(0.0)),
            None => Demand::Unbounded,
        };

        items.push(WorkItem {
            name: record.name.to_string(),
            deadline,
            priority_score: config.priority_for(priority_label),
            item_type: record.type_label.and_then(ItemType::from_label),
            blocks_needed,
            blocks_allocated: 0.0,
            source: record.kind,
        });
    }

    items.sort_by(|a, b| {
        a.priority_score
            .cmp(&b.priority_score)
            .then_with(|| a.deadline.cmp(&b.deadline))
    });
    items
}

/// Latest deadline in the queue, regardless of its sort order.
pub fn latest_deadline(items: &[WorkItem]) -> Option<DateTime<FixedOffset>> {
    items.iter().map(|item| item.deadline).max()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrioritySuggestion {
    pub name: String,
    pub session_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityList {
    pub available_hours: f64,
    pub suggestions: Vec<PrioritySuggestion>,
    pub total_hours: f64,
    #[serde(default)]
    pub top_item: Option<String>,
}

/// Picks, in queue order, the items whose ideal session still fits in `available_hours`.
pub fn suggest_priority_list(
    queue: &[WorkItem],
    available_hours: f64,
    config: &PlannerConfig,
) -> PriorityList {
    let mut suggestions = Vec::new();
    let mut total_hours = 0.0;

    for item in queue {
        let session_hours = config.session_hours_for(item.item_type);
        if total_hours + session_hours <= available_hours {
            suggestions.push(PrioritySuggestion {
                name: item.name.clone(),
                session_hours,
            });
            total_hours += session_hours;
        }
        if total_hours >= available_hours {
            break;
        }
    }

    PriorityList {
        available_hours,
        suggestions,
        total_hours,
        top_item: queue.first().map(|item| item.name.clone()),
    }
}

impl PriorityList {
    pub fn to_message(&self) -> String {
        let Some(top_item) = self.top_item.as_deref() else {
            return "You have no pending tasks!".to_string();
        };

        if self.suggestions.is_empty() {
            return format!(
                "You have {} hours, but your top task ({}) needs more time.",
                schedule_utils::format_hours(self.available_hours),
                top_item
            );
        }

        let mut lines = vec!["Here is your priority list:".to_string()];
        for (idx, suggestion) in self.suggestions.iter().enumerate() {
            let unit = if suggestion.session_hours == 1.0 { "hour" } else { "hours" };
            lines.push(format!(
                "{}. Work on **{}** (est. {} {})",
                idx + 1,
                suggestion.name,
                schedule_utils::format_hours(suggestion.session_hours),
                unit
            ));
        }
        lines.push(format!(
            "\nTotal: **{} hours**",
            schedule_utils::format_hours(self.total_hours)
        ));
        lines.join("\n")
    }
}
