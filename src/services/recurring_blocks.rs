use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, FixedOffset};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::plan::{PlanBlock, RecurringBlockRequest, RecurringRegistration};
use crate::models::schedule::{DayOfWeek, FixedCommitment};
use crate::models::settings::PlannerConfig;
use crate::models::work_item::WorkItem;
use crate::services::{conflict_checker, schedule_utils};

/// Generates the explicit weekly blocks for a single work item, from today up to the
/// day before its deadline.
pub struct RecurringBlockGenerator;

impl RecurringBlockGenerator {
    /// Builds every block for `request.item_name`. The caller splices them into the
    /// stored plan in place of any earlier blocks for the same item.
    pub fn register(
        request: &RecurringBlockRequest,
        queue: &[WorkItem],
        classes: &[FixedCommitment],
        now: DateTime<FixedOffset>,
        config: &PlannerConfig,
    ) -> AppResult<RecurringRegistration> {
        let item = resolve_item(queue, &request.item_name)?;
        let days = parse_days(&request.days)?;

        let start_minute =
            schedule_utils::minutes_from_midnight(schedule_utils::parse_clock(&request.start_time)?);
        let requested_end =
            schedule_utils::minutes_from_midnight(schedule_utils::parse_clock(&request.end_time)?);
        if requested_end <= start_minute {
            return Err(AppError::validation_with_details(
                "end time must be after start time",
                json!({ "startTime": request.start_time, "endTime": request.end_time }),
            ));
        }

        let mut notes = Vec::new();
        let cap_hours = config.session_hours_for(item.item_type);
        let cap_minutes = (cap_hours * 60.0).round() as i64;
        let end_minute = if cap_minutes > 0 && requested_end - start_minute > cap_minutes {
            let capped_end = start_minute + cap_minutes;
            notes.push(format!(
                "'{}' is a {} item, so each session is capped at {} hours: blocks run {}-{} instead of {}-{}.",
                item.name,
                item.type_label(),
                schedule_utils::format_hours(cap_hours),
                schedule_utils::minutes_to_clock(start_minute),
                schedule_utils::minutes_to_clock(capped_end),
                schedule_utils::minutes_to_clock(start_minute),
                schedule_utils::minutes_to_clock(requested_end),
            ));
            capped_end
        } else {
            requested_end
        };

        let start_label = schedule_utils::minutes_to_clock(start_minute);
        let end_label = schedule_utils::minutes_to_clock(end_minute);
        let zone = schedule_utils::OperatingZone::for_config(config, now);
        let deadline_day = zone.date_of(item.deadline);

        let mut blocks = Vec::new();
        let mut day = now.date_naive();
        let mut visited: i64 = 0;

        while day < deadline_day {
            if visited >= config.max_horizon_days {
                notes.push(format!(
                    "Stopped after {visited} days; dates from {day} onward were not scheduled."
                ));
                break;
            }
            visited += 1;

            let weekday = DayOfWeek::from(day.weekday());
            if days.contains(&weekday) {
                let block_end = schedule_utils::at_minutes(day, end_minute, &zone);
                let report =
                    conflict_checker::check_conflict(weekday, start_minute, end_minute, classes);

                if block_end <= now {
                    notes.push(format!(
                        "Skipped {day} ({weekday}): {start_label}-{end_label} has already passed."
                    ));
                } else if let Some(subject) = report.blocking_subject {
                    notes.push(format!(
                        "Skipped {day} ({weekday}): conflicts with your {subject} class."
                    ));
                } else {
                    blocks.push(PlanBlock::for_item(
                        day,
                        start_label.clone(),
                        end_label.clone(),
                        &item.name,
                    ));
                }
            }

            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        debug!(target: "app::planner", item = %item.name, notes = notes.len(), "recurring walk finished");
        info!(target: "app::planner", item = %item.name, blocks = blocks.len(), "recurring blocks generated");

        Ok(RecurringRegistration {
            item_name: item.name.clone(),
            blocks,
            notes,
        })
    }
}

fn resolve_item<'q>(queue: &'q [WorkItem], name: &str) -> AppResult<&'q WorkItem> {
    let wanted = name.trim().to_lowercase();
    let matches: Vec<&WorkItem> = queue
        .iter()
        .filter(|item| item.name.trim().to_lowercase() == wanted)
        .collect();

    match matches.as_slice() {
        [item] => Ok(*item),
        [] => Err(AppError::item_not_found(name.trim())),
        _ => Err(AppError::validation_with_details(
            "item name matches more than one task or test",
            json!({ "itemName": name, "matches": matches.len() }),
        )),
    }
}

fn parse_days(raw_days: &[String]) -> AppResult<BTreeSet<DayOfWeek>> {
    let days = raw_days
        .iter()
        .map(|raw| raw.parse::<DayOfWeek>())
        .collect::<AppResult<BTreeSet<_>>>()?;
    if days.is_empty() {
        return Err(AppError::validation("at least one weekday is required"));
    }
    Ok(days)
}
