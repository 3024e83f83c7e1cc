use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::plan::{PlanBlock, ReplanOutcome};
use crate::models::schedule::{AvailabilityWindow, DayOfWeek, FixedCommitment};
use crate::models::settings::PlannerConfig;
use crate::models::work_item::WorkItem;
use crate::services::schedule_utils::OperatingZone;
use crate::services::{conflict_checker, plan_consolidator, schedule_utils, work_queue};

/// Greedy single-pass planner that fills every availability window from today to the
/// horizon with the most urgent eligible work item.
pub struct ScheduleOptimizer {
    config: PlannerConfig,
}

#[derive(Debug, Clone, Copy)]
struct ParsedWindow {
    day: DayOfWeek,
    start: i64,
    end: i64,
}

impl ScheduleOptimizer {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Full replan. An empty queue yields `NothingToSchedule` and no plan, so callers
    /// never overwrite a stored plan with nothing.
    pub fn replan(
        &self,
        queue: &mut [WorkItem],
        windows: &[AvailabilityWindow],
        classes: &[FixedCommitment],
        now: DateTime<FixedOffset>,
    ) -> AppResult<ReplanOutcome> {
        if queue.is_empty() {
            info!(target: "app::planner", "no pending work items, plan left untouched");
            return Ok(ReplanOutcome::nothing_to_schedule());
        }

        let plan = self.build_plan(queue, windows, classes, now)?;
        Ok(ReplanOutcome::regenerated(plan))
    }

    /// Walks each day up to the horizon and fills matching windows. `queue` must be in
    /// priority order; its `blocks_allocated` totals are updated in place.
    pub fn build_plan(
        &self,
        queue: &mut [WorkItem],
        windows: &[AvailabilityWindow],
        classes: &[FixedCommitment],
        now: DateTime<FixedOffset>,
    ) -> AppResult<Vec<PlanBlock>> {
        let zone = OperatingZone::for_config(&self.config, now);
        let today = now.date_naive();
        let floor_end = schedule_utils::days_after(now, self.config.horizon_floor_days)?;
        let horizon_end = work_queue::latest_deadline(queue)
            .map_or(floor_end, |latest| latest.max(floor_end));
        let stop_day = zone.date_of(horizon_end);

        let parsed_windows = parse_windows(windows);
        let mut plan = Vec::new();
        let mut day = today;
        let mut visited: i64 = 0;

        while day < stop_day {
            if visited >= self.config.max_horizon_days {
                warn!(target: "app::planner", %day, visited, "day cap reached, horizon truncated");
                break;
            }
            visited += 1;

            let weekday = DayOfWeek::from(day.weekday());
            let busy = conflict_checker::busy_intervals(weekday, classes);
            for window in parsed_windows.iter().filter(|window| window.day == weekday) {
                self.fill_window(day, window, &busy, queue, now, &zone, &mut plan);
            }

            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        plan_consolidator::sort_plan(&mut plan);
        info!(target: "app::planner", blocks = plan.len(), days = visited, "full-horizon plan generated");
        Ok(plan)
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_window(
        &self,
        day: NaiveDate,
        window: &ParsedWindow,
        busy: &[(i64, i64)],
        queue: &mut [WorkItem],
        now: DateTime<FixedOffset>,
        zone: &OperatingZone,
        plan: &mut Vec<PlanBlock>,
    ) {
        let mut earliest = window.start;
        if day == now.date_naive() && schedule_utils::at_minutes(day, window.start, zone) < now {
            earliest = earliest.max(schedule_utils::ceil_to_hour_minutes(now));
        }
        if earliest >= window.end {
            return;
        }

        for (segment_start, segment_end) in schedule_utils::free_segments(earliest, window.end, busy) {
            let mut cursor = segment_start;
            while cursor < segment_end {
                let cursor_at = schedule_utils::at_minutes(day, cursor, zone);
                let Some(item) = queue
                    .iter_mut()
                    .find(|item| is_eligible(item, day, cursor_at, zone))
                else {
                    return;
                };

                let mut item_cap = self.config.session_hours_for(item.item_type);
                if let Some(remaining) = item.remaining_hours() {
                    item_cap = item_cap.min(remaining);
                }
                if item_cap.trunc() < 1.0 {
                    debug!(target: "app::planner", item = %item.name, %day, "session rounds to zero hours, window closed");
                    return;
                }

                let remaining_window = (segment_end - cursor) as f64 / 60.0;
                let hours = item_cap.min(remaining_window).trunc() as i64;
                if hours < 1 {
                    break;
                }

                let end = cursor + hours * 60;
                plan.push(PlanBlock::for_item(
                    day,
                    schedule_utils::minutes_to_clock(cursor),
                    schedule_utils::minutes_to_clock(end),
                    &item.name,
                ));
                item.record_allocation(hours as f64);
                cursor = end;
            }
        }
    }
}

/// An item may take a slot only on days strictly before its deadline's calendar day.
fn is_eligible(
    item: &WorkItem,
    day: NaiveDate,
    cursor_at: DateTime<FixedOffset>,
    zone: &OperatingZone,
) -> bool {
    let deadline_day = zone.date_of(item.deadline);
    !item.is_complete() && day < deadline_day && cursor_at < item.deadline
}

fn parse_windows(windows: &[AvailabilityWindow]) -> Vec<ParsedWindow> {
    windows
        .iter()
        .filter_map(|window| {
            let bounds = schedule_utils::parse_clock(&window.start_time)
                .and_then(|start| Ok((start, schedule_utils::parse_clock(&window.end_time)?)));
            match bounds {
                Ok((start, end)) if start < end => Some(ParsedWindow {
                    day: window.day,
                    start: schedule_utils::minutes_from_midnight(start),
                    end: schedule_utils::minutes_from_midnight(end),
                }),
                _ => {
                    warn!(
                        target: "app::planner",
                        day = %window.day,
                        start = %window.start_time,
                        end = %window.end_time,
                        "skipping malformed study window"
                    );
                    None
                }
            }
        })
        .collect()
}
