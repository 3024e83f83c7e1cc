use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::plan::{PlanBlock, RecurringBlockRequest, RecurringRegistration, ReplanOutcome};
use crate::models::settings::PlannerConfig;
use crate::models::user::UserSnapshot;
use crate::models::work_item::WorkItem;
use crate::services::recurring_blocks::RecurringBlockGenerator;
use crate::services::schedule_optimizer::ScheduleOptimizer;
use crate::services::schedule_utils::OperatingZone;
use crate::services::settings_service::SettingsService;
use crate::services::user_data_service::UserDataService;
use crate::services::work_queue::{self, PriorityList};
use crate::services::{plan_consolidator, schedule_utils};

/// Entry point for every planning request. Reads the user's snapshot, runs the pure
/// planner in the operating timezone and writes the resulting plan back.
#[derive(Clone)]
pub struct PlanningService {
    user_data: Arc<UserDataService>,
    settings: Arc<SettingsService>,
}

impl PlanningService {
    pub fn new(user_data: Arc<UserDataService>, settings: Arc<SettingsService>) -> Self {
        Self {
            user_data,
            settings,
        }
    }

    /// Regenerates the whole plan. With nothing pending the stored plan is kept.
    pub fn run_planner(&self, user_id: &str, now: DateTime<FixedOffset>) -> AppResult<ReplanOutcome> {
        let (config, now) = self.operating_context(now)?;
        let snapshot = self.user_data.snapshot(user_id)?;
        let mut queue = build_queue(&snapshot, now, &config);

        let optimizer = ScheduleOptimizer::new(config);
        let mut outcome = optimizer.replan(
            &mut queue,
            &snapshot.study_windows,
            &snapshot.schedule,
            now,
        )?;

        if let Some(generated) = outcome.plan.take() {
            let plan = plan_consolidator::replace_plan(snapshot.generated_plan, generated);
            self.user_data.save_plan(user_id, &plan)?;
            info!(target: "app::planning", user_id, blocks = plan.len(), "plan regenerated");
            outcome.plan = Some(plan);
        }

        Ok(outcome)
    }

    /// Registers explicit weekly blocks for one item, replacing only that item's blocks.
    /// Nothing is written when the request is rejected.
    pub fn schedule_recurring_blocks(
        &self,
        user_id: &str,
        request: &RecurringBlockRequest,
        now: DateTime<FixedOffset>,
    ) -> AppResult<RecurringRegistration> {
        let (config, now) = self.operating_context(now)?;
        let snapshot = self.user_data.snapshot(user_id)?;
        let queue = build_queue(&snapshot, now, &config);

        let registration =
            RecurringBlockGenerator::register(request, &queue, &snapshot.schedule, now, &config)?;

        let plan = plan_consolidator::splice_item_blocks(
            snapshot.generated_plan,
            &registration.item_name,
            registration.blocks.clone(),
        );
        self.user_data.save_plan(user_id, &plan)?;

        info!(
            target: "app::planning",
            user_id,
            item = %registration.item_name,
            blocks = registration.blocks.len(),
            skipped = registration.notes.len(),
            "recurring blocks registered"
        );
        Ok(registration)
    }

    /// The stored plan for display. Tasks and tests past their deadline and blocks from
    /// past days are pruned for good.
    pub fn fetch_plan(&self, user_id: &str, now: DateTime<FixedOffset>) -> AppResult<Vec<PlanBlock>> {
        let (config, now) = self.operating_context(now)?;
        self.user_data
            .prune_expired(user_id, now, &OperatingZone::for_config(&config, now))?;

        let stored = self.user_data.load_plan(user_id)?;
        let before = stored.len();

        let plan = plan_consolidator::drop_expired(stored, now.date_naive());
        if plan.len() != before {
            self.user_data.save_plan(user_id, &plan)?;
        }
        Ok(plan)
    }

    pub fn daily_plan_summary(&self, user_id: &str, now: DateTime<FixedOffset>) -> AppResult<String> {
        let (_, now) = self.operating_context(now)?;
        let today = now.date_naive();
        let plan = self.user_data.load_plan(user_id)?;

        let todays: Vec<String> = plan
            .iter()
            .filter(|block| block.date == today)
            .map(|block| {
                format!(
                    "{} from {} to {}",
                    block.label,
                    schedule_utils::format_time_12hr(&block.start_time),
                    schedule_utils::format_time_12hr(&block.end_time)
                )
            })
            .collect();

        if todays.is_empty() {
            return Ok("You have no study blocks for today.".to_string());
        }
        Ok(format!("Your plan for today: {}.", todays.join(", ")))
    }

    /// What to work on right now given `available_hours` of free time.
    pub fn priority_list(
        &self,
        user_id: &str,
        available_hours: f64,
        now: DateTime<FixedOffset>,
    ) -> AppResult<PriorityList> {
        if !available_hours.is_finite() || available_hours < 0.0 {
            return Err(AppError::validation_with_details(
                "available hours must be a non-negative number",
                json!({ "hours": available_hours }),
            ));
        }

        let (config, now) = self.operating_context(now)?;
        let snapshot = self.user_data.snapshot(user_id)?;
        let queue = build_queue(&snapshot, now, &config);
        Ok(work_queue::suggest_priority_list(&queue, available_hours, &config))
    }

    /// The user's records trimmed to what is due within the configured window.
    pub fn active_context(&self, user_id: &str, now: DateTime<FixedOffset>) -> AppResult<UserSnapshot> {
        let (config, now) = self.operating_context(now)?;
        self.user_data.active_context(user_id, now, &config)
    }

    /// Current config plus `now` re-expressed in the configured zone.
    fn operating_context(
        &self,
        now: DateTime<FixedOffset>,
    ) -> AppResult<(PlannerConfig, DateTime<FixedOffset>)> {
        let config = self.settings.get()?;
        let zone = OperatingZone::parse(&config.timezone)?;
        Ok((config, zone.convert(now)))
    }
}

fn build_queue(
    snapshot: &UserSnapshot,
    now: DateTime<FixedOffset>,
    config: &PlannerConfig,
) -> Vec<WorkItem> {
    let queue = work_queue::build_work_queue(snapshot.raw_records(), now, config);
    debug!(target: "app::planning", items = queue.len(), "work queue built");
    queue
}
