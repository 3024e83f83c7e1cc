use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rusqlite::Connection;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::db::repositories::plan_repository::PlanRepository;
use crate::db::repositories::user_data_repository::{
    ClassRow, StudyWindowRow, TaskRow, TestRow, UserDataRepository,
};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::plan::PlanBlock;
use crate::models::schedule::{AvailabilityWindow, ClassUpdate, FixedCommitment};
use crate::models::settings::PlannerConfig;
use crate::models::user::{ItemUpdate, TaskRecord, TestRecord, UserSnapshot};
use crate::models::work_item::RecordKind;
use crate::services::schedule_utils::OperatingZone;
use crate::services::{plan_consolidator, schedule_utils};

const TOP_PRIORITY_LABEL: &str = "top";
const END_OF_DAY: &str = "T23:59:59";

/// Reads and writes a user's records: the collaborator the planner reads its snapshot
/// from and writes its generated plan back through.
#[derive(Clone)]
pub struct UserDataService {
    db: DbPool,
}

impl UserDataService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn add_task(&self, user_id: &str, record: TaskRecord) -> AppResult<TaskRecord> {
        ensure_name(&record.name)?;
        if let Some(hours) = record.duration_hours {
            ensure_duration(hours)?;
        }

        let row = TaskRow::from_record(user_id, &record);
        self.db.with_transaction(|tx| {
            ensure_name_free(tx, user_id, &record.name)?;
            UserDataRepository::insert_task(tx, &row)?;
            Ok(())
        })?;
        info!(target: "app::user_data", user_id, task = %record.name, "task added");
        Ok(record)
    }

    /// Tests given only a date are due at the end of that day.
    pub fn add_test(&self, user_id: &str, mut record: TestRecord) -> AppResult<TestRecord> {
        ensure_name(&record.name)?;
        if record.deadline.is_none() {
            record.deadline = record
                .date
                .as_deref()
                .map(str::trim)
                .filter(|date| !date.is_empty())
                .map(|date| format!("{date}{END_OF_DAY}"));
        }

        let row = TestRow::from_record(user_id, &record);
        self.db.with_transaction(|tx| {
            ensure_name_free(tx, user_id, &record.name)?;
            UserDataRepository::insert_test(tx, &row)?;
            Ok(())
        })?;
        info!(target: "app::user_data", user_id, test = %record.name, "test added");
        Ok(record)
    }

    pub fn add_class(&self, user_id: &str, class: FixedCommitment) -> AppResult<FixedCommitment> {
        ensure_name(&class.subject)?;

        let row = ClassRow::from_record(user_id, &class);
        self.db
            .with_connection(|conn| UserDataRepository::insert_class(conn, &row))?;
        info!(target: "app::user_data", user_id, subject = %class.subject, day = %class.day, "class added");
        Ok(class)
    }

    /// Appends windows to the ones already stored.
    pub fn add_study_windows(&self, user_id: &str, windows: &[AvailabilityWindow]) -> AppResult<usize> {
        self.db.with_transaction(|tx| {
            for window in windows {
                let row = StudyWindowRow::from_record(user_id, window);
                UserDataRepository::insert_study_window(tx, &row)?;
            }
            Ok(())
        })?;
        info!(target: "app::user_data", user_id, count = windows.len(), "study windows added");
        Ok(windows.len())
    }

    pub fn snapshot(&self, user_id: &str) -> AppResult<UserSnapshot> {
        self.db.with_connection(|conn| load_snapshot(conn, user_id))
    }

    /// Snapshot trimmed to items due within `config.active_context_days` (or marked
    /// top priority). The generated plan is left out.
    pub fn active_context(
        &self,
        user_id: &str,
        now: DateTime<FixedOffset>,
        config: &PlannerConfig,
    ) -> AppResult<UserSnapshot> {
        let cutoff = schedule_utils::days_after(now, config.active_context_days)?;
        let zone = OperatingZone::for_config(config, now);
        let snapshot = self.snapshot(user_id)?;

        let is_active = |deadline: Option<&str>, priority: Option<&str>| {
            let Some(deadline) = deadline.and_then(|raw| schedule_utils::parse_deadline(raw, &zone).ok())
            else {
                return false;
            };
            deadline < cutoff || priority.is_some_and(|label| label == TOP_PRIORITY_LABEL)
        };

        let tasks: Vec<TaskRecord> = snapshot
            .tasks
            .into_iter()
            .filter(|task| is_active(task.deadline.as_deref(), task.priority.as_deref()))
            .collect();
        let tests: Vec<TestRecord> = snapshot
            .tests
            .into_iter()
            .filter(|test| {
                is_active(
                    test.deadline.as_deref().or(test.date.as_deref()),
                    test.priority.as_deref(),
                )
            })
            .collect();

        debug!(target: "app::user_data", user_id, tasks = tasks.len(), tests = tests.len(), "active context built");
        Ok(UserSnapshot {
            tasks,
            tests,
            schedule: snapshot.schedule,
            study_windows: snapshot.study_windows,
            generated_plan: Vec::new(),
        })
    }

    pub fn load_plan(&self, user_id: &str) -> AppResult<Vec<PlanBlock>> {
        self.db.with_connection(|conn| load_plan(conn, user_id))
    }

    pub fn save_plan(&self, user_id: &str, plan: &[PlanBlock]) -> AppResult<()> {
        self.db.with_transaction(|tx| {
            PlanRepository::replace(tx, user_id, plan)?;
            Ok(())
        })?;
        debug!(target: "app::user_data", user_id, blocks = plan.len(), "plan saved");
        Ok(())
    }

    pub fn complete_block(&self, user_id: &str, date: NaiveDate, start_time: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| PlanRepository::mark_completed(conn, user_id, date, start_time))
    }

    /// Removes every task, test or class called `name` along with the item's plan
    /// blocks. Returns whether anything was removed.
    pub fn delete_item(&self, user_id: &str, name: &str) -> AppResult<bool> {
        let removed = self.db.with_transaction(|tx| {
            let records = UserDataRepository::delete_named(tx, user_id, name)?;

            let plan = load_plan(tx, user_id)?;
            let before = plan.len();
            let kept = plan_consolidator::remove_item_blocks(plan, name);
            let blocks = before - kept.len();
            if blocks > 0 {
                PlanRepository::replace(tx, user_id, &kept)?;
            }
            Ok(records + blocks)
        })?;

        info!(target: "app::user_data", user_id, item = name, removed, "item deleted");
        Ok(removed > 0)
    }

    /// Renames a task or test and moves its plan blocks to the new label.
    pub fn rename_item(&self, user_id: &str, current_name: &str, new_name: &str) -> AppResult<usize> {
        self.update_item(user_id, current_name, &ItemUpdate::rename(new_name))
    }

    /// Edits a task or test in place. A new name must not collide with another item
    /// and carries the item's plan blocks along with it.
    pub fn update_item(
        &self,
        user_id: &str,
        current_name: &str,
        update: &ItemUpdate,
    ) -> AppResult<usize> {
        if update.is_empty() {
            return Err(AppError::validation("no fields to update"));
        }
        let mut update = update.clone();
        if let Some(name) = update.new_name.as_mut() {
            ensure_name(name)?;
            *name = name.trim().to_string();
        }
        if let Some(hours) = update.new_duration_hours {
            ensure_duration(hours)?;
        }
        if let Some(deadline) = update.new_deadline.as_deref() {
            schedule_utils::parse_deadline(deadline, &OperatingZone::Fixed(Utc.fix()))?;
        }

        let changed = self.db.with_transaction(|tx| {
            let Some(kind) = UserDataRepository::find_item_kind(tx, user_id, current_name)? else {
                return Ok(0);
            };
            if kind == RecordKind::Test && update.new_duration_hours.is_some() {
                return Err(AppError::validation_with_details(
                    "tests do not carry a duration",
                    json!({ "itemName": current_name }),
                ));
            }

            let new_name = update.new_name.as_deref();
            if let Some(name) = new_name.filter(|name| !same_name(name, current_name)) {
                ensure_name_free(tx, user_id, name)?;
            }

            let changed = UserDataRepository::update_item(tx, kind, user_id, current_name, &update)?;
            if let Some(name) = new_name {
                let mut plan = load_plan(tx, user_id)?;
                if plan_consolidator::relabel_item_blocks(&mut plan, current_name, name) > 0 {
                    PlanRepository::replace(tx, user_id, &plan)?;
                }
            }
            Ok(changed)
        })?;

        if changed == 0 {
            return Err(AppError::item_not_found(current_name));
        }
        info!(target: "app::user_data", user_id, item = current_name, changed, "item updated");
        Ok(changed)
    }

    /// Moves every class called `subject` to the new day or times.
    pub fn update_class(
        &self,
        user_id: &str,
        subject: &str,
        update: &ClassUpdate,
    ) -> AppResult<usize> {
        if update.is_empty() {
            return Err(AppError::validation("no fields to update"));
        }

        let changed = self.db.with_transaction(|tx| {
            let rows = UserDataRepository::find_classes(tx, user_id, subject)?;
            for mut row in rows.iter().cloned() {
                if let Some(day) = update.new_day {
                    row.day = day.as_str().to_string();
                }
                if let Some(start) = update.new_start_time.as_deref() {
                    row.start_time = start.trim().to_string();
                }
                if let Some(end) = update.new_end_time.as_deref() {
                    row.end_time = end.trim().to_string();
                }

                let start = schedule_utils::parse_clock(&row.start_time)?;
                let end = schedule_utils::parse_clock(&row.end_time)?;
                if end <= start {
                    return Err(AppError::validation_with_details(
                        "class must end after it starts",
                        json!({ "subject": subject, "startTime": row.start_time, "endTime": row.end_time }),
                    ));
                }
                UserDataRepository::update_class(tx, &row)?;
            }
            Ok(rows.len())
        })?;

        if changed == 0 {
            return Err(AppError::item_not_found(subject));
        }
        info!(target: "app::user_data", user_id, subject, changed, "class updated");
        Ok(changed)
    }

    /// Deletes tasks and tests whose deadline has passed. Records with unreadable
    /// deadlines are kept.
    pub fn prune_expired(
        &self,
        user_id: &str,
        now: DateTime<FixedOffset>,
        zone: &OperatingZone,
    ) -> AppResult<usize> {
        let is_past = |deadline: Option<&str>| {
            deadline
                .and_then(|raw| schedule_utils::parse_deadline(raw, zone).ok())
                .is_some_and(|deadline| deadline < now)
        };

        let removed = self.db.with_transaction(|tx| {
            let mut removed = 0;
            for row in UserDataRepository::list_tasks(tx, user_id)? {
                if is_past(row.deadline.as_deref()) {
                    removed += UserDataRepository::delete_task(tx, &row.id)?;
                }
            }
            for row in UserDataRepository::list_tests(tx, user_id)? {
                if is_past(row.deadline.as_deref().or(row.date.as_deref())) {
                    removed += UserDataRepository::delete_test(tx, &row.id)?;
                }
            }
            Ok(removed)
        })?;

        if removed > 0 {
            info!(target: "app::user_data", user_id, removed, "expired tasks and tests removed");
        }
        Ok(removed)
    }
}

fn ensure_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    Ok(())
}

fn ensure_duration(hours: f64) -> AppResult<()> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(AppError::validation("durationHours must be a non-negative number"));
    }
    Ok(())
}

/// Task and test names are unique per user, ignoring case.
fn ensure_name_free(conn: &Connection, user_id: &str, name: &str) -> AppResult<()> {
    if UserDataRepository::find_item_kind(conn, user_id, name.trim())?.is_some() {
        return Err(AppError::conflict(format!(
            "a task or test named '{}' already exists",
            name.trim()
        )));
    }
    Ok(())
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn load_snapshot(conn: &Connection, user_id: &str) -> AppResult<UserSnapshot> {
    let tasks = UserDataRepository::list_tasks(conn, user_id)?
        .into_iter()
        .map(TaskRow::into_record)
        .collect();
    let tests = UserDataRepository::list_tests(conn, user_id)?
        .into_iter()
        .map(TestRow::into_record)
        .collect();

    let schedule = UserDataRepository::list_classes(conn, user_id)?
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match row.into_record() {
                Ok(class) => Some(class),
                Err(err) => {
                    warn!(target: "app::user_data", id = %id, error = %err, "skipping class with invalid day");
                    None
                }
            }
        })
        .collect();

    let study_windows = UserDataRepository::list_study_windows(conn, user_id)?
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match row.into_record() {
                Ok(window) => Some(window),
                Err(err) => {
                    warn!(target: "app::user_data", id = %id, error = %err, "skipping study window with invalid day");
                    None
                }
            }
        })
        .collect();

    Ok(UserSnapshot {
        tasks,
        tests,
        schedule,
        study_windows,
        generated_plan: load_plan(conn, user_id)?,
    })
}

fn load_plan(conn: &Connection, user_id: &str) -> AppResult<Vec<PlanBlock>> {
    PlanRepository::list(conn, user_id)?
        .into_iter()
        .map(|row| row.into_record())
        .collect()
}
