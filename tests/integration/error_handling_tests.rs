use chrono::{DateTime, FixedOffset, TimeZone};
use smart_schedule_lib::db::repositories::settings_repository::SettingsRepository;
use smart_schedule_lib::db::repositories::user_data_repository::{
    ClassRow, UserDataRepository,
};
use smart_schedule_lib::db::DbPool;
use smart_schedule_lib::models::plan::{PlanBlock, RecurringBlockRequest, ReplanStatus};
use smart_schedule_lib::models::schedule::{AvailabilityWindow, DayOfWeek, FixedCommitment};
use smart_schedule_lib::models::user::TaskRecord;
use smart_schedule_lib::{AppError, AppState};
use tempfile::tempdir;

const USER: &str = "student-1";

fn setup() -> (tempfile::TempDir, DbPool, AppState) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("errors.sqlite")).expect("db pool");
    let state = AppState::new(pool.clone());
    (dir, pool, state)
}

fn now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .expect("offset")
        .with_ymd_and_hms(2025, 3, 3, 10, 0, 0)
        .single()
        .expect("local time")
}

fn task(name: &str, deadline: Option<&str>) -> TaskRecord {
    TaskRecord {
        name: name.to_string(),
        task_type: Some("quiz".to_string()),
        deadline: deadline.map(str::to_string),
        ..Default::default()
    }
}

fn seed_plan(state: &AppState) -> Vec<PlanBlock> {
    let date = chrono::NaiveDate::from_ymd_opt(2025, 3, 4).expect("date");
    let plan = vec![PlanBlock::for_item(date, "18:00".into(), "19:00".into(), "Essay")];
    state.user_data().save_plan(USER, &plan).expect("save");
    plan
}

#[test]
fn unknown_recurring_item_leaves_plan_untouched() {
    let (_dir, _pool, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", Some("2025-03-20")))
        .expect("task");
    let plan = seed_plan(&state);

    let err = state
        .planning()
        .schedule_recurring_blocks(
            USER,
            &RecurringBlockRequest {
                item_name: "Thesis".to_string(),
                days: vec!["Monday".to_string()],
                start_time: "14:00".to_string(),
                end_time: "15:00".to_string(),
            },
            now(),
        )
        .expect_err("unknown item");

    assert!(err.is_item_not_found());
    assert!(matches!(err, AppError::ItemNotFound { ref name } if name == "Thesis"));
    assert_eq!(state.user_data().load_plan(USER).expect("load"), plan);
}

#[test]
fn malformed_recurring_times_are_rejected_without_writes() {
    let (_dir, _pool, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", Some("2025-03-20")))
        .expect("task");
    let plan = seed_plan(&state);

    for (start, end, days) in [
        ("2pm", "15:00", vec!["Monday"]),
        ("15:00", "14:00", vec!["Monday"]),
        ("14:00", "15:00", vec!["Someday"]),
        ("14:00", "15:00", vec![]),
    ] {
        let result = state.planning().schedule_recurring_blocks(
            USER,
            &RecurringBlockRequest {
                item_name: "Essay".to_string(),
                days: days.into_iter().map(str::to_string).collect(),
                start_time: start.to_string(),
                end_time: end.to_string(),
            },
            now(),
        );
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    assert_eq!(state.user_data().load_plan(USER).expect("load"), plan);
}

#[test]
fn malformed_records_are_skipped_not_fatal() {
    let (_dir, _pool, state) = setup();
    let users = state.user_data();
    users.add_task(USER, task("Mystery", Some("someday"))).expect("task");
    users.add_task(USER, task("Undated", None)).expect("task");
    users.add_task(USER, task("Reading", Some("2025-03-04"))).expect("task");
    users
        .add_study_windows(
            USER,
            &[
                AvailabilityWindow::new(DayOfWeek::Monday, "", "19:00"),
                AvailabilityWindow::new(DayOfWeek::Monday, "20:00", "21:00"),
            ],
        )
        .expect("windows");

    let outcome = state.planning().run_planner(USER, now()).expect("replan");

    assert_eq!(outcome.status, ReplanStatus::Regenerated);
    let plan = outcome.plan.expect("plan");
    assert_eq!(plan.len(), 1);
    assert!(plan[0].is_for_item("Reading"));
    assert_eq!(plan[0].start_time, "20:00");
}

#[test]
fn class_rows_with_unknown_days_are_ignored() {
    let (_dir, pool, state) = setup();
    let mut bad = ClassRow::from_record(
        USER,
        &FixedCommitment::new("Ghost", DayOfWeek::Monday, "18:00", "19:00"),
    );
    bad.day = "Funday".to_string();
    pool.with_connection(|conn| UserDataRepository::insert_class(conn, &bad))
        .expect("insert");
    state
        .user_data()
        .add_class(USER, FixedCommitment::new("Math", DayOfWeek::Tuesday, "08:00", "09:00"))
        .expect("class");

    let snapshot = state.user_data().snapshot(USER).expect("snapshot");
    let subjects: Vec<_> = snapshot.schedule.iter().map(|c| c.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Math"]);
}

#[test]
fn unknown_operating_timezone_fails_the_request() {
    let (_dir, pool, state) = setup();
    pool.with_connection(|conn| {
        SettingsRepository::upsert(conn, "planner_config", r#"{"timezone":"Mars/Olympus"}"#)
    })
    .expect("upsert");

    let result = state.planning().run_planner(USER, now());
    assert!(matches!(result, Err(AppError::Validation { .. })));
}

#[test]
fn unreadable_settings_fall_back_to_defaults() {
    let (_dir, pool, state) = setup();
    pool.with_connection(|conn| SettingsRepository::upsert(conn, "planner_config", "not json"))
        .expect("upsert");
    state
        .user_data()
        .add_task(USER, task("Reading", Some("2025-03-04")))
        .expect("task");

    let outcome = state.planning().run_planner(USER, now()).expect("replan");
    assert_eq!(outcome.status, ReplanStatus::Regenerated);
    assert_eq!(state.settings().get().expect("settings").timezone, "+08:00");
}

#[test]
fn oversized_stored_day_counts_fail_without_panicking() {
    let (_dir, pool, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Reading", Some("2025-03-04")))
        .expect("task");
    pool.with_connection(|conn| {
        SettingsRepository::upsert(
            conn,
            "planner_config",
            r#"{"horizonFloorDays":1000000000,"activeContextDays":1000000000}"#,
        )
    })
    .expect("upsert");

    let replan = state.planning().run_planner(USER, now());
    assert!(matches!(replan, Err(AppError::Validation { .. })));

    let context = state.planning().active_context(USER, now());
    assert!(matches!(context, Err(AppError::Validation { .. })));
}

#[test]
fn duplicate_item_names_are_rejected() {
    let (_dir, _pool, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", Some("2025-03-20")))
        .expect("task");
    state
        .user_data()
        .add_task(USER, task("Lab", Some("2025-03-20")))
        .expect("task");

    let duplicate = state
        .user_data()
        .add_task(USER, task("essay", Some("2025-03-21")));
    assert!(matches!(duplicate, Err(AppError::Conflict { .. })));
    let rename = state.user_data().rename_item(USER, "Lab", "ESSAY");
    assert!(matches!(rename, Err(AppError::Conflict { .. })));

    let registration = state
        .planning()
        .schedule_recurring_blocks(
            USER,
            &RecurringBlockRequest {
                item_name: "Essay".to_string(),
                days: vec!["Monday".to_string()],
                start_time: "14:00".to_string(),
                end_time: "15:00".to_string(),
            },
            now(),
        )
        .expect("registration");
    assert_eq!(registration.item_name, "Essay");
}
