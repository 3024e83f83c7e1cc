use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use smart_schedule_lib::db::DbPool;
use smart_schedule_lib::models::plan::{PlanBlock, ReplanStatus};
use smart_schedule_lib::models::schedule::{
    AvailabilityWindow, ClassUpdate, DayOfWeek, FixedCommitment,
};
use smart_schedule_lib::models::user::{ItemUpdate, TaskRecord, TestRecord};
use smart_schedule_lib::AppState;
use tempfile::tempdir;

const USER: &str = "student-1";

fn setup() -> (tempfile::TempDir, AppState) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("planning.sqlite")).expect("db pool");
    (dir, AppState::new(pool))
}

fn manila(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .expect("offset")
        .with_ymd_and_hms(2025, 3, day, hour, minute, 0)
        .single()
        .expect("local time")
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).expect("date")
}

fn task(name: &str, task_type: &str, deadline: &str) -> TaskRecord {
    TaskRecord {
        name: name.to_string(),
        task_type: Some(task_type.to_string()),
        deadline: Some(deadline.to_string()),
        ..Default::default()
    }
}

fn weekday_evenings(state: &AppState) {
    let windows: Vec<_> = DayOfWeek::ALL[..5]
        .iter()
        .map(|day| AvailabilityWindow::new(*day, "18:00", "20:00"))
        .collect();
    state
        .user_data()
        .add_study_windows(USER, &windows)
        .expect("windows");
}

#[test]
fn full_replan_is_persisted_and_fetched() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-06"))
        .expect("task");
    weekday_evenings(&state);

    let outcome = state
        .planning()
        .run_planner(USER, manila(3, 10, 0))
        .expect("replan");

    assert_eq!(outcome.status, ReplanStatus::Regenerated);
    assert_eq!(outcome.message, "I've regenerated your study plan up to your deadlines.");
    let plan = outcome.plan.expect("plan");
    assert_eq!(plan.len(), 6);
    assert_eq!(plan[0].date, date(3));
    assert_eq!(plan[0].start_time, "18:00");
    assert_eq!(plan[0].end_time, "19:00");
    assert_eq!(plan[0].label, "Work on Essay");
    assert!(plan.iter().all(|block| block.date < date(6)));

    let fetched = state
        .planning()
        .fetch_plan(USER, manila(3, 10, 0))
        .expect("fetch");
    assert_eq!(fetched, plan);
}

#[test]
fn request_time_is_read_in_operating_zone() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-04"))
        .expect("task");
    weekday_evenings(&state);

    // 02:00 UTC is 10:00 in Manila on the same Monday.
    let utc_now = Utc
        .with_ymd_and_hms(2025, 3, 3, 2, 0, 0)
        .single()
        .expect("utc")
        .fixed_offset();
    let plan = state
        .planning()
        .run_planner(USER, utc_now)
        .expect("replan")
        .plan
        .expect("plan");

    assert_eq!(plan.len(), 2);
    assert!(plan.iter().all(|block| block.date == date(3)));
}

#[test]
fn nothing_to_schedule_keeps_the_stored_plan() {
    let (_dir, state) = setup();
    let existing = vec![PlanBlock::for_item(
        date(3),
        "18:00".into(),
        "19:00".into(),
        "Old Essay",
    )];
    state.user_data().save_plan(USER, &existing).expect("save");
    state
        .user_data()
        .add_task(USER, task("Done Already", "quiz", "2025-03-01"))
        .expect("task");

    let outcome = state
        .planning()
        .run_planner(USER, manila(3, 10, 0))
        .expect("replan");

    assert_eq!(outcome.status, ReplanStatus::NothingToSchedule);
    assert_eq!(
        outcome.message,
        "Planner ran, but you have no upcoming tasks or tests to plan for."
    );
    assert!(outcome.plan.is_none());
    assert_eq!(state.user_data().load_plan(USER).expect("load"), existing);
}

#[test]
fn fetch_drops_blocks_from_previous_days() {
    let (_dir, state) = setup();
    let plan = vec![
        PlanBlock::for_item(date(1), "18:00".into(), "19:00".into(), "Essay"),
        PlanBlock::for_item(date(3), "08:00".into(), "09:00".into(), "Essay"),
        PlanBlock::for_item(date(4), "18:00".into(), "19:00".into(), "Essay"),
    ];
    state.user_data().save_plan(USER, &plan).expect("save");

    let fetched = state
        .planning()
        .fetch_plan(USER, manila(3, 22, 0))
        .expect("fetch");

    assert_eq!(fetched, plan[1..].to_vec());
    assert_eq!(state.user_data().load_plan(USER).expect("load"), fetched);
}

#[test]
fn blocks_avoid_classes_end_to_end() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-04"))
        .expect("task");
    state
        .user_data()
        .add_class(USER, FixedCommitment::new("Math", DayOfWeek::Monday, "18:00", "19:00"))
        .expect("class");
    weekday_evenings(&state);

    let plan = state
        .planning()
        .run_planner(USER, manila(3, 10, 0))
        .expect("replan")
        .plan
        .expect("plan");

    let slots: Vec<_> = plan
        .iter()
        .map(|block| (block.date, block.start_time.as_str()))
        .collect();
    assert_eq!(slots, vec![(date(3), "19:00")]);
}

#[test]
fn daily_summary_lists_todays_blocks() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-06"))
        .expect("task");
    weekday_evenings(&state);
    state
        .planning()
        .run_planner(USER, manila(3, 10, 0))
        .expect("replan");

    let summary = state
        .planning()
        .daily_plan_summary(USER, manila(3, 12, 0))
        .expect("summary");
    assert_eq!(
        summary,
        "Your plan for today: Work on Essay from 6:00 PM to 7:00 PM, Work on Essay from 7:00 PM to 8:00 PM."
    );

    let weekend = state
        .planning()
        .daily_plan_summary(USER, manila(8, 12, 0))
        .expect("summary");
    assert_eq!(weekend, "You have no study blocks for today.");
}

#[test]
fn priority_list_respects_available_hours() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-06"))
        .expect("task");
    state
        .user_data()
        .add_test(
            USER,
            TestRecord {
                name: "Midterm".to_string(),
                test_type: Some("exam".to_string()),
                date: Some("2025-03-07".to_string()),
                ..Default::default()
            },
        )
        .expect("test");

    let list = state
        .planning()
        .priority_list(USER, 2.0, manila(3, 10, 0))
        .expect("priority list");

    assert_eq!(list.top_item.as_deref(), Some("Midterm"));
    let names: Vec<_> = list.suggestions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Essay"]);
    assert!(list
        .to_message()
        .contains("1. Work on **Essay** (est. 1 hour)"));

    assert!(state
        .planning()
        .priority_list(USER, f64::NAN, manila(3, 10, 0))
        .is_err());
}

#[test]
fn deleting_an_item_clears_its_blocks() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-06"))
        .expect("task");
    state
        .user_data()
        .add_task(
            USER,
            TaskRecord {
                duration_hours: Some(1.0),
                ..task("Lab", "quiz", "2025-03-06")
            },
        )
        .expect("task");
    weekday_evenings(&state);
    let plan = state
        .planning()
        .run_planner(USER, manila(3, 10, 0))
        .expect("replan")
        .plan
        .expect("plan");
    assert!(plan[0].is_for_item("Lab"));

    assert!(state.user_data().delete_item(USER, "Lab").expect("delete"));

    let plan = state.user_data().load_plan(USER).expect("load");
    assert!(!plan.is_empty());
    assert!(plan.iter().all(|block| block.is_for_item("Essay")));
}

#[test]
fn active_context_uses_configured_window() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-20"))
        .expect("task");
    state
        .user_data()
        .add_task(USER, task("Capstone", "project", "2025-05-20"))
        .expect("task");

    let context = state
        .planning()
        .active_context(USER, manila(3, 10, 0))
        .expect("context");
    let names: Vec<_> = context.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Essay"]);

    let mut config = state.settings().get().expect("settings");
    config.active_context_days = 90;
    state.settings().update(config).expect("update");

    let widened = state
        .planning()
        .active_context(USER, manila(3, 10, 0))
        .expect("context");
    assert_eq!(widened.tasks.len(), 2);
}

#[test]
fn item_and_class_edits_change_the_next_replan() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-06"))
        .expect("task");
    state
        .user_data()
        .add_class(USER, FixedCommitment::new("Math", DayOfWeek::Monday, "18:00", "19:00"))
        .expect("class");
    weekday_evenings(&state);

    state
        .user_data()
        .update_item(
            USER,
            "Essay",
            &ItemUpdate {
                new_duration_hours: Some(1.0),
                ..Default::default()
            },
        )
        .expect("update item");
    state
        .user_data()
        .update_class(
            USER,
            "Math",
            &ClassUpdate {
                new_day: Some(DayOfWeek::Tuesday),
                ..Default::default()
            },
        )
        .expect("update class");

    let plan = state
        .planning()
        .run_planner(USER, manila(3, 10, 0))
        .expect("replan")
        .plan
        .expect("plan");

    let slots: Vec<_> = plan
        .iter()
        .map(|block| (block.date, block.start_time.as_str()))
        .collect();
    assert_eq!(slots, vec![(date(3), "18:00")]);
}

#[test]
fn fetch_removes_items_past_their_deadline() {
    let (_dir, state) = setup();
    state
        .user_data()
        .add_task(USER, task("Old Essay", "assignment", "2025-03-01"))
        .expect("task");
    state
        .user_data()
        .add_task(USER, task("Essay", "assignment", "2025-03-06"))
        .expect("task");
    state
        .user_data()
        .add_test(
            USER,
            TestRecord {
                name: "Pop Quiz".to_string(),
                date: Some("2025-03-02".to_string()),
                ..Default::default()
            },
        )
        .expect("test");

    state
        .planning()
        .fetch_plan(USER, manila(3, 10, 0))
        .expect("fetch");

    let snapshot = state.user_data().snapshot(USER).expect("snapshot");
    let names: Vec<_> = snapshot.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Essay"]);
    assert!(snapshot.tests.is_empty());
}
