use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use smart_schedule_lib::db::DbPool;
use smart_schedule_lib::models::plan::{PlanBlock, RecurringBlockRequest};
use smart_schedule_lib::models::schedule::{AvailabilityWindow, DayOfWeek, FixedCommitment};
use smart_schedule_lib::models::user::{TaskRecord, TestRecord};
use smart_schedule_lib::AppState;
use tempfile::tempdir;

const USER: &str = "student-1";

fn now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .expect("offset")
        .with_ymd_and_hms(2025, 3, 3, 10, 0, 0)
        .single()
        .expect("local time")
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).expect("date")
}

fn request(item: &str, days: &[&str], start: &str, end: &str) -> RecurringBlockRequest {
    RecurringBlockRequest {
        item_name: item.to_string(),
        days: days.iter().map(|day| day.to_string()).collect(),
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

fn blocks_for<'a>(plan: &'a [PlanBlock], item: &str) -> Vec<&'a PlanBlock> {
    plan.iter().filter(|block| block.is_for_item(item)).collect()
}

/// Essay due the 22nd, a Midterm on the 10th, Math every Monday afternoon and an
/// already generated evening plan.
fn seeded_state() -> (tempfile::TempDir, AppState) {
    let dir = tempdir().expect("temp dir");
    let state = AppState::new(DbPool::new(dir.path().join("recurring.sqlite")).expect("db pool"));
    let users = state.user_data();

    users
        .add_task(
            USER,
            TaskRecord {
                name: "Essay".to_string(),
                task_type: Some("assignment".to_string()),
                deadline: Some("2025-03-22".to_string()),
                ..Default::default()
            },
        )
        .expect("task");
    users
        .add_test(
            USER,
            TestRecord {
                name: "Midterm".to_string(),
                test_type: Some("exam".to_string()),
                date: Some("2025-03-10".to_string()),
                ..Default::default()
            },
        )
        .expect("test");
    users
        .add_class(USER, FixedCommitment::new("Math", DayOfWeek::Monday, "14:00", "15:00"))
        .expect("class");
    let windows: Vec<_> = DayOfWeek::ALL[..5]
        .iter()
        .map(|day| AvailabilityWindow::new(*day, "18:00", "20:00"))
        .collect();
    users.add_study_windows(USER, &windows).expect("windows");

    state.planning().run_planner(USER, now()).expect("replan");
    (dir, state)
}

#[test]
fn registration_replaces_only_the_target_item() {
    let (_dir, state) = seeded_state();
    let before = state.user_data().load_plan(USER).expect("load");
    assert!(!blocks_for(&before, "Essay").is_empty());

    let registration = state
        .planning()
        .schedule_recurring_blocks(
            USER,
            &request("essay", &["Monday", "Wednesday"], "14:00", "15:00"),
            now(),
        )
        .expect("register");

    assert_eq!(registration.item_name, "Essay");
    let dates: Vec<_> = registration.blocks.iter().map(|block| block.date).collect();
    assert_eq!(dates, vec![date(5), date(12), date(19)]);
    assert_eq!(registration.notes.len(), 3);
    assert!(registration
        .notes
        .iter()
        .all(|note| note.contains("conflicts with your Math class")));

    let after = state.user_data().load_plan(USER).expect("load");
    let essay: Vec<_> = blocks_for(&after, "Essay").into_iter().cloned().collect();
    assert_eq!(essay, registration.blocks);
    assert_eq!(blocks_for(&after, "Midterm"), blocks_for(&before, "Midterm"));

    let mut sorted = after.clone();
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.start_time.cmp(&b.start_time)));
    assert_eq!(after, sorted);
}

#[test]
fn repeating_a_registration_changes_nothing() {
    let (_dir, state) = seeded_state();
    let essay_request = request("Essay", &["Wed", "fri"], "07:00", "08:00");

    state
        .planning()
        .schedule_recurring_blocks(USER, &essay_request, now())
        .expect("first");
    let first = state.user_data().load_plan(USER).expect("load");

    state
        .planning()
        .schedule_recurring_blocks(USER, &essay_request, now())
        .expect("second");
    let second = state.user_data().load_plan(USER).expect("load");

    assert_eq!(first, second);
}

#[test]
fn seatwork_sessions_are_capped() {
    let (_dir, state) = seeded_state();
    state
        .user_data()
        .add_task(
            USER,
            TaskRecord {
                name: "Worksheet".to_string(),
                task_type: Some("seatwork".to_string()),
                deadline: Some("2025-03-14".to_string()),
                ..Default::default()
            },
        )
        .expect("task");

    let registration = state
        .planning()
        .schedule_recurring_blocks(USER, &request("Worksheet", &["Friday"], "13:00", "15:00"), now())
        .expect("register");

    assert_eq!(registration.blocks.len(), 1);
    let block = &registration.blocks[0];
    assert_eq!(block.date, date(7));
    assert_eq!((block.start_time.as_str(), block.end_time.as_str()), ("13:00", "13:30"));
    assert!(!block.completed);
    assert_eq!(registration.notes.len(), 1);
    assert!(registration.notes[0].contains("capped at 0.5 hours"));
}
