use serde::{Deserialize, Serialize};

use crate::models::plan::PlanBlock;
use crate::models::schedule::{AvailabilityWindow, FixedCommitment};
use crate::models::work_item::RecordKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub name: String,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub name: String,
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// Field edits for an existing task or test. `None` leaves the stored value alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    #[serde(default)]
    pub new_name: Option<String>,
    /// Written to `task_type` or `test_type` depending on the record.
    #[serde(default)]
    pub new_type: Option<String>,
    #[serde(default)]
    pub new_deadline: Option<String>,
    #[serde(default)]
    pub new_priority: Option<String>,
    /// Tasks only.
    #[serde(default)]
    pub new_duration_hours: Option<f64>,
}

impl ItemUpdate {
    pub fn rename(new_name: &str) -> Self {
        Self {
            new_name: Some(new_name.to_string()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_name.is_none()
            && self.new_type.is_none()
            && self.new_deadline.is_none()
            && self.new_priority.is_none()
            && self.new_duration_hours.is_none()
    }
}

/// Borrowed view shared by tasks and tests while building the work queue.
#[derive(Debug, Clone, Copy)]
pub struct RawWorkRecord<'a> {
    pub kind: RecordKind,
    pub name: &'a str,
    pub type_label: Option<&'a str>,
    pub deadline: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub duration_hours: Option<f64>,
}

impl TaskRecord {
    pub fn as_raw(&self) -> RawWorkRecord<'_> {
        RawWorkRecord {
            kind: RecordKind::Task,
            name: &self.name,
            type_label: self.task_type.as_deref(),
            deadline: self.deadline.as_deref(),
            priority: self.priority.as_deref(),
            duration_hours: self.duration_hours,
        }
    }
}

impl TestRecord {
    pub fn as_raw(&self) -> RawWorkRecord<'_> {
        RawWorkRecord {
            kind: RecordKind::Test,
            name: &self.name,
            type_label: self.test_type.as_deref(),
            deadline: self.deadline.as_deref().or(self.date.as_deref()),
            priority: self.priority.as_deref(),
            duration_hours: None,
        }
    }
}

/// Everything the planner reads about one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub tests: Vec<TestRecord>,
    #[serde(default)]
    pub schedule: Vec<FixedCommitment>,
    #[serde(default)]
    pub study_windows: Vec<AvailabilityWindow>,
    #[serde(default)]
    pub generated_plan: Vec<PlanBlock>,
}

impl UserSnapshot {
    pub fn raw_records(&self) -> impl Iterator<Item = RawWorkRecord<'_>> {
        self.tasks
            .iter()
            .map(TaskRecord::as_raw)
            .chain(self.tests.iter().map(TestRecord::as_raw))
    }
}
