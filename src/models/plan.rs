use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const LABEL_PREFIX: &str = "Work on ";

/// One scheduled study session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanBlock {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(alias = "task")]
    pub label: String,
    #[serde(default)]
    pub completed: bool,
}

impl PlanBlock {
    pub fn for_item(date: NaiveDate, start_time: String, end_time: String, item_name: &str) -> Self {
        Self {
            date,
            start_time,
            end_time,
            label: label_for(item_name),
            completed: false,
        }
    }

    pub fn is_for_item(&self, item_name: &str) -> bool {
        self.label.to_lowercase() == label_for(item_name).to_lowercase()
    }
}

pub fn label_for(item_name: &str) -> String {
    format!("{LABEL_PREFIX}{item_name}")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReplanStatus {
    Regenerated,
    NothingToSchedule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplanOutcome {
    pub status: ReplanStatus,
    pub message: String,
    /// `None` when nothing was scheduled; the stored plan must be left alone.
    #[serde(default)]
    pub plan: Option<Vec<PlanBlock>>,
}

impl ReplanOutcome {
    pub fn nothing_to_schedule() -> Self {
        Self {
            status: ReplanStatus::NothingToSchedule,
            message: "Planner ran, but you have no upcoming tasks or tests to plan for."
                .to_string(),
            plan: None,
        }
    }

    pub fn regenerated(plan: Vec<PlanBlock>) -> Self {
        Self {
            status: ReplanStatus::Regenerated,
            message: "I've regenerated your study plan up to your deadlines.".to_string(),
            plan: Some(plan),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringBlockRequest {
    pub item_name: String,
    pub days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRegistration {
    pub item_name: String,
    pub blocks: Vec<PlanBlock>,
    #[serde(default)]
    pub notes: Vec<String>,
}
