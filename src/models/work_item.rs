use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Exam,
    Project,
    Quiz,
    Assignment,
    Seatwork,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Exam => "exam",
            ItemType::Project => "project",
            ItemType::Quiz => "quiz",
            ItemType::Assignment => "assignment",
            ItemType::Seatwork => "seatwork",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "exam" => Some(ItemType::Exam),
            "project" => Some(ItemType::Project),
            "quiz" => Some(ItemType::Quiz),
            "assignment" => Some(ItemType::Assignment),
            "seatwork" => Some(ItemType::Seatwork),
            _ => None,
        }
    }
}

/// Hours of study an item asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "hours")]
pub enum Demand {
    Bounded(f64),
    /// Keep allocating until the deadline is reached.
    Unbounded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Task,
    Test,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub name: String,
    pub deadline: DateTime<FixedOffset>,
    pub priority_score: i32,
    #[serde(default)]
    pub item_type: Option<ItemType>,
    pub blocks_needed: Demand,
    #[serde(default)]
    pub blocks_allocated: f64,
    pub source: RecordKind,
}

impl WorkItem {
    pub fn is_complete(&self) -> bool {
        match self.blocks_needed {
            Demand::Bounded(needed) => self.blocks_allocated >= needed,
            Demand::Unbounded => false,
        }
    }

    /// Unmet hours, or `None` when the demand is unbounded.
    pub fn remaining_hours(&self) -> Option<f64> {
        match self.blocks_needed {
            Demand::Bounded(needed) => Some((needed - self.blocks_allocated).max(0.0)),
            Demand::Unbounded => None,
        }
    }

    pub fn record_allocation(&mut self, hours: f64) {
        self.blocks_allocated += hours;
    }

    pub fn type_label(&self) -> &'static str {
        self.item_type.map(ItemType::as_str).unwrap_or("default")
    }
}
