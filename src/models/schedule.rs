use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(value: DayOfWeek) -> Self {
        match value {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

/// Accepts full or three-letter English names in any case.
impl FromStr for DayOfWeek {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| {
                let name = day.as_str().to_lowercase();
                name == normalized || (normalized.len() == 3 && name.starts_with(&normalized))
            })
            .ok_or_else(|| AppError::validation(format!("unknown day of week: {value}")))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring weekly slot in which study blocks may be placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub day: DayOfWeek,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

impl AvailabilityWindow {
    pub fn new(day: DayOfWeek, start_time: &str, end_time: &str) -> Self {
        Self {
            day,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
        }
    }
}

/// A weekly class; only ever used to reject overlapping blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FixedCommitment {
    pub subject: String,
    pub day: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
}

impl FixedCommitment {
    pub fn new(subject: &str, day: DayOfWeek, start_time: &str, end_time: &str) -> Self {
        Self {
            subject: subject.to_string(),
            day,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
        }
    }
}

/// Moves a class to another day or time. `None` keeps the stored value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClassUpdate {
    #[serde(default)]
    pub new_day: Option<DayOfWeek>,
    #[serde(default)]
    pub new_start_time: Option<String>,
    #[serde(default)]
    pub new_end_time: Option<String>,
}

impl ClassUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_day.is_none() && self.new_start_time.is_none() && self.new_end_time.is_none()
    }
}
