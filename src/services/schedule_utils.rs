use chrono::{
    offset::LocalResult, DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use serde_json::json;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::settings::PlannerConfig;

const CLOCK_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];
const NAIVE_DEADLINE_FORMATS: [&str; 3] =
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const END_OF_DAY_SUFFIX: &str = "T23:59:59";

/// Minutes since midnight for an `HH:MM` string. Malformed input yields 0.
pub fn time_to_minutes(value: &str) -> i64 {
    match parse_clock(value) {
        Ok(time) => minutes_from_midnight(time),
        Err(_) => {
            warn!(target: "app::planner", value, "unparseable clock time treated as 00:00");
            0
        }
    }
}

/// Strict counterpart of [`time_to_minutes`] for caller-supplied times.
pub fn parse_clock(value: &str) -> AppResult<NaiveTime> {
    let trimmed = value.trim();
    CLOCK_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| {
            AppError::validation_with_details("invalid clock time", json!({ "value": value }))
        })
}

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

pub fn minutes_to_clock(total_minutes: i64) -> String {
    let total = total_minutes.max(0);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Half-open overlap: touching endpoints do not overlap.
pub fn intervals_overlap(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && b_start < a_end
}

/// "18:05" -> "6:05 PM". Anything unparseable is echoed back.
pub fn format_time_12hr(value: &str) -> String {
    match parse_clock(value) {
        Ok(time) => time.format("%-I:%M %p").to_string(),
        Err(_) => value.to_string(),
    }
}

/// Whole hours print without a fraction ("3"), others keep it ("0.5").
pub fn format_hours(hours: f64) -> String {
    format!("{}", hours)
}

/// Resolves a deadline string to an instant in the operating zone.
///
/// Date-only values mean the end of that day; values without a zone are local to
/// `zone` on that date; zoned values are converted.
pub fn parse_deadline(raw: &str, zone: &OperatingZone) -> AppResult<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("deadline is empty"));
    }

    let normalized = if trimmed.contains('T') {
        trimmed.to_string()
    } else {
        format!("{trimmed}{END_OF_DAY_SUFFIX}")
    };

    if let Ok(zoned) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(zone.convert(zoned));
    }

    NAIVE_DEADLINE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .map(|naive| zone.localize(naive))
        .ok_or_else(|| {
            AppError::validation_with_details("invalid deadline format", json!({ "value": raw }))
        })
}

/// The instant `minutes` after local midnight of `date`.
pub fn at_minutes(date: NaiveDate, minutes: i64, zone: &OperatingZone) -> DateTime<FixedOffset> {
    zone.localize(date.and_time(NaiveTime::MIN) + Duration::minutes(minutes))
}

/// `now` moved forward by whole days. Out-of-range spans are a validation error.
pub fn days_after(now: DateTime<FixedOffset>, days: i64) -> AppResult<DateTime<FixedOffset>> {
    Duration::try_days(days)
        .and_then(|span| now.checked_add_signed(span))
        .ok_or_else(|| {
            AppError::validation_with_details("day count is out of range", json!({ "days": days }))
        })
}

/// Minute offset of the next full hour at or after `now`; may be 1440.
pub fn ceil_to_hour_minutes(now: DateTime<FixedOffset>) -> i64 {
    let time = now.time();
    let on_the_hour = time.minute() == 0 && time.second() == 0 && time.nanosecond() == 0;
    if on_the_hour {
        minutes_from_midnight(time)
    } else {
        (time.hour() as i64 + 1) * 60
    }
}

/// Splits `[start, end)` around the busy intervals, keeping the free pieces in order.
pub fn free_segments(start: i64, end: i64, busy: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut sorted: Vec<(i64, i64)> = busy
        .iter()
        .copied()
        .filter(|(busy_start, busy_end)| busy_start < busy_end)
        .collect();
    sorted.sort_unstable();

    let mut segments = Vec::new();
    let mut cursor = start;
    for (busy_start, busy_end) in sorted {
        if cursor >= end {
            break;
        }
        if !intervals_overlap(cursor, end, busy_start, busy_end) {
            continue;
        }
        if busy_start > cursor {
            segments.push((cursor, busy_start));
        }
        cursor = cursor.max(busy_end);
    }

    if cursor < end {
        segments.push((cursor, end));
    }
    segments
}

/// Zone that naive deadlines and plan clock times are read in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatingZone {
    Fixed(FixedOffset),
    /// Offsets follow the zone's rules on each date, so DST transitions are honoured.
    Named(Tz),
}

impl OperatingZone {
    /// Accepts `+08:00`, `-0530`, `UTC+8` style offsets or an IANA zone name.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if let Some(offset) = parse_fixed_offset(trimmed) {
            return Ok(Self::Fixed(offset));
        }
        trimmed.parse::<Tz>().map(Self::Named).map_err(|err| {
            AppError::validation_with_details(
                "unknown timezone",
                json!({ "timezone": raw, "error": format!("{err}") }),
            )
        })
    }

    /// The configured zone, or `now`'s own offset when the stored name is unusable.
    pub fn for_config(config: &PlannerConfig, now: DateTime<FixedOffset>) -> Self {
        Self::parse(&config.timezone).unwrap_or_else(|_| {
            warn!(
                target: "app::planner",
                timezone = %config.timezone,
                "unusable operating zone, falling back to the request offset"
            );
            Self::Fixed(*now.offset())
        })
    }

    pub fn convert<T: TimeZone>(&self, instant: DateTime<T>) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => instant.with_timezone(offset),
            Self::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }

    pub fn date_of(&self, instant: DateTime<FixedOffset>) -> NaiveDate {
        self.convert(instant).date_naive()
    }

    /// Local wall time to an instant. Repeated times take the earlier instant; times
    /// skipped by a DST gap are read with the offset in force before the gap.
    pub fn localize(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => localize_fixed(naive, *offset),
            Self::Named(tz) => match tz.from_local_datetime(&naive) {
                LocalResult::Single(dt) => dt.fixed_offset(),
                LocalResult::Ambiguous(first, _) => first.fixed_offset(),
                LocalResult::None => {
                    let before = tz
                        .offset_from_utc_datetime(&(naive - Duration::days(1)))
                        .fix();
                    localize_fixed(naive, before)
                }
            },
        }
    }
}

impl From<FixedOffset> for OperatingZone {
    fn from(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }
}

fn parse_fixed_offset(raw: &str) -> Option<FixedOffset> {
    let body = raw
        .strip_prefix("UTC")
        .or_else(|| raw.strip_prefix("GMT"))
        .unwrap_or(raw);
    if body.is_empty() && body.len() != raw.len() {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match body.as_bytes().first()? {
        b'+' => (1, &body[1..]),
        b'-' => (-1, &body[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn localize_fixed(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    match offset.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _) => first,
        LocalResult::None => DateTime::from_naive_utc_and_offset(
            naive - Duration::seconds(offset.local_minus_utc() as i64),
            offset,
        ),
    }
}
