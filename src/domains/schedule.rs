use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Serde adapter for the `YYYY-MM-DD HH:MM:SS` timestamps used in the backing
/// file. Second precision, no offset.
pub mod schedule_time_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::FormatItem;
    use time::macros::format_description;
    use time::PrimitiveDateTime;

    pub const FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    pub fn serialize<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rendered = value.format(&FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&rendered)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        PrimitiveDateTime::parse(&raw, &FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A user's target date/time record. One per user id; replaced wholesale by a
/// new `set` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub user_id: i64,
    pub username: String,
    #[serde(with = "schedule_time_format")]
    pub schedule_time: PrimitiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Reminder>,
}

impl Schedule {
    pub fn reminder_active(&self) -> bool {
        self.reminder.as_ref().map(|r| r.active).unwrap_or(false)
    }
}

/// Recurring-notification configuration attached to a Schedule. The user and
/// schedule fields are copies taken when the reminder was last configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default)]
    pub active: bool,
    pub interval_minutes: u64,
    pub user_id: i64,
    pub username: String,
    #[serde(with = "schedule_time_format")]
    pub schedule_time: PrimitiveDateTime,
}

/// Current wall-clock time at second precision, without offset.
pub fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Target time for a days/hours offset from now. `None` when the offset does
/// not fit the supported datetime range.
pub fn target_from_now(days: i64, hours: i64) -> Option<PrimitiveDateTime> {
    let seconds = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?;
    now().checked_add(Duration::seconds(seconds))
}

pub fn render(value: PrimitiveDateTime) -> String {
    value
        .format(&schedule_time_format::FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

/// Whole days, hours and minutes until a target time, truncated to the
/// minute. Past deadlines floor into negative day counts while hours stay in
/// 0..24 and minutes in 0..60, matching the euclidean remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl TimeLeft {
    pub fn until(target: PrimitiveDateTime, now: PrimitiveDateTime) -> Self {
        let total_seconds = (target - now).whole_seconds();
        let days = total_seconds.div_euclid(86_400);
        let remainder = total_seconds.rem_euclid(86_400);
        Self {
            days,
            hours: remainder / 3_600,
            minutes: remainder % 3_600 / 60,
        }
    }
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days {} hours {} minutes",
            self.days, self.hours, self.minutes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn time_left_truncates_to_minutes() {
        let now = datetime!(2030-01-01 00:00:00);
        let target = datetime!(2030-01-03 03:30:45);
        let left = TimeLeft::until(target, now);
        assert_eq!(
            left,
            TimeLeft {
                days: 2,
                hours: 3,
                minutes: 30
            }
        );
        assert_eq!(left.to_string(), "2 days 3 hours 30 minutes");
    }

    #[test]
    fn elapsed_deadline_goes_negative_on_days_only() {
        let now = datetime!(2030-01-02 00:00:00);
        let target = datetime!(2030-01-01 23:00:00);
        let left = TimeLeft::until(target, now);
        assert_eq!(
            left,
            TimeLeft {
                days: -1,
                hours: 23,
                minutes: 0
            }
        );
    }

    #[test]
    fn target_from_now_rejects_out_of_range_offsets() {
        assert!(target_from_now(0, 0).is_some());
        assert!(target_from_now(2, 3).is_some());
        assert!(target_from_now(99_999_999_999, 0).is_none());
        assert!(target_from_now(i64::MAX, i64::MAX).is_none());
    }

    #[test]
    fn schedule_round_trips_through_backing_format() {
        let schedule = Schedule {
            user_id: 42,
            username: "ada".to_string(),
            schedule_time: datetime!(2031-06-15 09:30:00),
            reminder: None,
        };
        let rendered = serde_json::to_string(&schedule).unwrap();
        assert!(rendered.contains("2031-06-15 09:30:00"));
        let parsed: Schedule = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.schedule_time, schedule.schedule_time);
    }

    #[test]
    fn reminder_active_defaults_to_false() {
        let raw = r#"{
            "interval_minutes": 5,
            "user_id": 42,
            "username": "ada",
            "schedule_time": "2031-06-15 09:30:00"
        }"#;
        let reminder: Reminder = serde_json::from_str(raw).unwrap();
        assert!(!reminder.active);
    }
}
