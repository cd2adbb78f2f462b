//! Allowed operating windows

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Geofence;

/// Errors parsing schedule fields
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid time '{0}', expected HH:mm")]
    InvalidTime(String),
}

/// Day on which a geofence permits presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowedDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for AllowedDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => AllowedDay::Monday,
            Weekday::Tue => AllowedDay::Tuesday,
            Weekday::Wed => AllowedDay::Wednesday,
            Weekday::Thu => AllowedDay::Thursday,
            Weekday::Fri => AllowedDay::Friday,
            Weekday::Sat => AllowedDay::Saturday,
            Weekday::Sun => AllowedDay::Sunday,
        }
    }
}

/// Parse an `HH:mm` clock time
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ScheduleError::InvalidTime(value.to_string()))
}

impl Geofence {
    /// Whether presence at the given local time is permitted.
    ///
    /// An empty day list allows every day. The window only applies when both
    /// ends are set; a start later than the end wraps past midnight.
    pub fn allows(&self, at: NaiveDateTime) -> bool {
        if !self.allowed_days.is_empty()
            && !self.allowed_days.contains(&AllowedDay::from(at.weekday()))
        {
            return false;
        }

        match (self.allowed_time_start, self.allowed_time_end) {
            (Some(start), Some(end)) => {
                // Windows are minute precision; the end minute is inclusive
                let t = at
                    .time()
                    .with_second(0)
                    .and_then(|t| t.with_nanosecond(0))
                    .unwrap_or(at.time());
                if start <= end {
                    t >= start && t <= end
                } else {
                    t >= start || t <= end
                }
            }
            _ => true,
        }
    }

    /// Whether this geofence restricts presence at all
    pub fn has_schedule(&self) -> bool {
        !self.allowed_days.is_empty()
            || (self.allowed_time_start.is_some() && self.allowed_time_end.is_some())
    }
}

/// Serde adapter for optional `HH:mm` times
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => super::parse_hhmm(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
