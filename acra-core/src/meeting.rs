//! Meetings as delivered by the ACRA service.
//!
//! A meeting is read-only input to the engine. Timestamps are naive wall-clock
//! values; the engine resolves them against the configured time zone.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scheduled item from the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub title: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    #[serde(default)]
    pub all_day_event: bool,
    #[serde(default)]
    pub is_recurrent: bool,
    #[serde(default)]
    pub is_holiday: bool,
    /// Meeting category, copied verbatim into the event notes.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Meeting {
    pub fn new(title: &str, start_date: NaiveDateTime, end_date: NaiveDateTime) -> Self {
        Meeting {
            title: title.to_string(),
            start_date,
            end_date,
            all_day_event: false,
            is_recurrent: false,
            is_holiday: false,
            kind: String::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_date - self.start_date
    }

    /// Fractional number of days covered by this meeting.
    pub fn total_days(&self) -> f64 {
        self.duration().num_seconds() as f64 / 86_400.0
    }

    /// Whether this meeting becomes a weekly series rather than a single occurrence.
    pub fn is_weekly_series(&self) -> bool {
        self.is_recurrent && self.all_day_event
    }

    /// Parse a JSON array of meetings, the shape the ACRA service returns.
    pub fn list_from_json(content: &str) -> Result<Vec<Meeting>, serde_json::Error> {
        serde_json::from_str(content)
    }
}

impl fmt::Display for Meeting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
