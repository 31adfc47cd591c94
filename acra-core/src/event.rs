//! Store-neutral event and reminder types.
//!
//! These are what the engine hands to a `CalendarStore`. Stores convert them
//! into their own representation (ics files, in-memory records, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar event ready to be written into a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
}

impl Frequency {
    pub fn as_rrule_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "WEEKLY",
        }
    }
}

/// A recurrence rule with an explicit end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub interval: u32,
    pub until: DateTime<Utc>,
}

impl Recurrence {
    pub fn weekly_until(until: DateTime<Utc>) -> Self {
        Recurrence {
            frequency: Frequency::Weekly,
            interval: 1,
            until,
        }
    }

    /// RRULE value, e.g. `FREQ=WEEKLY;INTERVAL=1;UNTIL=20250601T000000Z`
    pub fn to_rrule(&self) -> String {
        format!(
            "FREQ={};INTERVAL={};UNTIL={}",
            self.frequency.as_rrule_str(),
            self.interval,
            self.until.format("%Y%m%dT%H%M%SZ")
        )
    }
}

/// A to-do style reminder with absolute alarms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub identifier: String,
    pub title: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub alarms: Vec<DateTime<Utc>>,
    /// Identifier of the reminder list holding this reminder.
    pub list: Option<String>,
}

impl Reminder {
    pub fn new(title: &str) -> Self {
        Reminder {
            identifier: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            notes: None,
            completed: false,
            alarms: Vec::new(),
            list: None,
        }
    }
}

impl fmt::Display for NewEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
