//! Mapping from ACRA meetings to calendar events.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::SyncSettings;
use crate::event::{NewEvent, Recurrence};
use crate::meeting::Meeting;

/// Build the event a meeting should become in the app calendar.
pub fn to_event(meeting: &Meeting, settings: &SyncSettings) -> NewEvent {
    let tz = settings.timezone;

    // An all-day event ending at midnight would cover one extra day in the
    // store, while meetings count their end day inclusively.
    let end = if meeting.all_day_event {
        meeting.end_date - Duration::days(1)
    } else {
        meeting.end_date
    };

    let recurrence = meeting
        .is_weekly_series()
        .then(|| Recurrence::weekly_until(to_store_time(meeting.end_date, tz)));

    NewEvent {
        title: event_title(meeting, &settings.holiday_marker),
        start: to_store_time(meeting.start_date, tz),
        end: to_store_time(end, tz),
        all_day: meeting.all_day_event,
        recurrence,
        notes: Some(meeting.kind.clone()),
    }
}

/// Title shown in the calendar.
///
/// Holidays get the marker; non-recurrent meetings longer than a day are
/// prefixed with their inclusive day count.
pub fn event_title(meeting: &Meeting, holiday_marker: &str) -> String {
    if meeting.is_holiday {
        return format!("{} {}", holiday_marker, meeting.title);
    }

    let days = meeting.total_days();
    if days > 1.0 && !meeting.is_recurrent {
        format!("{} {}", days.floor() as i64 + 1, meeting.title)
    } else {
        meeting.title.clone()
    }
}

/// Resolve a wall-clock time in `tz` to an absolute instant.
///
/// Ambiguous times take the earlier instant; times skipped by a DST jump are
/// read as UTC.
pub fn to_store_time(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
