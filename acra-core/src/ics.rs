//! ICS file generation for events written by the directory store.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::event::NewEvent;

/// Generate .ics content for an event
///
/// All-day dates are taken from the instants as seen in `tz`.
pub fn generate_ics(uid: &str, event: &NewEvent, tz: Tz) -> String {
    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(uid);
    ics_event.summary(&event.title);
    ics_event.add_property("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());

    if event.all_day {
        // The event end is the last day covered; DTEND is the day after it.
        let start = event.start.with_timezone(&tz).date_naive();
        let end = event.end.with_timezone(&tz).date_naive() + Duration::days(1);
        add_date_property(&mut ics_event, "DTSTART", start);
        add_date_property(&mut ics_event, "DTEND", end);
    } else {
        add_utc_property(&mut ics_event, "DTSTART", &event.start);
        add_utc_property(&mut ics_event, "DTEND", &event.end);
    }

    if let Some(ref recurrence) = event.recurrence {
        ics_event.add_property("RRULE", recurrence.to_rrule());
    }

    if let Some(ref notes) = event.notes {
        ics_event.description(notes);
    }

    let ics_event = ics_event.done();
    cal.push(ics_event);
    let cal = cal.done();

    strip_ics_bloat(&cal.to_string())
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with ACRA
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:ACRA\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

fn add_date_property(ics_event: &mut icalendar::Event, name: &str, date: NaiveDate) {
    let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    ics_event.append_property(prop);
}

fn add_utc_property(ics_event: &mut icalendar::Event, name: &str, time: &DateTime<Utc>) {
    ics_event.add_property(name, time.format("%Y%m%dT%H%M%SZ").to_string());
}
