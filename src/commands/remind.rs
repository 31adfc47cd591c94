use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};

use super::AcraSync;
use crate::render::Render;

pub async fn run(sync: &AcraSync, title: &str, at: &str, notes: &str) -> Result<()> {
    let when = parse_when(at, Utc::now())?;

    let reminder = sync
        .add_reminder(title, notes, when)
        .await
        .context("Could not save the reminder")?;

    println!("{}", reminder.render());
    Ok(())
}

/// Parse an alarm time. Tries a delay from `now` first (humantime), then a
/// date/time in local time (fuzzydate).
fn parse_when(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let delay = input.strip_prefix("in ").unwrap_or(input);

    if let Ok(std_dur) = humantime::parse_duration(delay) {
        let dur = Duration::from_std(std_dur).context("Duration too large")?;
        return Ok(now + dur);
    }

    let expanded = expand_abbreviations(input);
    let naive = fuzzydate::parse(&expanded)
        .map_err(|_| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))?;

    local_to_utc(naive).with_context(|| format!("\"{}\" does not exist in local time", input))
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Expand common abbreviations that fuzzydate doesn't handle.
fn expand_abbreviations(input: &str) -> String {
    let abbrevs = [
        ("mon", "monday"),
        ("tue", "tuesday"),
        ("tues", "tuesday"),
        ("wed", "wednesday"),
        ("thu", "thursday"),
        ("thurs", "thursday"),
        ("fri", "friday"),
        ("sat", "saturday"),
        ("sun", "sunday"),
        ("tmrw", "tomorrow"),
        ("tmr", "tomorrow"),
    ];

    input
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            abbrevs
                .iter()
                .find(|(abbr, _)| *abbr == word)
                .map(|(_, full)| *full)
                .unwrap_or(word)
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}
