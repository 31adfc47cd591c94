use acra_core::store::{CalendarStore, Container, EntityKind};
use anyhow::Result;
use owo_colors::OwoColorize;

use super::AcraSync;
use crate::render::{Render, pluralize};

pub async fn run(sync: &AcraSync) -> Result<()> {
    let store = sync.store();
    let calendars = store.list_containers(EntityKind::Event).await?;
    let lists = store.list_containers(EntityKind::Reminder).await?;

    println!("{}", store.root().display().dimmed());

    if calendars.is_empty() && lists.is_empty() {
        println!("{}", "No calendars yet. Run `acra sync <file>` first.".dimmed());
        return Ok(());
    }

    let remembered = sync.remembered_identifier();
    let prefix = &sync.settings().title_prefix;

    for calendar in &calendars {
        let label = if remembered.as_deref() == Some(calendar.identifier.as_str()) {
            "synced".green().to_string()
        } else if calendar.title.starts_with(prefix.as_str()) {
            "leftover, removed on next sync".yellow().to_string()
        } else {
            String::new()
        };

        println!("{} {}", calendar.render(), label);
        println!("   {}", event_summary(sync, calendar).dimmed());
    }

    let reminders = store.reminders().await?;
    for list in &lists {
        let count = reminders
            .iter()
            .filter(|r| r.list.as_deref() == Some(list.identifier.as_str()) && !r.completed)
            .count();
        println!(
            "🔔 {} {}",
            list.title,
            format!("({} open {})", count, pluralize("reminder", count)).dimmed()
        );
    }

    Ok(())
}

fn event_summary(sync: &AcraSync, calendar: &Container) -> String {
    match sync.store().event_count(calendar) {
        Ok(count) => format!("{} {}", count, pluralize("event", count)),
        Err(e) => format!("could not count events: {}", e),
    }
}
