//! Colored terminal rendering for acra-core types.

use acra_core::SyncReport;
use acra_core::error::SyncError;
use acra_core::event::Reminder;
use acra_core::store::Container;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Container {
    fn render(&self) -> String {
        let color = self
            .color
            .as_ref()
            .map(|c| format!(" {}", c.to_string().dimmed()))
            .unwrap_or_default();

        format!("📅 {}{} {}", self.title, color, self.source.title.dimmed())
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "{} {} {} to {}",
            "✓".green(),
            self.written,
            pluralize("event", self.written),
            self.container.title.bold()
        )];

        if self.orphans_removed > 0 {
            lines.push(
                format!(
                    "   removed {} leftover {}",
                    self.orphans_removed,
                    pluralize("calendar", self.orphans_removed)
                )
                .dimmed()
                .to_string(),
            );
        }

        lines.join("\n")
    }
}

impl Render for Reminder {
    fn render(&self) -> String {
        let next = self
            .alarms
            .iter()
            .max()
            .map(|at| at.with_timezone(&chrono::Local).format("%a %d %b %H:%M").to_string())
            .unwrap_or_default();

        format!("🔔 {} {}", self.title, next.dimmed())
    }
}

impl Render for SyncError {
    fn render(&self) -> String {
        match self {
            SyncError::Cancelled => self.to_string().yellow().to_string(),
            _ => self.to_string().red().to_string(),
        }
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
