use std::path::Path;

use acra_core::Meeting;
use anyhow::{Context, Result};

use super::{AcraSync, cancel_on_ctrl_c};
use crate::render::{Render, pluralize};
use crate::utils::tui;

pub async fn run(sync: &AcraSync, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let meetings = Meeting::list_from_json(&content)
        .with_context(|| format!("{} is not a list of meetings", file.display()))?;

    let cancel = cancel_on_ctrl_c();

    let spinner = tui::create_spinner(format!(
        "Syncing {} {}",
        meetings.len(),
        pluralize("meeting", meetings.len())
    ));
    let result = sync.sync_meetings(&meetings, &cancel).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            println!("{}", report.render());
            Ok(())
        }
        Err(e) => {
            println!("{}", e.render());
            Err(e).context("Sync did not complete")
        }
    }
}
