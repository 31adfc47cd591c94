use acra_core::CancelToken;
use anyhow::{Context, Result};
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use super::AcraSync;

pub async fn run(sync: &AcraSync, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Delete the synced calendar and all of its events?")
            .default(false)
            .interact()?;

        if !confirmed {
            return Ok(());
        }
    }

    let removed = sync
        .delete_synced_calendar(&CancelToken::new())
        .await
        .context("Could not delete the synced calendar")?;

    if removed {
        println!("{}", "Synced calendar deleted".green());
    } else {
        println!("{}", "No synced calendar to delete".dimmed());
    }

    Ok(())
}
