mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use acra_core::CalendarSync;
use acra_core::config::AcraConfig;
use acra_core::preferences::FilePreferences;
use acra_core::store::DirStore;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::AcraSync;

#[derive(Parser)]
#[command(name = "acra")]
#[command(about = "Mirror your ACRA meetings into a local calendar directory")]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the synced calendar with the meetings in a JSON file
    Sync {
        /// JSON array of meetings as returned by the ACRA service
        file: PathBuf,
    },
    /// Remove the synced calendar
    Delete {
        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Set a reminder alarm (reuses an open reminder with the same title)
    Remind {
        title: String,

        /// When to ring: a delay ("2h", "30min") or a date ("friday 9am")
        #[arg(short, long)]
        at: String,

        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// List calendars in the calendar directory
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AcraConfig::load()?;
    let sync = build_sync(&config)?;

    match cli.command {
        Commands::Sync { file } => commands::sync::run(&sync, &file).await,
        Commands::Delete { force } => commands::delete::run(&sync, force).await,
        Commands::Remind { title, at, notes } => {
            commands::remind::run(&sync, &title, &at, &notes).await
        }
        Commands::Status => commands::status::run(&sync).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("acra_core=debug,acra_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_sync(config: &AcraConfig) -> Result<AcraSync> {
    let settings = config.settings()?;
    let root = config.data_path();
    let store = DirStore::new(root.clone(), config.sources()).with_timezone(settings.timezone);
    let preferences = FilePreferences::in_dir(&root.join(".acra"));

    Ok(CalendarSync::new(Arc::new(store), preferences, settings))
}
