//! Global acra configuration.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::preferences::CALENDAR_IDENTIFIER_KEY;
use crate::store::{Source, SourceKind};

static DEFAULT_CALENDAR_DIR: &str = "~/calendar/acra";
static DEFAULT_TITLE_PREFIX: &str = "ACRA";
static DEFAULT_HOLIDAY_MARKER: &str = "[FERIE]";
static DEFAULT_PREFERRED_ACCOUNT: &str = "iCloud";
static DEFAULT_TIMEZONE: &str = "UTC";
static DEFAULT_LOCAL_SOURCE: &str = "On My Device";

fn default_calendar_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CALENDAR_DIR)
}

fn default_title_prefix() -> String {
    DEFAULT_TITLE_PREFIX.to_string()
}

fn default_holiday_marker() -> String {
    DEFAULT_HOLIDAY_MARKER.to_string()
}

fn default_preferred_account() -> String {
    DEFAULT_PREFERRED_ACCOUNT.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

/// An account the directory store exposes as a container source.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SourceConfig {
    pub title: String,
    pub kind: SourceKind,
}

/// Global configuration at ~/.config/acra/config.toml
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AcraConfig {
    #[serde(default = "default_calendar_dir")]
    pub calendar_dir: PathBuf,

    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    #[serde(default = "default_holiday_marker")]
    pub holiday_marker: String,

    #[serde(default = "default_preferred_account")]
    pub preferred_account: String,

    /// IANA zone the ACRA service's wall-clock times are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for AcraConfig {
    fn default() -> Self {
        AcraConfig {
            calendar_dir: default_calendar_dir(),
            title_prefix: default_title_prefix(),
            holiday_marker: default_holiday_marker(),
            preferred_account: default_preferred_account(),
            timezone: default_timezone(),
            sources: Vec::new(),
        }
    }
}

impl AcraConfig {
    pub fn config_path() -> StoreResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| StoreError::Config("Could not determine config directory".into()))?
            .join("acra");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the global config, writing a commented default on first use.
    pub fn load() -> StoreResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> StoreResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Calendar directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str =
            shellexpand::tilde(&self.calendar_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// Sources offered by the directory store, in configured order.
    pub fn sources(&self) -> Vec<Source> {
        if self.sources.is_empty() {
            return vec![Source::new(DEFAULT_LOCAL_SOURCE, SourceKind::Local)];
        }

        self.sources
            .iter()
            .map(|s| Source::new(&s.title, s.kind))
            .collect()
    }

    pub fn settings(&self) -> StoreResult<SyncSettings> {
        // The prefix decides which calendars the sync may delete
        if self.title_prefix.trim().is_empty() {
            return Err(StoreError::Config("title_prefix must not be empty".into()));
        }

        let timezone: Tz = self.timezone.parse().map_err(|_| {
            StoreError::Config(format!("Unknown time zone '{}'", self.timezone))
        })?;

        Ok(SyncSettings {
            title_prefix: self.title_prefix.clone(),
            holiday_marker: self.holiday_marker.clone(),
            preferred_account: self.preferred_account.clone(),
            identifier_key: CALENDAR_IDENTIFIER_KEY.to_string(),
            timezone,
        })
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> StoreResult<()> {
        let contents = format!(
            "\
# acra configuration

# Where synced calendars live:
# calendar_dir = \"{}\"

# Prefix used to name (and recognize) the synced calendar:
# title_prefix = \"{}\"

# Prefix added to holiday titles:
# holiday_marker = \"{}\"

# Account that should host the synced calendar when available:
# preferred_account = \"{}\"

# Time zone of the meeting times sent by ACRA:
# timezone = \"Europe/Paris\"

# Accounts available in the calendar directory:
# [[sources]]
# title = \"iCloud\"
# kind = \"remote\"
#
# [[sources]]
# title = \"{}\"
# kind = \"local\"
",
            DEFAULT_CALENDAR_DIR,
            DEFAULT_TITLE_PREFIX,
            DEFAULT_HOLIDAY_MARKER,
            DEFAULT_PREFERRED_ACCOUNT,
            DEFAULT_LOCAL_SOURCE,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| StoreError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

/// What the engine needs to know about naming and time handling.
#[derive(Clone, Debug)]
pub struct SyncSettings {
    pub title_prefix: String,
    pub holiday_marker: String,
    pub preferred_account: String,
    pub identifier_key: String,
    pub timezone: Tz,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
            holiday_marker: DEFAULT_HOLIDAY_MARKER.to_string(),
            preferred_account: DEFAULT_PREFERRED_ACCOUNT.to_string(),
            identifier_key: CALENDAR_IDENTIFIER_KEY.to_string(),
            timezone: Tz::UTC,
        }
    }
}
