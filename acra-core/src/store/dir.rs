//! Directory-backed calendar store.
//!
//! Layout:
//! ```text
//! <root>/
//!   .acra/reminders.toml
//!   <container-id>/
//!     .acra/container.toml
//!     2025-03-20T1500__revue-de-sprint.ics
//!     _recurring__ferie.ics
//! ```

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::event::{NewEvent, Reminder};
use crate::ics::generate_ics;
use crate::store::{CalendarStore, Color, Container, EntityKind, NewContainer, Source};

const META_DIR: &str = ".acra";
const CONTAINER_FILE: &str = "container.toml";
const REMINDERS_FILE: &str = "reminders.toml";
const REMINDER_LIST_TITLE: &str = "Reminders";

/// On-disk shape of `.acra/container.toml`
#[derive(Serialize, Deserialize)]
struct ContainerFile {
    identifier: String,
    title: String,
    kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<Color>,
    source: Source,
}

impl From<ContainerFile> for Container {
    fn from(file: ContainerFile) -> Self {
        Container {
            identifier: file.identifier,
            title: file.title,
            color: file.color,
            source: file.source,
            kind: file.kind,
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct RemindersFile {
    #[serde(default)]
    reminders: Vec<Reminder>,
}

pub struct DirStore {
    root: PathBuf,
    sources: Vec<Source>,
    timezone: Tz,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>, sources: Vec<Source>) -> Self {
        DirStore {
            root: root.into(),
            sources,
            timezone: Tz::UTC,
        }
    }

    /// Zone used to date all-day events on disk.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of `.ics` files stored in a container.
    pub fn event_count(&self, container: &Container) -> StoreResult<usize> {
        let Some(dir) = self.container_dir(&container.identifier) else {
            return Ok(0);
        };

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "ics"))
            .count())
    }

    /// Directory of a container, or None if the identifier could escape the root.
    fn container_dir(&self, identifier: &str) -> Option<PathBuf> {
        let valid = !identifier.is_empty()
            && !identifier.starts_with('.')
            && !identifier.contains(['/', '\\']);
        valid.then(|| self.root.join(identifier))
    }

    fn read_container(dir: &Path) -> StoreResult<Container> {
        let content = std::fs::read_to_string(dir.join(META_DIR).join(CONTAINER_FILE))?;
        let file: ContainerFile =
            toml::from_str(&content).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(file.into())
    }

    fn write_container(dir: &Path, container: &Container) -> StoreResult<()> {
        let meta = dir.join(META_DIR);
        std::fs::create_dir_all(&meta)?;

        let file = ContainerFile {
            identifier: container.identifier.clone(),
            title: container.title.clone(),
            kind: container.kind,
            color: container.color.clone(),
            source: container.source.clone(),
        };
        let content =
            toml::to_string_pretty(&file).map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(meta.join(CONTAINER_FILE), content)?;
        Ok(())
    }

    /// Every container found under the root, sorted by title.
    fn all_containers(&self) -> StoreResult<Vec<Container>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut containers: Vec<Container> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.join(META_DIR).join(CONTAINER_FILE).is_file())
            .filter_map(|path| match Self::read_container(&path) {
                Ok(container) => Some(container),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable container");
                    None
                }
            })
            .collect();

        containers.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(containers)
    }

    fn reminders_path(&self) -> PathBuf {
        self.root.join(META_DIR).join(REMINDERS_FILE)
    }

    fn read_reminders(&self) -> StoreResult<RemindersFile> {
        let path = self.reminders_path();
        if !path.exists() {
            return Ok(RemindersFile::default());
        }

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write_reminders(&self, file: &RemindersFile) -> StoreResult<()> {
        let path = self.reminders_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(file).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let temp = path.with_extension("toml.tmp");
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn new_container(
        &self,
        title: &str,
        color: Option<Color>,
        source: Source,
        kind: EntityKind,
    ) -> StoreResult<Container> {
        let container = Container {
            identifier: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            color,
            source,
            kind,
        };

        let dir = self.root.join(&container.identifier);
        Self::write_container(&dir, &container)?;
        Ok(container)
    }

    fn fallback_source(&self) -> StoreResult<Source> {
        self.sources
            .first()
            .cloned()
            .ok_or_else(|| StoreError::Config("No sources configured".into()))
    }
}

#[async_trait]
impl CalendarStore for DirStore {
    async fn request_access(&self, _kind: EntityKind) -> StoreResult<bool> {
        match std::fs::create_dir_all(&self.root) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_container(&self, identifier: &str) -> StoreResult<Option<Container>> {
        let Some(dir) = self.container_dir(identifier) else {
            return Ok(None);
        };

        if !dir.join(META_DIR).join(CONTAINER_FILE).is_file() {
            return Ok(None);
        }

        Self::read_container(&dir).map(Some)
    }

    async fn list_containers(&self, kind: EntityKind) -> StoreResult<Vec<Container>> {
        Ok(self
            .all_containers()?
            .into_iter()
            .filter(|c| c.kind == kind)
            .collect())
    }

    async fn sources(&self) -> StoreResult<Vec<Source>> {
        Ok(self.sources.clone())
    }

    async fn default_source(&self, _kind: EntityKind) -> StoreResult<Option<Source>> {
        Ok(self.sources.first().cloned())
    }

    async fn create_container(&self, new: NewContainer) -> StoreResult<Container> {
        self.new_container(&new.title, new.color, new.source, EntityKind::Event)
    }

    async fn delete_container(&self, container: &Container) -> StoreResult<()> {
        let dir = self
            .container_dir(&container.identifier)
            .ok_or_else(|| StoreError::NotFound(container.identifier.clone()))?;

        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(container.identifier.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_event(&self, container: &Container, event: &NewEvent) -> StoreResult<()> {
        let dir = self
            .container_dir(&container.identifier)
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| StoreError::NotFound(container.identifier.clone()))?;

        let uid = format!("{}@acra", uuid::Uuid::new_v4());
        let content = generate_ics(&uid, event, self.timezone);
        let filename = filename_for(event, &dir, self.timezone)?;

        std::fs::write(dir.join(filename), content)?;
        Ok(())
    }

    async fn reminders(&self) -> StoreResult<Vec<Reminder>> {
        Ok(self.read_reminders()?.reminders)
    }

    async fn default_reminder_list(&self) -> StoreResult<Option<Container>> {
        if let Some(list) = self
            .all_containers()?
            .into_iter()
            .find(|c| c.kind == EntityKind::Reminder)
        {
            return Ok(Some(list));
        }

        let source = self.fallback_source()?;
        self.new_container(REMINDER_LIST_TITLE, None, source, EntityKind::Reminder)
            .map(Some)
    }

    async fn save_reminder(&self, reminder: &Reminder) -> StoreResult<()> {
        let mut file = self.read_reminders()?;

        match file
            .reminders
            .iter_mut()
            .find(|r| r.identifier == reminder.identifier)
        {
            Some(existing) => *existing = reminder.clone(),
            None => file.reminders.push(reminder.clone()),
        }

        self.write_reminders(&file)
    }
}

// =============================================================================
// Filename generation
// =============================================================================

/// Generate a unique filename for an event, handling collisions.
fn filename_for(event: &NewEvent, dir: &Path, tz: Tz) -> StoreResult<String> {
    let base = base_filename(event, tz);
    let stem = base.trim_end_matches(".ics");

    if !dir.join(&base).exists() {
        return Ok(base);
    }

    for n in 2..=100 {
        let suffixed = format!("{}-{}.ics", stem, n);
        if !dir.join(&suffixed).exists() {
            return Ok(suffixed);
        }
    }

    Err(StoreError::Rejected(format!(
        "Too many filename collisions for {}",
        base
    )))
}

fn base_filename(event: &NewEvent, tz: Tz) -> String {
    let mut slug: String = slug::slugify(&event.title).chars().take(50).collect();
    if slug.is_empty() {
        slug = "event".to_string();
    }

    if event.recurrence.is_some() {
        return format!("_recurring__{}.ics", slug);
    }

    let local = event.start.with_timezone(&tz);
    let date = if event.all_day {
        local.format("%Y-%m-%d").to_string()
    } else {
        local.format("%Y-%m-%dT%H%M").to_string()
    };

    format!("{}__{}.ics", date, slug)
}
