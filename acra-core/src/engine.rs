//! Full-replace reconciliation of ACRA meetings into a calendar store.
//!
//! Every sync throws away the calendar created by the previous one (and any
//! stray calendar carrying the app prefix), creates a fresh one and writes one
//! event per meeting into it. Calendars the user made are never touched.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::SyncSettings;
use crate::error::{StoreError, SyncError, SyncResult};
use crate::event::Reminder;
use crate::guard::MutationGuard;
use crate::meeting::Meeting;
use crate::preferences::Preferences;
use crate::store::{CalendarStore, Color, Container, EntityKind, NewContainer, choose_source};
use crate::translate;

/// Summary of a sync where every event was written.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub container: Container,
    pub written: usize,
    /// Prefixed calendars removed besides the one we remembered.
    pub orphans_removed: usize,
}

pub struct CalendarSync<S, P> {
    store: Arc<S>,
    preferences: P,
    settings: SyncSettings,
    guard: MutationGuard,
}

impl<S: CalendarStore, P: Preferences> CalendarSync<S, P> {
    pub fn new(store: Arc<S>, preferences: P, settings: SyncSettings) -> Self {
        CalendarSync {
            store,
            preferences,
            settings,
            guard: MutationGuard::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Replace the app calendar with one holding exactly `meetings`.
    ///
    /// Individual event failures don't stop the loop; they are reported
    /// together as `PartialFailure` once every meeting has been tried.
    pub async fn sync_meetings(
        &self,
        meetings: &[Meeting],
        cancel: &CancelToken,
    ) -> SyncResult<SyncReport> {
        let _permit = self.guard.acquire(cancel).await?;
        self.ensure_access(EntityKind::Event).await?;

        let color = match self.previous_container().await? {
            Some(previous) => {
                self.store.delete_container(&previous).await?;
                info!(container = %previous.title, "removed previous calendar");
                previous.color
            }
            None => None,
        };

        let orphans_removed = self.sweep_orphans().await?;
        let container = self.create_container(color).await?;

        let mut ordered: Vec<&Meeting> = meetings.iter().collect();
        ordered.sort_by(|a, b| b.start_date.cmp(&a.start_date));

        let total = ordered.len();
        let mut failed = 0;

        for meeting in ordered {
            if cancel.is_cancelled() {
                warn!(container = %container.title, "sync cancelled before all events were written");
                return Err(SyncError::Cancelled);
            }

            let event = translate::to_event(meeting, &self.settings);
            match self.store.create_event(&container, &event).await {
                Ok(()) => debug!(title = %event.title, "event written"),
                Err(e) => {
                    failed += 1;
                    warn!(title = %event.title, error = %e, "could not write event");
                }
            }
        }

        if failed > 0 {
            warn!(failed, total, container = %container.title, "sync finished with failures");
            return Err(SyncError::PartialFailure { failed, total });
        }

        info!(total, container = %container.title, "sync finished");
        Ok(SyncReport {
            container,
            written: total,
            orphans_removed,
        })
    }

    /// Remove the calendar created by the last sync, if it still exists.
    ///
    /// Returns whether a calendar was removed.
    pub async fn delete_synced_calendar(&self, cancel: &CancelToken) -> SyncResult<bool> {
        let _permit = self.guard.acquire(cancel).await?;
        self.ensure_access(EntityKind::Event).await?;

        let Some(previous) = self.previous_container().await? else {
            debug!("no synced calendar to delete");
            return Ok(false);
        };

        self.store.delete_container(&previous).await?;
        info!(container = %previous.title, "removed synced calendar");
        Ok(true)
    }

    /// Set an alarm on the open reminder titled `title`, creating it if needed.
    pub async fn add_reminder(
        &self,
        title: &str,
        notes: &str,
        at: DateTime<Utc>,
    ) -> SyncResult<Reminder> {
        self.ensure_access(EntityKind::Reminder).await?;

        let mut reminder = self
            .store
            .reminders()
            .await?
            .into_iter()
            .find(|r| !r.completed && r.title == title)
            .unwrap_or_else(|| Reminder::new(title));

        reminder.title = title.to_string();
        reminder.alarms.push(at);
        reminder.notes = Some(notes.to_string());
        reminder.list = self
            .store
            .default_reminder_list()
            .await?
            .map(|list| list.identifier);

        self.store.save_reminder(&reminder).await?;
        info!(title = %reminder.title, alarm = %at, "reminder saved");
        Ok(reminder)
    }

    /// Identifier of the calendar created by the last successful sync.
    pub fn remembered_identifier(&self) -> Option<String> {
        match self.preferences.get(&self.settings.identifier_key) {
            Ok(identifier) => identifier.filter(|id| !id.is_empty()),
            Err(e) => {
                warn!(error = %e, "could not read the remembered calendar identifier");
                None
            }
        }
    }

    async fn ensure_access(&self, kind: EntityKind) -> SyncResult<()> {
        if self.store.request_access(kind).await? {
            Ok(())
        } else {
            warn!(%kind, "access not granted");
            Err(SyncError::AccessDenied(kind))
        }
    }

    async fn previous_container(&self) -> SyncResult<Option<Container>> {
        let Some(identifier) = self.remembered_identifier() else {
            return Ok(None);
        };

        Ok(self.store.find_container(&identifier).await?)
    }

    /// Delete every event calendar carrying the app prefix. Failures are logged only.
    async fn sweep_orphans(&self) -> SyncResult<usize> {
        let prefix = &self.settings.title_prefix;
        let mut removed = 0;

        if prefix.trim().is_empty() {
            warn!("no title prefix configured, skipping orphan sweep");
            return Ok(removed);
        }

        for orphan in self
            .store
            .list_containers(EntityKind::Event)
            .await?
            .into_iter()
            .filter(|c| c.title.starts_with(prefix.as_str()))
        {
            match self.store.delete_container(&orphan).await {
                Ok(()) => {
                    removed += 1;
                    info!(container = %orphan.title, "removed orphaned calendar");
                }
                Err(e) => warn!(container = %orphan.title, error = %e, "could not remove orphaned calendar"),
            }
        }

        Ok(removed)
    }

    async fn create_container(&self, color: Option<Color>) -> SyncResult<Container> {
        let sources = self.store.sources().await?;
        let fallback = self.store.default_source(EntityKind::Event).await?;
        let source = choose_source(&sources, &self.settings.preferred_account, fallback)
            .ok_or_else(|| StoreError::Unavailable("no source can hold a new calendar".into()))?;

        let title = format!(
            "{} du {}",
            self.settings.title_prefix,
            Utc::now()
                .with_timezone(&self.settings.timezone)
                .format("%d/%m/%Y %H:%M")
        );

        let container = self
            .store
            .create_container(NewContainer {
                title,
                color,
                source,
            })
            .await?;
        info!(container = %container.title, source = %container.source.title, "created calendar");

        if let Err(e) = self
            .preferences
            .set(&self.settings.identifier_key, &container.identifier)
        {
            warn!(error = %e, "could not remember the new calendar identifier");
        }

        Ok(container)
    }
}
