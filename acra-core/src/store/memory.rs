//! In-memory calendar store.
//!
//! Keeps containers, events and reminders in process and records every
//! mutation in order. Failures can be injected per container or per event
//! title, which is what the engine tests lean on.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{StoreError, StoreResult};
use crate::event::{NewEvent, Reminder};
use crate::store::{CalendarStore, Color, Container, EntityKind, NewContainer, Source, SourceKind};

const REMINDER_LIST_TITLE: &str = "Reminders";

/// One structural change applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    DeleteContainer { identifier: String, title: String },
    CreateContainer { identifier: String, title: String },
    CreateEvent { container: String, title: String },
    SaveReminder { title: String },
}

#[derive(Default)]
struct State {
    containers: Vec<Container>,
    events: Vec<(String, NewEvent)>,
    reminders: Vec<Reminder>,
    log: Vec<Mutation>,
}

#[derive(Default)]
struct Faults {
    denied: HashSet<EntityKind>,
    rejected_titles: HashSet<String>,
    undeletable: HashSet<String>,
}

pub struct MemoryStore {
    sources: Vec<Source>,
    default_source: Option<Source>,
    state: Mutex<State>,
    faults: Mutex<Faults>,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store with a single on-device source and an empty reminder list.
    pub fn new() -> Self {
        Self::with_sources(vec![Source::new("On My Device", SourceKind::Local)])
    }

    /// A store exposing `sources`; the first one doubles as the default source.
    pub fn with_sources(sources: Vec<Source>) -> Self {
        let default_source = sources.first().cloned();

        let mut state = State::default();
        if let Some(source) = &default_source {
            state.containers.push(Container {
                identifier: uuid::Uuid::new_v4().to_string(),
                title: REMINDER_LIST_TITLE.to_string(),
                color: None,
                source: source.clone(),
                kind: EntityKind::Reminder,
            });
        }

        MemoryStore {
            sources,
            default_source,
            state: Mutex::new(state),
            faults: Mutex::new(Faults::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    // =========================================================================
    // Seeding and fault injection
    // =========================================================================

    /// Add a pre-existing event container, as if the user (or an older sync) made it.
    pub fn insert_container(&self, title: &str, color: Option<Color>) -> Container {
        let source = self
            .default_source
            .clone()
            .unwrap_or_else(|| Source::new("Default", SourceKind::Other));
        let container = Container {
            identifier: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            color,
            source,
            kind: EntityKind::Event,
        };
        self.state().containers.push(container.clone());
        container
    }

    pub fn deny_access(&self, kind: EntityKind) {
        self.faults().denied.insert(kind);
    }

    /// Reject any event write whose title equals `title`.
    pub fn reject_event_titled(&self, title: &str) {
        self.faults().rejected_titles.insert(title.to_string());
    }

    /// Make deletion of the container with `identifier` fail.
    pub fn fail_deletion_of(&self, identifier: &str) {
        self.faults().undeletable.insert(identifier.to_string());
    }

    /// Make every store call fail as if the backing API were gone.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn containers(&self) -> Vec<Container> {
        self.state().containers.clone()
    }

    pub fn event_containers(&self) -> Vec<Container> {
        self.state()
            .containers
            .iter()
            .filter(|c| c.kind == EntityKind::Event)
            .cloned()
            .collect()
    }

    pub fn events_in(&self, identifier: &str) -> Vec<NewEvent> {
        self.state()
            .events
            .iter()
            .filter(|(container, _)| container == identifier)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.state().events.len()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state().log.clone()
    }

    pub fn stored_reminders(&self) -> Vec<Reminder> {
        self.state().reminders.clone()
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn request_access(&self, kind: EntityKind) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        self.check_available()?;
        Ok(!self.faults().denied.contains(&kind))
    }

    async fn find_container(&self, identifier: &str) -> StoreResult<Option<Container>> {
        tokio::task::yield_now().await;
        self.check_available()?;
        Ok(self
            .state()
            .containers
            .iter()
            .find(|c| c.identifier == identifier)
            .cloned())
    }

    async fn list_containers(&self, kind: EntityKind) -> StoreResult<Vec<Container>> {
        tokio::task::yield_now().await;
        self.check_available()?;
        Ok(self
            .state()
            .containers
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect())
    }

    async fn sources(&self) -> StoreResult<Vec<Source>> {
        self.check_available()?;
        Ok(self.sources.clone())
    }

    async fn default_source(&self, _kind: EntityKind) -> StoreResult<Option<Source>> {
        self.check_available()?;
        Ok(self.default_source.clone())
    }

    async fn create_container(&self, new: NewContainer) -> StoreResult<Container> {
        tokio::task::yield_now().await;
        self.check_available()?;

        let container = Container {
            identifier: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            color: new.color,
            source: new.source,
            kind: EntityKind::Event,
        };

        let mut state = self.state();
        state.containers.push(container.clone());
        state.log.push(Mutation::CreateContainer {
            identifier: container.identifier.clone(),
            title: container.title.clone(),
        });
        Ok(container)
    }

    async fn delete_container(&self, container: &Container) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.check_available()?;

        if self.faults().undeletable.contains(&container.identifier) {
            return Err(StoreError::Rejected(format!(
                "container '{}' is read-only",
                container.title
            )));
        }

        let mut state = self.state();
        let before = state.containers.len();
        state
            .containers
            .retain(|c| c.identifier != container.identifier);
        if state.containers.len() == before {
            return Err(StoreError::NotFound(container.identifier.clone()));
        }

        state.events.retain(|(id, _)| id != &container.identifier);
        state.log.push(Mutation::DeleteContainer {
            identifier: container.identifier.clone(),
            title: container.title.clone(),
        });
        Ok(())
    }

    async fn create_event(&self, container: &Container, event: &NewEvent) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.check_available()?;

        if self.faults().rejected_titles.contains(&event.title) {
            return Err(StoreError::Rejected(format!("event '{}'", event.title)));
        }

        let mut state = self.state();
        if !state
            .containers
            .iter()
            .any(|c| c.identifier == container.identifier)
        {
            return Err(StoreError::NotFound(container.identifier.clone()));
        }

        state
            .events
            .push((container.identifier.clone(), event.clone()));
        state.log.push(Mutation::CreateEvent {
            container: container.identifier.clone(),
            title: event.title.clone(),
        });
        Ok(())
    }

    async fn reminders(&self) -> StoreResult<Vec<Reminder>> {
        self.check_available()?;
        Ok(self.state().reminders.clone())
    }

    async fn default_reminder_list(&self) -> StoreResult<Option<Container>> {
        self.check_available()?;
        Ok(self
            .state()
            .containers
            .iter()
            .find(|c| c.kind == EntityKind::Reminder)
            .cloned())
    }

    async fn save_reminder(&self, reminder: &Reminder) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.check_available()?;

        let mut state = self.state();
        match state
            .reminders
            .iter_mut()
            .find(|r| r.identifier == reminder.identifier)
        {
            Some(existing) => *existing = reminder.clone(),
            None => state.reminders.push(reminder.clone()),
        }
        state.log.push(Mutation::SaveReminder {
            title: reminder.title.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_event(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            start: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
            all_day: false,
            recurrence: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn deleting_a_container_drops_its_events() {
        let store = MemoryStore::new();
        let container = store.insert_container("Family", None);

        store
            .create_event(&container, &sample_event("Dinner"))
            .await
            .unwrap();
        assert_eq!(store.events_in(&container.identifier).len(), 1);

        store.delete_container(&container).await.unwrap();
        assert_eq!(store.event_count(), 0);
        assert!(store.event_containers().is_empty());
    }

    #[tokio::test]
    async fn writing_into_a_missing_container_fails() {
        let store = MemoryStore::new();
        let container = store.insert_container("Gone", None);
        store.delete_container(&container).await.unwrap();

        let result = store.create_event(&container, &sample_event("Late")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn new_store_has_a_reminder_list() {
        let store = MemoryStore::new();
        let list = store.default_reminder_list().await.unwrap().unwrap();
        assert_eq!(list.kind, EntityKind::Reminder);
        assert!(store.event_containers().is_empty());
    }
}
