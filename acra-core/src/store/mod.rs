//! Calendar store capability.
//!
//! The engine never talks to a platform calendar API directly. Everything it
//! needs goes through `CalendarStore`, so a device store, a directory of ics
//! files or an in-memory fake can all sit behind it.

pub mod dir;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreResult;
use crate::event::{NewEvent, Reminder};

pub use dir::DirStore;
pub use memory::{MemoryStore, Mutation};

/// What a container (or an access request) is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Event,
    Reminder,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityKind::Event => write!(f, "calendar events"),
            EntityKind::Reminder => write!(f, "reminders"),
        }
    }
}

/// Kind of account backing a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A synced account (CalDAV, iCloud, Exchange, ...)
    Remote,
    /// On-device storage with no account attached
    Local,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub identifier: String,
    pub title: String,
    pub kind: SourceKind,
}

impl Source {
    pub fn new(title: &str, kind: SourceKind) -> Self {
        Source {
            identifier: slug::slugify(title),
            title: title.to_string(),
            kind,
        }
    }

    pub fn is_account_named(&self, account: &str) -> bool {
        self.kind == SourceKind::Remote && self.title.eq_ignore_ascii_case(account)
    }
}

/// Opaque display color, stored as `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub String);

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A calendar (or reminder list) living in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub identifier: String,
    pub title: String,
    pub color: Option<Color>,
    pub source: Source,
    pub kind: EntityKind,
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Parameters for a container about to be created.
#[derive(Debug, Clone)]
pub struct NewContainer {
    pub title: String,
    pub color: Option<Color>,
    pub source: Source,
}

/// Operations the engine needs from a calendar store.
///
/// Every call is individually atomic from the store's point of view; a whole
/// sync is not.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Ask for access to events or reminders. `Ok(false)` means refused.
    async fn request_access(&self, kind: EntityKind) -> StoreResult<bool>;

    async fn find_container(&self, identifier: &str) -> StoreResult<Option<Container>>;

    async fn list_containers(&self, kind: EntityKind) -> StoreResult<Vec<Container>>;

    /// Accounts available to hold new containers, in enumeration order.
    async fn sources(&self) -> StoreResult<Vec<Source>>;

    /// Source of the default container for new items of `kind`.
    async fn default_source(&self, kind: EntityKind) -> StoreResult<Option<Source>>;

    async fn create_container(&self, container: NewContainer) -> StoreResult<Container>;

    /// Remove a container along with every event it holds.
    async fn delete_container(&self, container: &Container) -> StoreResult<()>;

    async fn create_event(&self, container: &Container, event: &NewEvent) -> StoreResult<()>;

    async fn reminders(&self) -> StoreResult<Vec<Reminder>>;

    async fn default_reminder_list(&self) -> StoreResult<Option<Container>>;

    /// Insert or replace a reminder by identifier.
    async fn save_reminder(&self, reminder: &Reminder) -> StoreResult<()>;
}

/// Pick where a new app container should live.
///
/// Precedence: the preferred remote account, then on-device storage, then
/// whatever the store uses by default. Within a tier the first source in
/// enumeration order wins.
pub fn choose_source(
    sources: &[Source],
    preferred_account: &str,
    fallback: Option<Source>,
) -> Option<Source> {
    sources
        .iter()
        .find(|s| s.is_account_named(preferred_account))
        .or_else(|| sources.iter().find(|s| s.kind == SourceKind::Local))
        .cloned()
        .or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_named_remote_account() {
        let sources = vec![
            Source::new("On My iPhone", SourceKind::Local),
            Source::new("Gmail", SourceKind::Remote),
            Source::new("ICLOUD", SourceKind::Remote),
        ];

        let chosen = choose_source(&sources, "iCloud", None).unwrap();
        assert_eq!(chosen.title, "ICLOUD");
    }

    #[test]
    fn falls_back_to_local() {
        let sources = vec![
            Source::new("Gmail", SourceKind::Remote),
            Source::new("On My iPhone", SourceKind::Local),
        ];

        let chosen = choose_source(&sources, "iCloud", None).unwrap();
        assert_eq!(chosen.kind, SourceKind::Local);
    }

    #[test]
    fn local_named_like_account_is_not_the_account() {
        let sources = vec![Source::new("iCloud", SourceKind::Local)];
        assert!(!sources[0].is_account_named("iCloud"));
        assert_eq!(
            choose_source(&sources, "iCloud", None).unwrap().kind,
            SourceKind::Local
        );
    }

    #[test]
    fn uses_store_default_last() {
        let sources = vec![Source::new("Exchange", SourceKind::Remote)];
        let fallback = Source::new("Exchange", SourceKind::Remote);

        let chosen = choose_source(&sources, "iCloud", Some(fallback.clone()));
        assert_eq!(chosen, Some(fallback));
        assert_eq!(choose_source(&[], "iCloud", None), None);
    }
}
