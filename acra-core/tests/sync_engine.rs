use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use acra_core::config::SyncSettings;
use acra_core::error::StoreResult;
use acra_core::event::{Frequency, NewEvent, Reminder};
use acra_core::preferences::{CALENDAR_IDENTIFIER_KEY, MemoryPreferences, Preferences};
use acra_core::store::{
    CalendarStore, Color, Container, EntityKind, MemoryStore, Mutation, NewContainer, Source,
    SourceKind,
};
use acra_core::{CalendarSync, CancelToken, Meeting, SyncError};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn meeting(title: &str, start: NaiveDateTime, end: NaiveDateTime) -> Meeting {
    let mut meeting = Meeting::new(title, start, end);
    meeting.kind = "Meeting".to_string();
    meeting
}

/// Five one-hour meetings on consecutive days, m1 first.
fn week_of_meetings() -> Vec<Meeting> {
    (1..=5)
        .map(|i| {
            let start = at(2025, 6, 1 + i, 9);
            meeting(&format!("m{i}"), start, start + Duration::hours(1))
        })
        .collect()
}

fn settings() -> SyncSettings {
    SyncSettings {
        holiday_marker: "[HOLIDAY]".to_string(),
        ..SyncSettings::default()
    }
}

fn engine(store: Arc<MemoryStore>) -> CalendarSync<MemoryStore, MemoryPreferences> {
    CalendarSync::new(store, MemoryPreferences::new(), settings())
}

fn app_calendars(store: &MemoryStore) -> Vec<Container> {
    store
        .event_containers()
        .into_iter()
        .filter(|c| c.title.starts_with("ACRA"))
        .collect()
}

fn sorted_titles(events: &[NewEvent]) -> Vec<String> {
    let mut titles: Vec<String> = events.iter().map(|e| e.title.clone()).collect();
    titles.sort();
    titles
}

async fn sync_one(meeting: Meeting) -> NewEvent {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());
    let report = sync
        .sync_meetings(&[meeting], &CancelToken::new())
        .await
        .unwrap();

    let events = store.events_in(&report.container.identifier);
    assert_eq!(events.len(), 1);
    events.into_iter().next().unwrap()
}

#[tokio::test]
async fn one_calendar_with_one_event_per_meeting() {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());

    let report = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.written, 5);
    assert_eq!(report.orphans_removed, 0);
    assert!(report.container.title.starts_with("ACRA du "));

    let calendars = app_calendars(&store);
    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0].identifier, report.container.identifier);
    assert_eq!(store.events_in(&report.container.identifier).len(), 5);
    assert_eq!(
        sync.remembered_identifier().as_deref(),
        Some(report.container.identifier.as_str())
    );
}

#[tokio::test]
async fn syncing_twice_does_not_duplicate() {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());
    let meetings = week_of_meetings();

    let first = sync
        .sync_meetings(&meetings, &CancelToken::new())
        .await
        .unwrap();
    let first_events = store.events_in(&first.container.identifier);

    let second = sync
        .sync_meetings(&meetings, &CancelToken::new())
        .await
        .unwrap();
    let second_events = store.events_in(&second.container.identifier);

    assert_ne!(first.container.identifier, second.container.identifier);
    assert_eq!(app_calendars(&store).len(), 1);
    assert_eq!(store.event_count(), 5);
    assert_eq!(first_events, second_events);
    // The remembered calendar is deleted directly, not swept as an orphan
    assert_eq!(second.orphans_removed, 0);
}

#[tokio::test]
async fn all_day_end_is_one_day_earlier() {
    let mut m = meeting("Congés", at(2025, 8, 4, 0), at(2025, 8, 9, 0));
    m.all_day_event = true;

    let event = sync_one(m).await;
    assert!(event.all_day);
    assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 8, 8, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn recurring_all_day_meeting_repeats_weekly_until_its_end() {
    let mut m = meeting("Férié", at(2025, 5, 1, 0), at(2025, 5, 29, 0));
    m.all_day_event = true;
    m.is_recurrent = true;

    let event = sync_one(m).await;
    let rule = event.recurrence.expect("weekly rule");
    assert_eq!(rule.frequency, Frequency::Weekly);
    assert_eq!(rule.until, Utc.with_ymd_and_hms(2025, 5, 29, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn holiday_title_ignores_duration_and_recurrence() {
    let mut m = meeting("X", at(2025, 12, 22, 0), at(2025, 12, 27, 0));
    m.is_holiday = true;
    m.is_recurrent = true;
    m.all_day_event = true;

    assert_eq!(sync_one(m).await.title, "[HOLIDAY] X");
}

#[tokio::test]
async fn multi_day_meeting_title_counts_days() {
    let m = meeting("Review", at(2025, 6, 2, 0), at(2025, 6, 5, 0));
    let event = sync_one(m).await;
    assert_eq!(event.title, "4 Review");
    assert_eq!(event.notes.as_deref(), Some("Meeting"));
}

#[tokio::test]
async fn blank_prefix_never_sweeps_user_calendars() {
    let store = Arc::new(MemoryStore::new());
    let family = store.insert_container("Family", None);

    let sync = CalendarSync::new(
        store.clone(),
        MemoryPreferences::new(),
        SyncSettings {
            title_prefix: String::new(),
            ..settings()
        },
    );
    let report = sync.sync_meetings(&[], &CancelToken::new()).await.unwrap();

    assert_eq!(report.orphans_removed, 0);
    assert!(
        store
            .event_containers()
            .iter()
            .any(|c| c.identifier == family.identifier)
    );
}

#[tokio::test]
async fn container_title_uses_configured_zone() {
    let store = Arc::new(MemoryStore::new());
    let sync = CalendarSync::new(
        store.clone(),
        MemoryPreferences::new(),
        SyncSettings {
            timezone: chrono_tz::Pacific::Kiritimati,
            ..settings()
        },
    );

    let before = Utc::now().with_timezone(&chrono_tz::Pacific::Kiritimati);
    let report = sync.sync_meetings(&[], &CancelToken::new()).await.unwrap();
    let after = Utc::now().with_timezone(&chrono_tz::Pacific::Kiritimati);

    let expected: Vec<String> = [before, after]
        .iter()
        .map(|now| format!("ACRA du {}", now.format("%d/%m/%Y %H:%M")))
        .collect();
    assert!(expected.contains(&report.container.title), "{}", report.container.title);
}

#[tokio::test]
async fn orphans_are_removed_and_user_calendars_kept() {
    let store = Arc::new(MemoryStore::new());
    store.insert_container("ACRA du 01/01", None);
    store.insert_container("ACRA du 02/02", None);
    let family = store.insert_container("Family", Some(Color("#34C759".to_string())));
    let dinner = NewEvent {
        title: "Dinner".to_string(),
        start: Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 6, 1, 21, 0, 0).unwrap(),
        all_day: false,
        recurrence: None,
        notes: None,
    };
    store.create_event(&family, &dinner).await.unwrap();

    let sync = engine(store.clone());
    let report = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.orphans_removed, 2);
    let titles: Vec<String> = store
        .event_containers()
        .into_iter()
        .map(|c| c.title)
        .collect();
    assert!(!titles.iter().any(|t| t == "ACRA du 01/01" || t == "ACRA du 02/02"));
    assert!(titles.contains(&"Family".to_string()));
    assert_eq!(store.events_in(&family.identifier), vec![dinner]);
    assert_eq!(app_calendars(&store).len(), 1);
}

#[tokio::test]
async fn rejected_event_is_counted_and_others_written() {
    let store = Arc::new(MemoryStore::new());
    store.reject_event_titled("m3");
    let sync = engine(store.clone());

    let result = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await;

    match result {
        Err(SyncError::PartialFailure { failed, total }) => {
            assert_eq!(failed, 1);
            assert_eq!(total, 5);
        }
        other => panic!("expected partial failure, got {:?}", other),
    }

    let calendars = app_calendars(&store);
    assert_eq!(calendars.len(), 1);
    let events = store.events_in(&calendars[0].identifier);
    assert_eq!(sorted_titles(&events), vec!["m1", "m2", "m4", "m5"]);
}

#[tokio::test]
async fn events_are_written_latest_first_with_stable_ties() {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());

    let same_start = at(2025, 6, 3, 9);
    let meetings = vec![
        meeting("early", at(2025, 6, 1, 9), at(2025, 6, 1, 10)),
        meeting("tie-a", same_start, same_start + Duration::hours(1)),
        meeting("late", at(2025, 6, 9, 9), at(2025, 6, 9, 10)),
        meeting("tie-b", same_start, same_start + Duration::hours(2)),
    ];
    sync.sync_meetings(&meetings, &CancelToken::new())
        .await
        .unwrap();

    let written: Vec<String> = store
        .mutations()
        .into_iter()
        .filter_map(|m| match m {
            Mutation::CreateEvent { title, .. } => Some(title),
            _ => None,
        })
        .collect();
    assert_eq!(written, vec!["late", "tie-a", "tie-b", "early"]);
}

#[tokio::test]
async fn deletion_precedes_creation_precedes_writes() {
    let store = Arc::new(MemoryStore::new());
    let orphan = store.insert_container("ACRA du 03/03", None);
    let sync = engine(store.clone());

    sync.sync_meetings(&week_of_meetings()[..2], &CancelToken::new())
        .await
        .unwrap();

    let log = store.mutations();
    assert_eq!(log.len(), 4);
    assert_eq!(
        log[0],
        Mutation::DeleteContainer {
            identifier: orphan.identifier.clone(),
            title: orphan.title.clone(),
        }
    );
    assert!(matches!(log[1], Mutation::CreateContainer { .. }));
    assert!(matches!(log[2], Mutation::CreateEvent { .. }));
    assert!(matches!(log[3], Mutation::CreateEvent { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_syncs_never_interleave() {
    let store = Arc::new(MemoryStore::new());
    let sync = Arc::new(engine(store.clone()));
    let meetings = week_of_meetings();

    let spawn_sync = || {
        let sync = sync.clone();
        let meetings = meetings.clone();
        tokio::spawn(async move {
            sync.sync_meetings(&meetings, &CancelToken::new())
                .await
                .map(|report| report.container.identifier)
        })
    };

    let a = spawn_sync();
    let b = spawn_sync();
    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();

    let log = store.mutations();
    assert_eq!(log.len(), 13, "log: {:#?}", log);

    let creates: Vec<(usize, String)> = log
        .iter()
        .enumerate()
        .filter_map(|(i, m)| match m {
            Mutation::CreateContainer { identifier, .. } => Some((i, identifier.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[0].0, 0);
    assert_eq!(creates[1].0, 7);

    // Each calendar receives all five of its events before anything else happens
    for (index, identifier) in &creates {
        for mutation in &log[index + 1..index + 6] {
            match mutation {
                Mutation::CreateEvent { container, .. } => assert_eq!(container, identifier),
                other => panic!("interleaved mutation {:?}", other),
            }
        }
    }

    // The second sync removes the first calendar before creating its own
    assert!(matches!(
        &log[6],
        Mutation::DeleteContainer { identifier, .. } if *identifier == creates[0].1
    ));

    let calendars = app_calendars(&store);
    assert_eq!(calendars.len(), 1);
    assert!(calendars[0].identifier == first || calendars[0].identifier == second);
    assert_eq!(store.event_count(), 5);
}

#[tokio::test]
async fn denied_access_touches_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.insert_container("ACRA du 01/01", None);
    store.deny_access(EntityKind::Event);
    let sync = engine(store.clone());

    let result = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await;
    assert!(matches!(
        result,
        Err(SyncError::AccessDenied(EntityKind::Event))
    ));

    let deleted = sync.delete_synced_calendar(&CancelToken::new()).await;
    assert!(matches!(deleted, Err(SyncError::AccessDenied(_))));

    assert!(store.mutations().is_empty());
    assert_eq!(store.event_containers().len(), 1);
}

#[tokio::test]
async fn unavailable_store_is_reported() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let sync = engine(store.clone());

    let result = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await;
    assert!(matches!(result, Err(SyncError::StoreUnavailable(_))));
}

#[tokio::test]
async fn color_is_carried_to_the_new_calendar() {
    let store = Arc::new(MemoryStore::new());
    let orange = Color("#FF9500".to_string());
    let previous = store.insert_container("ACRA du 01/05/2025 08:00", Some(orange.clone()));

    let prefs = MemoryPreferences::new();
    prefs
        .set(CALENDAR_IDENTIFIER_KEY, &previous.identifier)
        .unwrap();
    let sync = CalendarSync::new(store.clone(), prefs, settings());

    let report = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.container.color, Some(orange));
    assert_eq!(report.orphans_removed, 0);
    assert!(store.find_container(&previous.identifier).await.unwrap().is_none());
}

#[tokio::test]
async fn calendar_lands_on_the_preferred_account() {
    let store = Arc::new(MemoryStore::with_sources(vec![
        Source::new("Gmail", SourceKind::Remote),
        Source::new("On My iPhone", SourceKind::Local),
        Source::new("icloud", SourceKind::Remote),
    ]));
    let sync = engine(store.clone());

    let report = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(report.container.source.title, "icloud");
}

#[tokio::test]
async fn calendar_falls_back_to_store_default_source() {
    let store = Arc::new(MemoryStore::with_sources(vec![Source::new(
        "Exchange",
        SourceKind::Other,
    )]));
    let sync = engine(store.clone());

    let report = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(report.container.source.title, "Exchange");
}

#[tokio::test]
async fn failing_to_delete_previous_calendar_aborts() {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());
    let first = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();

    store.fail_deletion_of(&first.container.identifier);
    let result = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await;

    assert!(matches!(result, Err(SyncError::StoreUnavailable(_))));
    let calendars = app_calendars(&store);
    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0].identifier, first.container.identifier);
}

#[tokio::test]
async fn orphan_that_cannot_be_deleted_does_not_abort() {
    let store = Arc::new(MemoryStore::new());
    let stuck = store.insert_container("ACRA du 01/01", None);
    store.fail_deletion_of(&stuck.identifier);
    let sync = engine(store.clone());

    let report = sync
        .sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.orphans_removed, 0);
    assert_eq!(report.written, 5);
    assert_eq!(app_calendars(&store).len(), 2);
}

#[tokio::test]
async fn stale_identifier_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let prefs = MemoryPreferences::new();
    prefs.set(CALENDAR_IDENTIFIER_KEY, "gone-since-reinstall").unwrap();
    let sync = CalendarSync::new(store.clone(), prefs, settings());

    sync.sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(app_calendars(&store).len(), 1);
}

#[tokio::test]
async fn empty_meeting_list_leaves_an_empty_calendar() {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());

    let report = sync.sync_meetings(&[], &CancelToken::new()).await.unwrap();
    assert_eq!(report.written, 0);
    assert_eq!(app_calendars(&store).len(), 1);
    assert_eq!(store.event_count(), 0);
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = sync.sync_meetings(&week_of_meetings(), &cancel).await;
    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(store.mutations().is_empty());
}

/// Delegates to a `MemoryStore` and cancels a token after a number of event writes.
struct CancelAfterWrites {
    inner: Arc<MemoryStore>,
    token: CancelToken,
    after: usize,
    writes: AtomicUsize,
}

#[async_trait]
impl CalendarStore for CancelAfterWrites {
    async fn request_access(&self, kind: EntityKind) -> StoreResult<bool> {
        self.inner.request_access(kind).await
    }

    async fn find_container(&self, identifier: &str) -> StoreResult<Option<Container>> {
        self.inner.find_container(identifier).await
    }

    async fn list_containers(&self, kind: EntityKind) -> StoreResult<Vec<Container>> {
        self.inner.list_containers(kind).await
    }

    async fn sources(&self) -> StoreResult<Vec<Source>> {
        self.inner.sources().await
    }

    async fn default_source(&self, kind: EntityKind) -> StoreResult<Option<Source>> {
        self.inner.default_source(kind).await
    }

    async fn create_container(&self, container: NewContainer) -> StoreResult<Container> {
        self.inner.create_container(container).await
    }

    async fn delete_container(&self, container: &Container) -> StoreResult<()> {
        self.inner.delete_container(container).await
    }

    async fn create_event(&self, container: &Container, event: &NewEvent) -> StoreResult<()> {
        let result = self.inner.create_event(container, event).await;
        if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
            self.token.cancel();
        }
        result
    }

    async fn reminders(&self) -> StoreResult<Vec<Reminder>> {
        self.inner.reminders().await
    }

    async fn default_reminder_list(&self) -> StoreResult<Option<Container>> {
        self.inner.default_reminder_list().await
    }

    async fn save_reminder(&self, reminder: &Reminder) -> StoreResult<()> {
        self.inner.save_reminder(reminder).await
    }
}

#[tokio::test]
async fn cancellation_stops_between_writes_and_releases_the_lock() {
    let memory = Arc::new(MemoryStore::new());
    let cancel = CancelToken::new();
    let store = Arc::new(CancelAfterWrites {
        inner: memory.clone(),
        token: cancel.clone(),
        after: 2,
        writes: AtomicUsize::new(0),
    });
    let sync = CalendarSync::new(store, MemoryPreferences::new(), settings());

    let result = sync.sync_meetings(&week_of_meetings(), &cancel).await;
    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(memory.event_count(), 2);

    let removed = sync
        .delete_synced_calendar(&CancelToken::new())
        .await
        .unwrap();
    assert!(removed);
    assert!(app_calendars(&memory).is_empty());
}

#[tokio::test]
async fn delete_removes_only_the_synced_calendar() {
    let store = Arc::new(MemoryStore::new());
    let family = store.insert_container("Family", None);
    let sync = engine(store.clone());

    assert!(!sync.delete_synced_calendar(&CancelToken::new()).await.unwrap());

    sync.sync_meetings(&week_of_meetings(), &CancelToken::new())
        .await
        .unwrap();
    // An orphan created after the sync is not the remembered calendar
    let orphan = store.insert_container("ACRA du 09/09", None);

    assert!(sync.delete_synced_calendar(&CancelToken::new()).await.unwrap());
    assert_eq!(store.event_count(), 0);

    let remaining: Vec<String> = store
        .event_containers()
        .into_iter()
        .map(|c| c.identifier)
        .collect();
    assert_eq!(remaining, vec![family.identifier, orphan.identifier]);

    assert!(!sync.delete_synced_calendar(&CancelToken::new()).await.unwrap());
}

#[tokio::test]
async fn reminder_reuses_open_reminder_with_same_title() {
    let store = Arc::new(MemoryStore::new());
    let sync = engine(store.clone());
    let first_alarm = Utc.with_ymd_and_hms(2025, 6, 27, 9, 0, 0).unwrap();
    let second_alarm = Utc.with_ymd_and_hms(2025, 6, 30, 9, 0, 0).unwrap();

    let created = sync
        .add_reminder("Saisir son ACRA", "Fin de mois", first_alarm)
        .await
        .unwrap();
    let updated = sync
        .add_reminder("Saisir son ACRA", "Dernier rappel", second_alarm)
        .await
        .unwrap();

    assert_eq!(created.identifier, updated.identifier);
    assert_eq!(updated.alarms, vec![first_alarm, second_alarm]);
    assert_eq!(updated.notes.as_deref(), Some("Dernier rappel"));

    let list = store.default_reminder_list().await.unwrap().unwrap();
    assert_eq!(updated.list, Some(list.identifier));
    assert_eq!(store.stored_reminders().len(), 1);
}

#[tokio::test]
async fn completed_reminder_is_not_reused() {
    let store = Arc::new(MemoryStore::new());
    let mut done = Reminder::new("Saisir son ACRA");
    done.completed = true;
    store.save_reminder(&done).await.unwrap();

    let sync = engine(store.clone());
    let fresh = sync
        .add_reminder(
            "Saisir son ACRA",
            "",
            Utc.with_ymd_and_hms(2025, 7, 31, 9, 0, 0).unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(fresh.identifier, done.identifier);
    assert_eq!(store.stored_reminders().len(), 2);
}

#[tokio::test]
async fn reminder_needs_reminder_access() {
    let store = Arc::new(MemoryStore::new());
    store.deny_access(EntityKind::Reminder);
    let sync = engine(store.clone());

    let result = sync
        .add_reminder("Saisir son ACRA", "", Utc::now())
        .await;
    assert!(matches!(
        result,
        Err(SyncError::AccessDenied(EntityKind::Reminder))
    ));
    assert!(store.stored_reminders().is_empty());
}
