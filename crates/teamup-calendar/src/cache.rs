//! Weekly cache coordinator.
//!
//! The snapshot in [`EventStore`] is valid for the calendar week whose Monday
//! is stored under [`LAST_FETCH_KEY`]. The first read after the week rolls
//! over triggers one refresh; fetch failures leave the previous snapshot in
//! place and are only logged.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::client::CalendarSource;
use crate::db::StoreResult;
use crate::error::TeamupError;
use crate::notes::{get_age, get_contact};
use crate::options::{OptionStore, DB_VERSION_KEY, LAST_FETCH_KEY};
use crate::store::EventStore;
use crate::types::{parse_event_time, ApiEvent, NewEvent};
use crate::week::{monday_of, sunday_of};

/// Schema version assumed when none was ever recorded.
const INITIAL_DB_VERSION: &str = "1.0.0";

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The snapshot already belongs to the current week.
    Fresh,
    /// A refresh ran and stored this many events.
    Refreshed(usize),
    /// A refresh was due but failed; the previous snapshot is served.
    Stale,
}

pub struct ScheduleCache<S> {
    source: S,
    calendar_id: String,
    store: EventStore,
    options: Arc<dyn OptionStore>,
}

impl<S: CalendarSource> ScheduleCache<S> {
    pub fn new(
        source: S,
        calendar_id: impl Into<String>,
        store: EventStore,
        options: Arc<dyn OptionStore>,
    ) -> Self {
        Self {
            source,
            calendar_id: calendar_id.into(),
            store,
            options,
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &Arc<dyn OptionStore> {
        &self.options
    }

    /// Make sure the snapshot covers the current local week.
    pub async fn ensure_fresh(&self) -> Freshness {
        self.ensure_fresh_on(Local::now().date_naive()).await
    }

    /// Make sure the snapshot covers the week containing `today`.
    pub async fn ensure_fresh_on(&self, today: NaiveDate) -> Freshness {
        let current_monday = monday_of(today);

        if self.freshness_marker() == Some(current_monday) {
            tracing::debug!(%current_monday, "Schedule cache is fresh");
            return Freshness::Fresh;
        }

        match self.refresh_on(today).await {
            Ok(count) => Freshness::Refreshed(count),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Schedule refresh failed, serving cached events"
                );
                Freshness::Stale
            }
        }
    }

    /// Refresh regardless of the marker, recording the week on success.
    pub async fn refresh_on(&self, today: NaiveDate) -> Result<usize, TeamupError> {
        let count = self.refresh_cycle(today).await?;
        let current_monday = monday_of(today);

        if let Err(e) = self
            .options
            .set(LAST_FETCH_KEY, &current_monday.format("%Y-%m-%d").to_string())
        {
            tracing::warn!(error = %e, "Failed to store freshness marker");
        }
        tracing::info!(count, %current_monday, "Refreshed weekly schedule");
        Ok(count)
    }

    /// Monday of the last successful refresh, if one is recorded.
    pub fn freshness_marker(&self) -> Option<NaiveDate> {
        let stored = match self.options.get(LAST_FETCH_KEY) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read freshness marker");
                return None;
            }
        };

        match NaiveDate::parse_from_str(&stored, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                tracing::warn!(value = %stored, "Ignoring malformed freshness marker");
                None
            }
        }
    }

    /// Fetch this week's recurring events and replace the stored snapshot.
    ///
    /// Returns the number of stored events.
    pub async fn refresh_cycle(&self, today: NaiveDate) -> Result<usize, TeamupError> {
        let monday = monday_of(today);
        let sunday = sunday_of(today);

        let directory = self.source.list_subcalendars(&self.calendar_id).await?;
        let events = self
            .source
            .list_events(&self.calendar_id, monday, sunday)
            .await?;

        let total = events.len();
        let mut rows = Vec::new();
        for event in events.into_iter().filter(ApiEvent::is_weekly) {
            if let Some(row) = to_new_event(event, &directory)? {
                rows.push(row);
            }
        }
        tracing::debug!(total, weekly = rows.len(), "Filtered weekly events");

        self.store.replace_snapshot(&rows)?;
        Ok(rows.len())
    }

    /// Recreate the events table when it was created by another version.
    ///
    /// Returns whether the table was rebuilt. The freshness marker is cleared
    /// on rebuild so the next read refetches.
    pub fn check_database(&self, version: &str) -> StoreResult<bool> {
        let stored = self.options.get_or(DB_VERSION_KEY, INITIAL_DB_VERSION)?;
        if stored == version {
            return Ok(false);
        }

        tracing::info!(from = %stored, to = %version, "Rebuilding schedule table");
        self.store.drop_table()?;
        self.store.create_table()?;
        self.options.delete(LAST_FETCH_KEY)?;
        self.options.set(DB_VERSION_KEY, version)?;
        Ok(true)
    }

    /// Erase every persisted trace: the events table and both options.
    pub fn uninstall(&self) -> StoreResult<()> {
        self.store.drop_table()?;
        self.options.delete(LAST_FETCH_KEY)?;
        self.options.delete(DB_VERSION_KEY)?;
        tracing::info!("Removed schedule table and options");
        Ok(())
    }
}

/// Turn one weekly API event into a storable row.
///
/// Events whose end is not after their start are dropped.
fn to_new_event(
    event: ApiEvent,
    directory: &HashMap<i64, String>,
) -> Result<Option<NewEvent>, TeamupError> {
    let event_id = event.series_id().to_string();
    let start_time = parse_event_time(&event.start_dt)?;
    let end_time = parse_event_time(&event.end_dt)?;

    if end_time <= start_time {
        tracing::warn!(event_id = %event.id, "Dropping event that ends before it starts");
        return Ok(None);
    }

    let location = event
        .subcalendar_ids
        .iter()
        .filter_map(|id| {
            let name = directory.get(id);
            if name.is_none() {
                tracing::debug!(event_id = %event.id, subcalendar = id, "Unknown sub-calendar");
            }
            name.map(String::as_str)
        })
        .collect::<Vec<_>>()
        .join(", ");

    let notes = event.notes.unwrap_or_default();

    Ok(Some(NewEvent {
        event_id,
        start_time,
        end_time,
        title: event.title.unwrap_or_default(),
        location,
        trainer: event.who.unwrap_or_default(),
        contact: get_contact(&notes),
        age: get_age(&notes),
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::db::Database;
    use crate::options::SqliteOptions;

    /// In-process calendar source that counts calls.
    #[derive(Default)]
    pub(crate) struct MockSource {
        pub subcalendars: HashMap<i64, String>,
        pub events: Mutex<Vec<ApiEvent>>,
        pub fail: bool,
        pub event_calls: AtomicUsize,
        pub last_window: Mutex<Option<(NaiveDate, NaiveDate)>>,
    }

    impl MockSource {
        pub(crate) fn with_events(events: Vec<ApiEvent>) -> Self {
            Self {
                subcalendars: HashMap::from([
                    (11, "Hall A".to_string()),
                    (12, "Pool".to_string()),
                ]),
                events: Mutex::new(events),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.event_calls.load(Ordering::SeqCst)
        }
    }

    impl CalendarSource for MockSource {
        async fn list_subcalendars(
            &self,
            _calendar_id: &str,
        ) -> Result<HashMap<i64, String>, TeamupError> {
            if self.fail {
                return Err(TeamupError::ApiError("503: maintenance".into()));
            }
            Ok(self.subcalendars.clone())
        }

        async fn list_events(
            &self,
            _calendar_id: &str,
            start_date: NaiveDate,
            end_date: NaiveDate,
        ) -> Result<Vec<ApiEvent>, TeamupError> {
            self.event_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_window.lock() = Some((start_date, end_date));
            Ok(self.events.lock().clone())
        }
    }

    pub(crate) fn api_event(id: &str, rrule: &str, day: u32, notes: &str) -> ApiEvent {
        ApiEvent {
            id: id.to_string(),
            start_dt: format!("2024-06-{:02}T18:00:00+02:00", day),
            end_dt: format!("2024-06-{:02}T19:30:00+02:00", day),
            title: Some(format!("Course {}", id)),
            who: Some("J. Doe".to_string()),
            notes: Some(notes.to_string()),
            rrule: Some(rrule.to_string()),
            subcalendar_ids: vec![11],
        }
    }

    pub(crate) fn cache_with(source: MockSource) -> ScheduleCache<MockSource> {
        let db = Database::in_memory().unwrap();
        let store = EventStore::new(db.clone()).unwrap();
        let options = Arc::new(SqliteOptions::new(db).unwrap());
        ScheduleCache::new(source, "ks123", store, options)
    }

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_keeps_only_weekly_events() {
        let cache = cache_with(MockSource::with_events(vec![
            api_event("1", "FREQ=WEEKLY;BYDAY=MO", 3, ""),
            api_event("2", "FREQ=WEEKLY;BYDAY=TU", 4, ""),
            api_event("3", "FREQ=DAILY;INTERVAL=1", 5, ""),
        ]));

        let stored = cache.refresh_cycle(date(2024, 6, 5)).await.unwrap();
        let rows = cache.store().query_all().unwrap();

        assert_eq!(stored, 2);
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Course 1", "Course 2"]);
    }

    #[tokio::test]
    async fn test_refresh_requests_monday_to_sunday() {
        let cache = cache_with(MockSource::with_events(vec![]));

        cache.refresh_cycle(date(2024, 6, 7)).await.unwrap();

        assert_eq!(
            *cache.source().last_window.lock(),
            Some((date(2024, 6, 3), date(2024, 6, 9)))
        );
    }

    #[tokio::test]
    async fn test_refresh_transforms_fields() {
        let mut event = api_event(
            "1234567-rid-1717430400",
            "FREQ=WEEKLY",
            3,
            "<p>Erwachsene bring a mat</p>",
        );
        event.subcalendar_ids = vec![11, 99, 12];
        let cache = cache_with(MockSource::with_events(vec![event]));

        cache.refresh_cycle(date(2024, 6, 3)).await.unwrap();
        let row = &cache.store().query_all().unwrap()[0];

        assert_eq!(row.event_id, "1234567");
        assert_eq!(row.location, "Hall A, Pool");
        assert_eq!(row.trainer, "J. Doe");
        assert_eq!(row.contact, "bring a mat");
        assert_eq!(row.age, "Erwachsene");
        assert_eq!(row.start_time.format("%H:%M").to_string(), "18:00");
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let cache = cache_with(MockSource::with_events(vec![
            api_event("1", "FREQ=WEEKLY", 3, "Kinder Tom"),
            api_event("2", "FREQ=WEEKLY", 6, ""),
        ]));

        cache.refresh_cycle(date(2024, 6, 3)).await.unwrap();
        let first = cache.store().query_all().unwrap();
        cache.refresh_cycle(date(2024, 6, 3)).await.unwrap();
        let second = cache.store().query_all().unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_inverted_event_is_dropped() {
        let mut event = api_event("1", "FREQ=WEEKLY", 3, "");
        event.end_dt = "2024-06-03T17:00:00+02:00".to_string();
        let cache = cache_with(MockSource::with_events(vec![
            event,
            api_event("2", "FREQ=WEEKLY", 4, ""),
        ]));

        assert_eq!(cache.refresh_cycle(date(2024, 6, 3)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_timestamp_fails_refresh_and_keeps_snapshot() {
        let cache = cache_with(MockSource::with_events(vec![api_event("1", "FREQ=WEEKLY", 3, "")]));
        cache.refresh_cycle(date(2024, 6, 3)).await.unwrap();

        let mut broken = api_event("2", "FREQ=WEEKLY", 4, "");
        broken.start_dt = "tomorrow".to_string();
        *cache.source().events.lock() = vec![broken];

        let result = cache.refresh_cycle(date(2024, 6, 3)).await;

        assert!(matches!(result, Err(TeamupError::InvalidEventData(_))));
        assert_eq!(cache.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_fresh_fetches_once_per_week() {
        let cache = cache_with(MockSource::with_events(vec![api_event("1", "FREQ=WEEKLY", 3, "")]));

        let first = cache.ensure_fresh_on(date(2024, 6, 4)).await;
        let second = cache.ensure_fresh_on(date(2024, 6, 6)).await;

        assert_eq!(first, Freshness::Refreshed(1));
        assert_eq!(second, Freshness::Fresh);
        assert_eq!(cache.source().calls(), 1);
        assert_eq!(cache.freshness_marker(), Some(date(2024, 6, 3)));
    }

    #[tokio::test]
    async fn test_ensure_fresh_refetches_next_week() {
        let cache = cache_with(MockSource::with_events(vec![]));

        cache.ensure_fresh_on(date(2024, 6, 9)).await;
        cache.ensure_fresh_on(date(2024, 6, 10)).await;

        assert_eq!(cache.source().calls(), 2);
        assert_eq!(cache.freshness_marker(), Some(date(2024, 6, 10)));
    }

    #[tokio::test]
    async fn test_empty_week_still_advances_marker() {
        let cache = cache_with(MockSource::with_events(vec![api_event("1", "FREQ=WEEKLY", 3, "")]));
        cache.ensure_fresh_on(date(2024, 6, 3)).await;

        *cache.source().events.lock() = vec![api_event("2", "FREQ=DAILY", 11, "")];
        let outcome = cache.ensure_fresh_on(date(2024, 6, 11)).await;

        assert_eq!(outcome, Freshness::Refreshed(0));
        assert!(cache.store().query_all().unwrap().is_empty());
        assert_eq!(cache.freshness_marker(), Some(date(2024, 6, 10)));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_marker_and_rows() {
        let cache = cache_with(MockSource::with_events(vec![api_event("1", "FREQ=WEEKLY", 3, "")]));
        cache.ensure_fresh_on(date(2024, 6, 3)).await;

        let failing = ScheduleCache::new(
            MockSource {
                fail: true,
                ..Default::default()
            },
            "ks123",
            cache.store().clone(),
            cache.options().clone(),
        );
        let outcome = failing.ensure_fresh_on(date(2024, 6, 12)).await;

        assert_eq!(outcome, Freshness::Stale);
        assert_eq!(failing.freshness_marker(), Some(date(2024, 6, 3)));
        assert_eq!(failing.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_marker_triggers_refresh() {
        let cache = cache_with(MockSource::with_events(vec![]));
        cache.options().set(LAST_FETCH_KEY, "last monday").unwrap();

        assert_eq!(cache.freshness_marker(), None);
        assert_eq!(
            cache.ensure_fresh_on(date(2024, 6, 3)).await,
            Freshness::Refreshed(0)
        );
    }

    #[tokio::test]
    async fn test_check_database_rebuilds_on_version_change() {
        let cache = cache_with(MockSource::with_events(vec![api_event("1", "FREQ=WEEKLY", 3, "")]));
        cache.ensure_fresh_on(date(2024, 6, 3)).await;

        assert!(cache.check_database("1.0.3").unwrap());
        assert!(cache.store().query_all().unwrap().is_empty());
        assert_eq!(cache.freshness_marker(), None);

        assert!(!cache.check_database("1.0.3").unwrap());
    }

    #[test]
    fn test_check_database_initial_version_is_current() {
        let cache = cache_with(MockSource::default());
        assert!(!cache.check_database("1.0.0").unwrap());
    }

    #[tokio::test]
    async fn test_uninstall_erases_everything() {
        let cache = cache_with(MockSource::with_events(vec![api_event("1", "FREQ=WEEKLY", 3, "")]));
        cache.ensure_fresh_on(date(2024, 6, 3)).await;
        cache.check_database("1.0.3").unwrap();

        cache.uninstall().unwrap();

        assert!(cache.store().query_all().is_err());
        assert!(cache.options().get(LAST_FETCH_KEY).unwrap().is_none());
        assert!(cache.options().get(DB_VERSION_KEY).unwrap().is_none());
    }
}
