//! HTML output for the `[teamup]` template tag.

use std::fmt::Write as _;

use chrono::{Local, NaiveDate};

use crate::cache::ScheduleCache;
use crate::client::CalendarSource;
use crate::db::StoreResult;
use crate::notes::{escape_html, strip_tags};
use crate::shortcode::TemplateTag;
use crate::types::EventRecord;
use crate::week::{clock_time, weekday_name};

const TABLE_HEAD: &str = concat!(
    r#"<table class="exercises"><thead>"#,
    r#"<th style="width: 10%;">WOCHENTAG</th>"#,
    r#"<th style="width: 12%;">UHRZEIT</th>"#,
    r#"<th style="width: 25%;">ANGEBOT</th>"#,
    r#"<th style="width: 15%;">ORT</th>"#,
    r#"<th style="width: 20%;">ÜBUNGSLEITER</th>"#,
    r#"<th style="width: 16%;">KONTAKT</th>"#,
    "</thead><tbody>",
);

const TABLE_TAIL: &str = "</tbody></table>";

/// `H:MM - H:MM Uhr`
fn time_range(event: &EventRecord) -> String {
    format!(
        "{} - {} Uhr",
        clock_time(&event.start_time),
        clock_time(&event.end_time)
    )
}

/// Full weekly table, one row per event in the given order.
pub fn calendar_table(events: &[EventRecord]) -> String {
    let mut html = String::from(TABLE_HEAD);
    for event in events {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            weekday_name(&event.start_time),
            time_range(event),
            strip_tags(&event.title),
            strip_tags(&event.location),
            strip_tags(&event.trainer),
            strip_tags(&event.contact),
        );
    }
    html.push_str(TABLE_TAIL);
    html
}

/// Summary of one event: training time, place and trainer.
pub fn event_fragment(event: &EventRecord) -> String {
    format!(
        concat!(
            "<p><strong>TRAININGSZEIT:</strong></p>",
            "<p><time>{}: {}</time></p>",
            "<p><strong>TRAININGSORT:</strong></p>",
            "<p>{}</p>",
            "<p><strong>ÜBUNGSLEITENDE:</strong></p>",
            "<p>{}</p>",
        ),
        weekday_name(&event.start_time),
        time_range(event),
        escape_html(&event.location),
        escape_html(&event.trainer),
    )
}

/// Lookup key of an event reference such as `"42-20240101T090000Z"`.
///
/// Only the part before the first `-` counts.
pub fn event_key(event_ref: &str) -> &str {
    event_ref.split('-').next().unwrap_or_default().trim()
}

/// Renders cached events, refreshing the cache first when the week changed.
pub struct Renderer<S> {
    cache: ScheduleCache<S>,
}

impl<S: CalendarSource> Renderer<S> {
    pub fn new(cache: ScheduleCache<S>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ScheduleCache<S> {
        &self.cache
    }

    /// Dispatch a template tag to its view.
    pub async fn render(&self, tag: &TemplateTag) -> String {
        self.render_on(tag, Local::now().date_naive()).await
    }

    pub async fn render_on(&self, tag: &TemplateTag, today: NaiveDate) -> String {
        match tag {
            TemplateTag::CalendarView => self.render_calendar_on(today).await,
            TemplateTag::EventView { event_ref } => self.render_event_on(event_ref, today).await,
        }
    }

    pub async fn render_calendar(&self) -> String {
        self.render_calendar_on(Local::now().date_naive()).await
    }

    pub async fn render_calendar_on(&self, today: NaiveDate) -> String {
        self.cache.ensure_fresh_on(today).await;

        let events = self.cache.store().query_all().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read cached events");
            Vec::new()
        });
        calendar_table(&events)
    }

    pub async fn render_event(&self, event_ref: &str) -> String {
        self.render_event_on(event_ref, Local::now().date_naive()).await
    }

    /// Empty string when the reference matches no cached event.
    pub async fn render_event_on(&self, event_ref: &str, today: NaiveDate) -> String {
        self.cache.ensure_fresh_on(today).await;

        let key = event_key(event_ref);
        if key.is_empty() {
            tracing::debug!(event_ref, "Empty event reference");
            return String::new();
        }

        match self.find_event(key) {
            Ok(Some(event)) => event_fragment(&event),
            Ok(None) => {
                tracing::debug!(key, "No cached event for reference");
                String::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, key, "Failed to read cached event");
                String::new()
            }
        }
    }

    /// Teamup event id first; a numeric key falls back to the storage id.
    fn find_event(&self, key: &str) -> StoreResult<Option<EventRecord>> {
        let store = self.cache.store();
        if let Some(event) = store.find_by_event_id(key)? {
            return Ok(Some(event));
        }
        match key.parse::<i64>() {
            Ok(id) => store.find(id),
            Err(_) => Ok(None),
        }
    }
}
