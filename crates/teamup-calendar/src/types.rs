//! Teamup API types and the cached event record.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::TeamupError;

/// Recurrence marker an event must carry to be cached.
pub const WEEKLY_RRULE: &str = "FREQ=WEEKLY";

/// One row of the weekly snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Storage-assigned id, only stable until the next refresh.
    pub id: i64,
    /// Teamup event id up to the first `-`; stable across refreshes.
    pub event_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub title: String,
    pub location: String,
    pub trainer: String,
    pub contact: String,
    pub age: String,
}

/// An event ready to be inserted; storage assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub event_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub title: String,
    pub location: String,
    pub trainer: String,
    pub contact: String,
    pub age: String,
}

// API Response Types

/// Teamup event as returned by `GET /{calendar}/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEvent {
    pub id: String,
    pub start_dt: String,
    pub end_dt: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub who: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rrule: Option<String>,
    #[serde(default)]
    pub subcalendar_ids: Vec<i64>,
}

impl ApiEvent {
    /// Series part of the id (`"1234567-rid-1717394400"` gives `"1234567"`).
    pub fn series_id(&self) -> &str {
        self.id.split('-').next().unwrap_or_default()
    }

    /// Whether the recurrence rule describes a weekly series.
    pub fn is_weekly(&self) -> bool {
        self.rrule
            .as_deref()
            .is_some_and(|rule| rule.contains(WEEKLY_RRULE))
    }
}

/// API response for the event list.
#[derive(Debug, Deserialize)]
pub struct EventListResponse {
    #[serde(default)]
    pub events: Vec<ApiEvent>,
}

/// Sub-calendar entry (a location or group).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSubcalendar {
    pub id: i64,
    pub name: String,
}

/// API response for the sub-calendar directory.
#[derive(Debug, Deserialize)]
pub struct SubcalendarListResponse {
    #[serde(default)]
    pub subcalendars: Vec<ApiSubcalendar>,
}

/// Parse a Teamup timestamp into the event's wall-clock time.
///
/// Teamup sends RFC 3339 with the calendar's offset; the offset is dropped.
pub fn parse_event_time(value: &str) -> Result<NaiveDateTime, TeamupError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| TeamupError::InvalidEventData(format!("bad timestamp {:?}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_event_from_api_json() {
        let json = r#"{
            "id": "1234567-rid-1717394400",
            "series_id": 1234567,
            "start_dt": "2024-06-03T18:00:00+02:00",
            "end_dt": "2024-06-03T19:30:00+02:00",
            "title": "Yoga",
            "who": "J. Doe",
            "notes": "<p>Erwachsene bring a mat</p>",
            "rrule": "FREQ=WEEKLY;BYDAY=MO",
            "subcalendar_ids": [11, 12]
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "1234567-rid-1717394400");
        assert_eq!(event.series_id(), "1234567");
        assert_eq!(event.subcalendar_ids, vec![11, 12]);
        assert!(event.is_weekly());
    }

    #[test]
    fn test_null_fields_default() {
        let json = r#"{
            "id": "99",
            "start_dt": "2024-06-03T18:00:00Z",
            "end_dt": "2024-06-03T19:00:00Z",
            "title": null,
            "notes": null,
            "rrule": ""
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();

        assert!(event.title.is_none());
        assert!(event.subcalendar_ids.is_empty());
        assert!(!event.is_weekly());
    }

    #[test]
    fn test_daily_rule_is_not_weekly() {
        let json = r#"{"id": "1", "start_dt": "x", "end_dt": "y", "rrule": "FREQ=DAILY;INTERVAL=1"}"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(!event.is_weekly());
    }

    #[test]
    fn test_parse_event_time_keeps_wall_clock() {
        let parsed = parse_event_time("2024-06-03T18:00:00+02:00").unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_event_time_accepts_naive() {
        assert!(parse_event_time("2024-06-03T18:00:00").is_ok());
        assert!(parse_event_time("2024-06-03 18:00:00").is_ok());
        assert!(matches!(
            parse_event_time("next monday"),
            Err(TeamupError::InvalidEventData(_))
        ));
    }

    #[test]
    fn test_subcalendar_list() {
        let json = r#"{"subcalendars": [{"id": 1, "name": "Hall A", "active": true}]}"#;
        let resp: SubcalendarListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.subcalendars.len(), 1);
        assert_eq!(resp.subcalendars[0].name, "Hall A");
    }
}
