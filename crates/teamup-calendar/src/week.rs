//! Calendar-week helpers (weeks start on Monday).

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// German weekday names, Monday first.
pub const WEEKDAYS_DE: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];

/// Monday of the week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sunday of the week containing `date`.
pub fn sunday_of(date: NaiveDate) -> NaiveDate {
    monday_of(date) + Duration::days(6)
}

/// Localized weekday name of a timestamp.
pub fn weekday_name(dt: &NaiveDateTime) -> &'static str {
    WEEKDAYS_DE[dt.weekday().num_days_from_monday() as usize]
}

/// `H:MM`, hour without leading zero.
pub fn clock_time(dt: &NaiveDateTime) -> String {
    dt.format("%-H:%M").to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monday_of_midweek() {
        // 2024-06-05 is a Wednesday
        assert_eq!(monday_of(date(2024, 6, 5)), date(2024, 6, 3));
        assert_eq!(sunday_of(date(2024, 6, 5)), date(2024, 6, 9));
    }

    #[test]
    fn test_monday_and_sunday_edges() {
        assert_eq!(monday_of(date(2024, 6, 3)), date(2024, 6, 3));
        assert_eq!(monday_of(date(2024, 6, 9)), date(2024, 6, 3));
        assert_eq!(monday_of(date(2024, 6, 10)), date(2024, 6, 10));
    }

    #[test]
    fn test_week_across_year_boundary() {
        // 2025-01-01 is a Wednesday
        assert_eq!(monday_of(date(2025, 1, 1)), date(2024, 12, 30));
        assert_eq!(sunday_of(date(2025, 1, 1)), date(2025, 1, 5));
    }

    #[test]
    fn test_weekday_name_and_clock_time() {
        let monday = date(2024, 6, 3).and_hms_opt(8, 5, 0).unwrap();
        let sunday = date(2024, 6, 9).and_hms_opt(18, 30, 0).unwrap();

        assert_eq!(weekday_name(&monday), "Montag");
        assert_eq!(weekday_name(&sunday), "Sonntag");
        assert_eq!(clock_time(&monday), "8:05");
        assert_eq!(clock_time(&sunday), "18:30");
    }
}
