// 🕒 Time Entries - ingest records, timestamp parsing and per-entry validation

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::MalformedEntryError;

/// One time-tracking record as handed over by the data loader.
/// Immutable once ingested; timestamps stay raw until validation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimeEntry {
    #[serde(rename = "person", alias = "activity name", default)]
    pub person: String,

    #[serde(default)]
    pub team: Option<String>,

    #[serde(rename = "category", alias = "categories", default)]
    pub category: String,

    #[serde(rename = "start", alias = "time started")]
    pub start: String,

    #[serde(rename = "end", alias = "time ended", default)]
    pub end: String,

    #[serde(rename = "duration_minutes", alias = "duration minutes")]
    pub duration_minutes: f64,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub tags: Option<String>,
}

/// Formats accepted for start/end timestamps, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a naive (local) timestamp. Date-only values land on midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    // RFC 3339 with offset: keep the wall-clock time as given
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// A TimeEntry whose required fields passed validation
#[derive(Debug, Clone, Copy)]
pub struct ValidEntry<'a> {
    pub entry: &'a TimeEntry,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub hours: f64,
}

impl<'a> ValidEntry<'a> {
    pub fn person(&self) -> &'a str {
        self.entry.person.trim()
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

impl TimeEntry {
    /// Check required fields and resolve timestamps
    pub fn validate(&self) -> std::result::Result<ValidEntry<'_>, MalformedEntryError> {
        if self.person.trim().is_empty() {
            return Err(MalformedEntryError::MissingPerson);
        }

        if !self.duration_minutes.is_finite() {
            return Err(MalformedEntryError::NonFiniteDuration);
        }

        if self.duration_minutes < 0.0 {
            return Err(MalformedEntryError::NegativeDuration(self.duration_minutes));
        }

        let start = parse_timestamp(&self.start).ok_or_else(|| {
            MalformedEntryError::InvalidTimestamp {
                field: "start",
                value: self.start.clone(),
            }
        })?;

        let end = parse_timestamp(&self.end).ok_or_else(|| MalformedEntryError::InvalidTimestamp {
            field: "end",
            value: self.end.clone(),
        })?;

        if end < start {
            return Err(MalformedEntryError::EndBeforeStart {
                start: self.start.clone(),
                end: self.end.clone(),
            });
        }

        Ok(ValidEntry {
            entry: self,
            start,
            end,
            hours: self.duration_minutes / 60.0,
        })
    }

    /// Comment text, if present and not blank
    pub fn comment_text(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

/// Entries read from a CSV export plus rows that could not be decoded
#[derive(Debug, Default)]
pub struct LoadedEntries {
    pub entries: Vec<TimeEntry>,
    pub rejected_rows: Vec<(usize, String)>,
}

/// Load time entries from a CSV file. Undecodable rows are reported, not fatal.
pub fn load_csv(csv_path: &Path) -> Result<LoadedEntries> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let mut loaded = LoadedEntries::default();

    for (index, result) in rdr.deserialize::<TimeEntry>().enumerate() {
        match result {
            Ok(entry) => loaded.entries.push(entry),
            Err(err) => {
                // Header is line 1, first record is line 2
                let line = index + 2;
                warn!(line, error = %err, "skipping undecodable CSV row");
                loaded.rejected_rows.push((line, err.to_string()));
            }
        }
    }

    debug!(
        path = ?csv_path,
        entries = loaded.entries.len(),
        rejected = loaded.rejected_rows.len(),
        "loaded time entries"
    );

    Ok(loaded)
}

#[cfg(test)]
pub(crate) fn entry(person: &str, start: &str, minutes: f64, comment: Option<&str>) -> TimeEntry {
    let end = parse_timestamp(start)
        .map(|s| (s + chrono::Duration::seconds((minutes.max(0.0) * 60.0) as i64)).to_string())
        .unwrap_or_else(|| start.to_string());

    TimeEntry {
        person: person.to_string(),
        team: None,
        category: "Work".to_string(),
        start: start.to_string(),
        end,
        duration_minutes: minutes,
        comment: comment.map(str::to_string),
        tags: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2024-03-05 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 09:30"), Some(expected));
        assert_eq!(parse_timestamp("03/05/2024 09:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T09:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_validate_good_entry() {
        let e = entry("Alice", "2024-01-10 09:00:00", 90.0, Some("api work"));
        let valid = e.validate().unwrap();

        assert_eq!(valid.person(), "Alice");
        assert_eq!(valid.hours, 1.5);
        assert_eq!(valid.date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn test_validate_rejects_bad_rows() {
        let mut missing_person = entry("", "2024-01-10 09:00:00", 30.0, None);
        missing_person.person = "   ".to_string();
        assert_eq!(
            missing_person.validate().unwrap_err(),
            MalformedEntryError::MissingPerson
        );

        let negative = entry("Bob", "2024-01-10 09:00:00", -5.0, None);
        assert_eq!(
            negative.validate().unwrap_err(),
            MalformedEntryError::NegativeDuration(-5.0)
        );

        let mut bad_start = entry("Bob", "2024-01-10 09:00:00", 5.0, None);
        bad_start.start = "not a date".to_string();
        assert!(matches!(
            bad_start.validate().unwrap_err(),
            MalformedEntryError::InvalidTimestamp { field: "start", .. }
        ));

        let mut backwards = entry("Bob", "2024-01-10 09:00:00", 5.0, None);
        backwards.end = "2024-01-09 09:00:00".to_string();
        assert!(matches!(
            backwards.validate().unwrap_err(),
            MalformedEntryError::EndBeforeStart { .. }
        ));

        let nan = entry("Bob", "2024-01-10 09:00:00", f64::NAN, None);
        assert_eq!(nan.validate().unwrap_err(), MalformedEntryError::NonFiniteDuration);
    }

    #[test]
    fn test_comment_text_ignores_blank() {
        let blank = entry("Alice", "2024-01-10 09:00:00", 10.0, Some("   "));
        assert_eq!(blank.comment_text(), None);

        let filled = entry("Alice", "2024-01-10 09:00:00", 10.0, Some(" review "));
        assert_eq!(filled.comment_text(), Some("review"));
    }

    #[test]
    fn test_load_csv_with_tracker_export_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "activity name,time started,time ended,duration minutes,categories,comment"
        )
        .unwrap();
        writeln!(
            file,
            "Alice,2024-01-10 09:00:00,2024-01-10 10:00:00,60,Work,API integration"
        )
        .unwrap();
        writeln!(file, "Bob,2024-01-11 09:00:00,2024-01-11 09:30:00,30,Work,").unwrap();
        writeln!(file, "Carol,2024-01-12 09:00:00,2024-01-12 09:30:00,lots,Work,x").unwrap();

        let loaded = load_csv(file.path()).unwrap();

        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].person, "Alice");
        assert_eq!(loaded.entries[0].comment.as_deref(), Some("API integration"));
        assert_eq!(loaded.entries[1].comment, None);
        assert_eq!(loaded.rejected_rows.len(), 1);
        assert_eq!(loaded.rejected_rows[0].0, 4);
    }
}
