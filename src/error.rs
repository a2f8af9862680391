// ⚠️ Error Taxonomy - structured failures for the analytics core
// Configuration errors are fatal, per-entry errors are absorbed and counted

use chrono::NaiveDate;
use thiserror::Error;

/// Malformed or ambiguous category configuration.
/// Fatal to Lexicon construction, never silently corrected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexiconError {
    #[error("Rule '{0}' has no aliases")]
    EmptyAliases(String),

    #[error("Rule '{rule}' has an alias that is blank after normalization: {alias:?}")]
    BlankAlias { rule: String, alias: String },

    #[error("Rule '{rule}' lists alias '{alias}' more than once")]
    RepeatedAlias { rule: String, alias: String },

    #[error("Rule name must not be empty")]
    EmptyName,

    #[error("Rule name '{0}' is reserved for the fallback category")]
    ReservedName(String),

    #[error("Rule '{rule}' has unknown domain type '{domain_type}' (expected technical_domain or activity_type)")]
    UnknownDomainType { rule: String, domain_type: String },

    #[error("Alias '{alias}' is declared by both '{first}' and '{second}' in {domain_type}")]
    DuplicateAlias {
        alias: String,
        domain_type: String,
        first: String,
        second: String,
    },
}

/// A single TimeEntry that cannot take part in aggregation.
/// Non-fatal: the entry is excluded and counted as skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedEntryError {
    #[error("Entry has no person")]
    MissingPerson,

    #[error("Unparseable {field} timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Negative duration: {0} minutes")]
    NegativeDuration(f64),

    #[error("Duration is not a finite number")]
    NonFiniteDuration,

    #[error("Entry ends ({end}) before it starts ({start})")]
    EndBeforeStart { start: String, end: String },
}

/// Errors surfaced by public entry points of the analytics core
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid lexicon: {0}")]
    InvalidLexicon(#[from] LexiconError),

    #[error("Start date {start} is after end date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error("Moving average window must be at least 1 (got {0})")]
    InvalidWindow(usize),

    #[error("Invalid team mapping: {0}")]
    InvalidTeamMapping(String),
}

/// Result type for the analytics core
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Reject a date range whose start comes after its end
pub fn check_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(AnalyticsError::DateRange { start, end }),
        _ => Ok(()),
    }
}
