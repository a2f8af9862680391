// Time Analytics - Core Library
// Categorization, aggregation and trend normalization over time-tracking entries.
// Exposes all modules for use in the CLI and tests.

pub mod error;
pub mod entry;
pub mod bucket;
pub mod lexicon;     // Category rules + implicit Uncategorized
pub mod classifier;  // comment → weights per domain type
pub mod aggregate;   // weighted sums over group keys
pub mod trend;       // gap-filled, normalized time series
pub mod profile;     // per-person role profile
pub mod teams;
pub mod config;
pub mod export;

// Re-export commonly used types
pub use error::{AnalyticsError, LexiconError, MalformedEntryError, Result};
pub use entry::{load_csv, parse_timestamp, LoadedEntries, TimeEntry, ValidEntry};
pub use bucket::Granularity;
pub use lexicon::{
    default_rules, normalize_text, CategoryRule, DomainType, Lexicon, RuleDefinition, UNCATEGORIZED,
};
pub use classifier::{classify, CategoryWeights, Classification};
pub use aggregate::{
    aggregate, Aggregation, Dimension, Group, GroupBy, GroupKey, KeyPart, SkippedEntry, Totals,
    WeightSelector, UNASSIGNED_TEAM,
};
#[cfg(feature = "parallel")]
pub use aggregate::aggregate_parallel;
pub use trend::{
    normalize, series_from_aggregation, SeriesByGroup, TimePoint, TimeSeries, TrendMode, TrendQuery,
};
pub use profile::{build_profile, DistributionRow, KeywordRow, PersonProfile, ProfileWarning};
pub use teams::{PersonHours, TeamHours, TeamMapping};
pub use config::AnalyticsConfig;
pub use export::{
    export_profile, group_label, summary_text, write_distribution_csv, write_keywords_csv,
    write_series_csv,
};

/// Validate category rules into a Lexicon
pub fn build_lexicon(rules: Vec<RuleDefinition>) -> std::result::Result<Lexicon, LexiconError> {
    Lexicon::build(rules)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
