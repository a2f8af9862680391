// 👤 Role Profile Builder - per-person fingerprint of what the work actually was
//
// Classifies a person's entries, aggregates them per domain type, ranks the
// matched keywords and scores how evenly hours spread across domains.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::aggregate::{aggregate, Dimension, GroupBy, KeyPart};
use crate::bucket::Granularity;
use crate::classifier::classify;
use crate::entry::TimeEntry;
use crate::error::{check_date_range, Result};
use crate::lexicon::{DomainType, Lexicon};
use crate::trend::{normalize, series_from_aggregation, TimePoint, TimeSeries, TrendMode, TrendQuery};

/// Number of keywords quoted in the summary
const SUMMARY_KEYWORDS: usize = 3;

// ============================================================================
// PROFILE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    pub category: String,
    pub hours: f64,
    pub count: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub term: String,
    pub hours: f64,
    pub count: usize,
}

/// Conditions worth reporting that do not fail the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProfileWarning {
    /// No entries remained after filtering by person and date range
    EmptyResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub person: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub total_hours: f64,
    pub task_count: usize,
    pub tasks_with_comments: usize,

    /// Sorted by hours descending, then category name
    pub domain_distribution: Vec<DistributionRow>,
    pub activity_distribution: Vec<DistributionRow>,

    /// Sorted by hours descending, count descending, then term
    pub keyword_frequency: Vec<KeywordRow>,

    /// Normalized Shannon entropy of domain hours, in [0, 1]
    pub diversity_score: f64,

    pub summary: Vec<String>,

    /// First and last entry dates in the profile
    pub observed_range: Option<(NaiveDate, NaiveDate)>,

    /// Gap-filled monthly hours
    pub monthly_activity: TimeSeries,

    /// This person's entries that were malformed and left out
    pub skipped_entries: usize,

    pub warnings: Vec<ProfileWarning>,
}

impl PersonProfile {
    pub fn is_empty(&self) -> bool {
        self.task_count == 0
    }

    pub fn distribution(&self, domain_type: DomainType) -> &[DistributionRow] {
        match domain_type {
            DomainType::TechnicalDomain => &self.domain_distribution,
            DomainType::ActivityType => &self.activity_distribution,
        }
    }

    /// SHA-256 over the full profile contents; equal profiles share a fingerprint
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// BUILD
// ============================================================================

/// Build the role profile of `person` over an optional inclusive date range
pub fn build_profile(
    entries: &[TimeEntry],
    lexicon: &Lexicon,
    person: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<PersonProfile> {
    check_date_range(start_date, end_date)?;

    let person = person.trim();
    let mut selected: Vec<TimeEntry> = Vec::new();
    let mut skipped_entries = 0;
    let mut observed_range: Option<(NaiveDate, NaiveDate)> = None;

    for entry in entries.iter().filter(|e| e.person.trim() == person) {
        let valid = match entry.validate() {
            Ok(valid) => valid,
            Err(error) => {
                debug!(person, %error, "excluding malformed entry from profile");
                skipped_entries += 1;
                continue;
            }
        };

        let date = valid.date();
        if start_date.is_some_and(|start| date < start) || end_date.is_some_and(|end| date > end) {
            continue;
        }

        observed_range = Some(match observed_range {
            Some((first, last)) => (first.min(date), last.max(date)),
            None => (date, date),
        });
        selected.push(entry.clone());
    }

    let classify_fn = |e: &TimeEntry| classify(e.comment_text(), lexicon);

    let total_hours: f64 = selected.iter().map(|e| e.duration_minutes / 60.0).sum();
    let task_count = selected.len();
    let tasks_with_comments = selected.iter().filter(|e| e.comment_text().is_some()).count();

    let domain_distribution = distribution(&selected, &classify_fn, DomainType::TechnicalDomain);
    let activity_distribution = distribution(&selected, &classify_fn, DomainType::ActivityType);
    let keyword_frequency = keyword_frequency(&selected, &classify_fn);
    let diversity_score = diversity(&domain_distribution);

    let monthly_agg = aggregate(&selected, classify_fn, &GroupBy::new(vec![Dimension::Bucket(Granularity::Month)]));
    let series = series_from_aggregation(&monthly_agg)
        .map(|(series, _)| series)
        .unwrap_or_default();
    let query = TrendQuery::new(Granularity::Month, TrendMode::Absolute).with_range(start_date, end_date);
    let monthly_activity = match normalize(&series, &query)?.into_values().next() {
        Some(activity) => activity,
        None => idle_months(start_date, end_date),
    };

    let mut warnings = Vec::new();
    if task_count == 0 {
        warn!(person, ?start_date, ?end_date, "no entries left after filtering; profile is empty");
        warnings.push(ProfileWarning::EmptyResult);
    }

    let mut profile = PersonProfile {
        person: person.to_string(),
        start_date,
        end_date,
        total_hours,
        task_count,
        tasks_with_comments,
        domain_distribution,
        activity_distribution,
        keyword_frequency,
        diversity_score,
        summary: Vec::new(),
        observed_range,
        monthly_activity,
        skipped_entries,
        warnings,
    };
    profile.summary = summary_bullets(&profile);

    debug!(
        person,
        tasks = profile.task_count,
        hours = profile.total_hours,
        diversity = profile.diversity_score,
        "profile built"
    );

    Ok(profile)
}

/// Zero-valued months covering a bounded range; empty when unbounded
fn idle_months(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> TimeSeries {
    let (Some(start), Some(end)) = (start_date, end_date) else {
        return TimeSeries::default();
    };

    TimeSeries {
        points: Granularity::Month
            .range(start, end)
            .into_iter()
            .map(|bucket_start| TimePoint { bucket_start, value: 0.0 })
            .collect(),
    }
}

fn distribution<F>(entries: &[TimeEntry], classify_fn: &F, domain_type: DomainType) -> Vec<DistributionRow>
where
    F: Fn(&TimeEntry) -> crate::classifier::Classification,
{
    let group_by = GroupBy::new(vec![Dimension::Category(domain_type)]);
    let groups = aggregate(entries, classify_fn, &group_by).groups();

    let mut rows: Vec<DistributionRow> = groups
        .into_iter()
        .filter_map(|(key, group)| match key.into_iter().next() {
            Some(KeyPart::Label(category)) => Some(DistributionRow {
                category,
                hours: group.hours,
                count: group.count,
                percentage: group.percentage.unwrap_or(0.0),
            }),
            _ => None,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.hours
            .total_cmp(&a.hours)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows
}

/// Alias terms ranked by cumulative hours. Each matched term receives the
/// entry's full hours and one occurrence.
fn keyword_frequency<F>(entries: &[TimeEntry], classify_fn: &F) -> Vec<KeywordRow>
where
    F: Fn(&TimeEntry) -> crate::classifier::Classification,
{
    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for entry in entries {
        let hours = entry.duration_minutes / 60.0;
        for term in classify_fn(entry).terms {
            let slot = totals.entry(term).or_insert((0.0, 0));
            slot.0 += hours;
            slot.1 += 1;
        }
    }

    let mut rows: Vec<KeywordRow> = totals
        .into_iter()
        .map(|(term, (hours, count))| KeywordRow { term, hours, count })
        .collect();

    rows.sort_by(|a, b| {
        b.hours
            .total_cmp(&a.hours)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.term.cmp(&b.term))
    });
    rows
}

/// Normalized Shannon entropy over categories with nonzero hours.
/// 0 for a single category or none.
pub fn diversity(rows: &[DistributionRow]) -> f64 {
    let hours: Vec<f64> = rows.iter().map(|r| r.hours).filter(|h| *h > 0.0).collect();
    if hours.len() <= 1 {
        return 0.0;
    }

    let total: f64 = hours.iter().sum();
    let entropy: f64 = hours
        .iter()
        .map(|h| {
            let p = h / total;
            -p * p.ln()
        })
        .sum();

    (entropy / (hours.len() as f64).ln()).clamp(0.0, 1.0)
}

fn summary_bullets(profile: &PersonProfile) -> Vec<String> {
    if profile.is_empty() {
        return vec![format!(
            "No time entries recorded for {} in the selected period",
            profile.person
        )];
    }

    let mut bullets = Vec::new();

    if let Some(top) = profile.domain_distribution.first() {
        bullets.push(format!(
            "Primary technical domain: {} ({:.1}% of time)",
            top.category, top.percentage
        ));
    }

    if let Some(top) = profile.activity_distribution.first() {
        bullets.push(format!(
            "Primary activity type: {} ({:.1}% of time)",
            top.category, top.percentage
        ));
    }

    if !profile.keyword_frequency.is_empty() {
        let quoted: Vec<String> = profile
            .keyword_frequency
            .iter()
            .take(SUMMARY_KEYWORDS)
            .map(|k| format!("{} ({:.1}h)", k.term, k.hours))
            .collect();
        bullets.push(format!("Top keywords: {}", quoted.join(", ")));
    }

    bullets.push(format!(
        "Completed {} tasks over {:.1} hours (avg {:.1}h per task)",
        profile.task_count,
        profile.total_hours,
        profile.total_hours / profile.task_count as f64
    ));

    let active_domains = profile
        .domain_distribution
        .iter()
        .filter(|r| r.hours > 0.0)
        .count();
    bullets.push(format!(
        "Domain diversity: {:.2} across {} categories",
        profile.diversity_score, active_domains
    ));

    bullets
}
