// 📊 Aggregator - weighted group-by over classified time entries
//
// Each group keeps its contributions ordered by entry index and sums them on
// read, so partial aggregations merge in any order with bit-identical results.
// Percentages are derived only when groups are read out.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::bucket::Granularity;
use crate::classifier::Classification;
use crate::entry::{TimeEntry, ValidEntry};
use crate::error::MalformedEntryError;
use crate::lexicon::DomainType;

/// Team label for entries without a team
pub const UNASSIGNED_TEAM: &str = "Unassigned";

// ============================================================================
// GROUPING KEYS
// ============================================================================

/// One grouping dimension (a key-extraction function over an entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Person,
    Team,

    /// The category column recorded by the time tracker
    SourceCategory,

    /// Classified category; the entry is split by its weights in this domain type
    Category(DomainType),

    Bucket(Granularity),
}

/// One component of a group key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Label(String),
    Bucket(NaiveDate),
}

impl KeyPart {
    pub fn label(&self) -> String {
        match self {
            KeyPart::Label(label) => label.clone(),
            KeyPart::Bucket(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Dimension values in the order of the `GroupBy` keys
pub type GroupKey = Vec<KeyPart>;

/// Which classifier weights apply to an entry's hours
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightSelector {
    /// No category dimension: every entry counts with weight 1.0
    Full,

    /// Split by the weights of these domain types (cross product when several)
    Domains(Vec<DomainType>),
}

/// Ordered grouping dimensions. Percentages vary along the last dimension,
/// holding the preceding ones fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    keys: Vec<Dimension>,
}

impl GroupBy {
    pub fn new(keys: Vec<Dimension>) -> Self {
        GroupBy { keys }
    }

    pub fn keys(&self) -> &[Dimension] {
        &self.keys
    }

    pub fn weight_selector(&self) -> WeightSelector {
        let domains: Vec<DomainType> = self
            .keys
            .iter()
            .filter_map(|key| match key {
                Dimension::Category(domain) => Some(*domain),
                _ => None,
            })
            .collect();

        if domains.is_empty() {
            WeightSelector::Full
        } else {
            WeightSelector::Domains(domains)
        }
    }

    /// Position of the first bucket dimension, if any
    pub fn bucket_index(&self) -> Option<(usize, Granularity)> {
        self.keys.iter().enumerate().find_map(|(index, key)| match key {
            Dimension::Bucket(granularity) => Some((index, *granularity)),
            _ => None,
        })
    }

    /// Expand one entry into (key, weight) contributions
    fn contributions(&self, valid: &ValidEntry<'_>, classification: Option<&Classification>) -> Vec<(GroupKey, f64)> {
        let mut partial: Vec<(GroupKey, f64)> = vec![(Vec::with_capacity(self.keys.len()), 1.0)];

        for key in &self.keys {
            partial = match key {
                Dimension::Category(domain) => {
                    let weights = classification.map(|c| c.weights_for(*domain));
                    let mut expanded = Vec::new();
                    for (prefix, weight) in &partial {
                        for (category, share) in weights.into_iter().flatten() {
                            let mut next = prefix.clone();
                            next.push(KeyPart::Label(category.clone()));
                            expanded.push((next, weight * share));
                        }
                    }
                    expanded
                }
                _ => {
                    let part = scalar_part(key, valid);
                    partial
                        .into_iter()
                        .map(|(mut prefix, weight)| {
                            prefix.push(part.clone());
                            (prefix, weight)
                        })
                        .collect()
                }
            };
        }

        partial
    }
}

fn scalar_part(key: &Dimension, valid: &ValidEntry<'_>) -> KeyPart {
    match key {
        Dimension::Person => KeyPart::Label(valid.person().to_string()),
        Dimension::Team => KeyPart::Label(
            valid
                .entry
                .team
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(UNASSIGNED_TEAM)
                .to_string(),
        ),
        Dimension::SourceCategory => KeyPart::Label(valid.entry.category.trim().to_string()),
        Dimension::Bucket(granularity) => KeyPart::Bucket(granularity.bucket_of(valid.start)),
        Dimension::Category(_) => KeyPart::Label(String::new()),
    }
}

// ============================================================================
// ACCUMULATION
// ============================================================================

/// Summed hours and weighted entry count
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub hours: f64,
    pub count: f64,
}

impl Totals {
    pub fn add(&mut self, other: Totals) {
        self.hours += other.hours;
        self.count += other.count;
    }
}

/// One entry's weighted share of a group
#[derive(Debug, Clone, Copy, PartialEq)]
struct Contribution {
    index: usize,
    totals: Totals,
}

/// Contributions to one group, kept ordered by entry index so the float
/// sum is the same however the entries were partitioned
#[derive(Debug, Clone, Default, PartialEq)]
struct Ledger {
    contributions: Vec<Contribution>,
}

impl Ledger {
    fn push(&mut self, contribution: Contribution) {
        let sorted = self
            .contributions
            .last()
            .map_or(true, |last| last.index <= contribution.index);
        self.contributions.push(contribution);
        if !sorted {
            self.contributions.sort_by_key(|c| c.index);
        }
    }

    fn absorb(&mut self, other: Ledger) {
        self.contributions.extend(other.contributions);
        self.contributions.sort_by_key(|c| c.index);
    }

    fn sum(&self) -> Totals {
        let mut totals = Totals::default();
        for contribution in &self.contributions {
            totals.add(contribution.totals);
        }
        totals
    }
}

/// Aggregation result for one group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub hours: f64,
    pub count: f64,

    /// Share of hours among groups that differ only in the last dimension.
    /// None when those groups have zero hours in total.
    pub percentage: Option<f64>,
}

/// An entry left out of aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub index: usize,
    pub error: MalformedEntryError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    group_by: GroupBy,
    ledgers: BTreeMap<GroupKey, Ledger>,
    entries_used: usize,
    skipped: Vec<SkippedEntry>,
}

impl Aggregation {
    pub fn empty(group_by: GroupBy) -> Self {
        Aggregation {
            group_by,
            ledgers: BTreeMap::new(),
            entries_used: 0,
            skipped: Vec::new(),
        }
    }

    pub fn group_by(&self) -> &GroupBy {
        &self.group_by
    }

    /// Number of entries that contributed
    pub fn entries_used(&self) -> usize {
        self.entries_used
    }

    /// Number of malformed entries excluded
    pub fn skipped(&self) -> usize {
        self.skipped.len()
    }

    pub fn skipped_entries(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    /// Summed totals per group, added in entry order
    pub fn totals(&self) -> BTreeMap<GroupKey, Totals> {
        self.ledgers
            .iter()
            .map(|(key, ledger)| (key.clone(), ledger.sum()))
            .collect()
    }

    pub fn total_hours(&self) -> f64 {
        self.totals().values().map(|t| t.hours).sum()
    }

    fn record(&mut self, key: GroupKey, index: usize, totals: Totals) {
        self.ledgers
            .entry(key)
            .or_default()
            .push(Contribution { index, totals });
    }

    /// Fold another partial aggregation of the same grouping into this one.
    /// The result does not depend on merge order.
    pub fn merge(&mut self, other: Aggregation) {
        debug_assert_eq!(self.group_by, other.group_by);

        for (key, ledger) in other.ledgers {
            self.ledgers.entry(key).or_default().absorb(ledger);
        }
        self.entries_used += other.entries_used;
        self.skipped.extend(other.skipped);
        self.skipped.sort_by_key(|s| s.index);
    }

    /// Groups with percentages relative to their sibling groups
    pub fn groups(&self) -> BTreeMap<GroupKey, Group> {
        let totals = self.totals();

        let mut parent_hours: BTreeMap<&[KeyPart], f64> = BTreeMap::new();
        for (key, group_totals) in &totals {
            *parent_hours.entry(parent_of(key)).or_default() += group_totals.hours;
        }

        totals
            .iter()
            .map(|(key, group_totals)| {
                let parent_total = parent_hours.get(parent_of(key)).copied().unwrap_or(0.0);
                let percentage = if parent_total > 0.0 {
                    Some(group_totals.hours / parent_total * 100.0)
                } else {
                    None
                };

                (
                    key.clone(),
                    Group {
                        hours: group_totals.hours,
                        count: group_totals.count,
                        percentage,
                    },
                )
            })
            .collect()
    }
}

fn parent_of(key: &[KeyPart]) -> &[KeyPart] {
    match key.split_last() {
        Some((_, parent)) => parent,
        None => key,
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

fn accumulate<F>(aggregation: &mut Aggregation, index: usize, entry: &TimeEntry, classify_fn: &F)
where
    F: Fn(&TimeEntry) -> Classification,
{
    let valid = match entry.validate() {
        Ok(valid) => valid,
        Err(error) => {
            debug!(index, %error, "excluding malformed entry");
            aggregation.skipped.push(SkippedEntry { index, error });
            return;
        }
    };

    let classification = match aggregation.group_by.weight_selector() {
        WeightSelector::Full => None,
        WeightSelector::Domains(_) => Some(classify_fn(entry)),
    };

    for (key, weight) in aggregation.group_by.contributions(&valid, classification.as_ref()) {
        aggregation.record(
            key,
            index,
            Totals {
                hours: valid.hours * weight,
                count: weight,
            },
        );
    }
    aggregation.entries_used += 1;
}

fn log_skipped(aggregation: &Aggregation) {
    if aggregation.skipped() > 0 {
        warn!(
            skipped = aggregation.skipped(),
            used = aggregation.entries_used,
            "malformed entries excluded from aggregation"
        );
    }
}

/// Weighted group-by over `entries`. Malformed entries are skipped and
/// counted, never fatal.
pub fn aggregate<F>(entries: &[TimeEntry], classify_fn: F, group_by: &GroupBy) -> Aggregation
where
    F: Fn(&TimeEntry) -> Classification,
{
    let mut aggregation = Aggregation::empty(group_by.clone());

    for (index, entry) in entries.iter().enumerate() {
        accumulate(&mut aggregation, index, entry, &classify_fn);
    }

    log_skipped(&aggregation);
    aggregation
}

/// Same result as [`aggregate`], computed with a rayon fold/reduce
#[cfg(feature = "parallel")]
pub fn aggregate_parallel<F>(entries: &[TimeEntry], classify_fn: F, group_by: &GroupBy) -> Aggregation
where
    F: Fn(&TimeEntry) -> Classification + Sync,
{
    use rayon::prelude::*;

    let aggregation = entries
        .par_iter()
        .enumerate()
        .fold(
            || Aggregation::empty(group_by.clone()),
            |mut partial, (index, entry)| {
                accumulate(&mut partial, index, entry, &classify_fn);
                partial
            },
        )
        .reduce(
            || Aggregation::empty(group_by.clone()),
            |mut left, right| {
                left.merge(right);
                left
            },
        );

    log_skipped(&aggregation);
    aggregation
}
