// 📈 Trend Normalizer - gap-filled time series per group
//
// The time axis is contiguous: buckets without entries are materialized
// with 0 so a logging gap shows up as a dip, never as a missing point.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::{Aggregation, GroupKey, KeyPart};
use crate::bucket::Granularity;
use crate::error::{check_date_range, AnalyticsError, Result};

/// Bucket start → value, per group
pub type SeriesByGroup = BTreeMap<GroupKey, BTreeMap<NaiveDate, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMode {
    /// Hours per bucket as aggregated
    Absolute,

    /// Each group's share of the bucket total (×100); 0 when the bucket is empty
    PercentageOfTotal,

    /// Trailing mean ending at the current bucket
    MovingAverage,
}

impl std::str::FromStr for TrendMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "absolute" => Ok(TrendMode::Absolute),
            "percentage" | "percentage-of-total" => Ok(TrendMode::PercentageOfTotal),
            "moving-average" | "rolling" => Ok(TrendMode::MovingAverage),
            other => Err(format!("unknown trend mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendQuery {
    pub granularity: Granularity,
    pub mode: TrendMode,

    /// Moving-average window; defaults to 4 (monthly) or 2 (weekly)
    pub window: Option<usize>,

    /// Inclusive range; defaults to the span of the data
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TrendQuery {
    pub fn new(granularity: Granularity, mode: TrendMode) -> Self {
        TrendQuery {
            granularity,
            mode,
            window: None,
            start: None,
            end: None,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn effective_window(&self) -> usize {
        self.window.unwrap_or_else(|| self.granularity.default_window())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub bucket_start: NaiveDate,
    pub value: f64,
}

/// Contiguous points ordered oldest to newest
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    pub points: Vec<TimePoint>,
}

impl TimeSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn buckets(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.bucket_start).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ============================================================================
// SERIES EXTRACTION
// ============================================================================

/// Split aggregated groups into (group without bucket, bucket) → hours.
/// None when the aggregation has no bucket dimension.
pub fn series_from_aggregation(aggregation: &Aggregation) -> Option<(SeriesByGroup, Granularity)> {
    let (bucket_index, granularity) = aggregation.group_by().bucket_index()?;
    let mut series: SeriesByGroup = BTreeMap::new();

    for (mut group, totals) in aggregation.totals() {
        let bucket = match group.remove(bucket_index) {
            KeyPart::Bucket(date) => date,
            KeyPart::Label(_) => continue,
        };
        *series.entry(group).or_default().entry(bucket).or_default() += totals.hours;
    }

    Some((series, granularity))
}

// ============================================================================
// NORMALIZE
// ============================================================================

/// Apply the query's transform over a gap-filled, contiguous time axis
pub fn normalize(series: &SeriesByGroup, query: &TrendQuery) -> Result<BTreeMap<GroupKey, TimeSeries>> {
    check_date_range(query.start, query.end)?;

    let window = query.effective_window();
    if window == 0 {
        return Err(AnalyticsError::InvalidWindow(window));
    }

    let granularity = query.granularity;
    let axis = time_axis(series, query);
    let position: BTreeMap<NaiveDate, usize> = axis.iter().enumerate().map(|(i, b)| (*b, i)).collect();

    // Absolute hours laid out on the axis
    let mut grid: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for (group, points) in series {
        let mut row = vec![0.0; axis.len()];
        for (bucket, value) in points {
            if let Some(i) = position.get(&granularity.truncate(*bucket)) {
                row[*i] += value;
            }
        }
        grid.insert(group.clone(), row);
    }

    match query.mode {
        TrendMode::Absolute => {}
        TrendMode::PercentageOfTotal => {
            let mut column_totals = vec![0.0; axis.len()];
            for row in grid.values() {
                for (i, value) in row.iter().enumerate() {
                    column_totals[i] += value;
                }
            }
            for row in grid.values_mut() {
                for (i, value) in row.iter_mut().enumerate() {
                    *value = if column_totals[i] > 0.0 {
                        *value / column_totals[i] * 100.0
                    } else {
                        0.0
                    };
                }
            }
        }
        TrendMode::MovingAverage => {
            for row in grid.values_mut() {
                *row = trailing_mean(row, window);
            }
        }
    }

    Ok(grid
        .into_iter()
        .map(|(group, row)| {
            let points = axis
                .iter()
                .zip(row)
                .map(|(bucket_start, value)| TimePoint {
                    bucket_start: *bucket_start,
                    value,
                })
                .collect();
            (group, TimeSeries { points })
        })
        .collect())
}

/// Buckets covered by the query range, or by the data when unbounded
fn time_axis(series: &SeriesByGroup, query: &TrendQuery) -> Vec<NaiveDate> {
    let observed = || series.values().flat_map(|points| points.keys().copied());

    let start = query.start.or_else(|| observed().min());
    let end = query.end.or_else(|| observed().max());

    match (start, end) {
        (Some(start), Some(end)) => query.granularity.range(start, end),
        _ => Vec::new(),
    }
}

/// Mean of up to `window` values ending at each position (no lookahead,
/// shorter window at the series start)
fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            let span = &values[from..=i];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, Dimension, GroupBy};
    use crate::classifier::Classification;
    use crate::entry::entry;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn group(name: &str) -> GroupKey {
        vec![KeyPart::Label(name.to_string())]
    }

    fn monthly(values: &[(u32, f64)]) -> BTreeMap<NaiveDate, f64> {
        values.iter().map(|(m, v)| (month(*m), *v)).collect()
    }

    #[test]
    fn test_moving_average_trailing_window() {
        let mut series = SeriesByGroup::new();
        series.insert(
            group("Platform"),
            monthly(&[(1, 10.0), (2, 0.0), (3, 20.0), (4, 30.0), (5, 40.0)]),
        );

        let query = TrendQuery::new(Granularity::Month, TrendMode::MovingAverage).with_window(4);
        let result = normalize(&series, &query).unwrap();

        assert_eq!(result[&group("Platform")].values(), vec![10.0, 5.0, 10.0, 15.0, 22.5]);
    }

    #[test]
    fn test_default_windows() {
        assert_eq!(TrendQuery::new(Granularity::Month, TrendMode::MovingAverage).effective_window(), 4);
        assert_eq!(TrendQuery::new(Granularity::Week, TrendMode::MovingAverage).effective_window(), 2);
    }

    #[test]
    fn test_percentage_of_total_with_zero_bucket() {
        let mut series = SeriesByGroup::new();
        series.insert(group("A"), monthly(&[(1, 10.0), (2, 0.0)]));
        series.insert(group("B"), monthly(&[(1, 10.0), (2, 0.0)]));

        let query = TrendQuery::new(Granularity::Month, TrendMode::PercentageOfTotal);
        let result = normalize(&series, &query).unwrap();

        assert_eq!(result[&group("A")].values(), vec![50.0, 0.0]);
        assert_eq!(result[&group("B")].values(), vec![50.0, 0.0]);
        assert!(result.values().all(|s| s.values().iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_gap_months_are_filled() {
        let mut series = SeriesByGroup::new();
        series.insert(group("A"), monthly(&[(1, 5.0), (4, 7.0)]));

        let query = TrendQuery::new(Granularity::Month, TrendMode::Absolute);
        let result = normalize(&series, &query).unwrap();
        let a = &result[&group("A")];

        assert_eq!(a.buckets(), vec![month(1), month(2), month(3), month(4)]);
        assert_eq!(a.values(), vec![5.0, 0.0, 0.0, 7.0]);
    }

    #[test]
    fn test_explicit_range_extends_and_clips() {
        let mut series = SeriesByGroup::new();
        series.insert(group("A"), monthly(&[(1, 5.0), (3, 7.0)]));

        let query = TrendQuery::new(Granularity::Month, TrendMode::Absolute)
            .with_range(Some(month(2)), Some(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()));
        let result = normalize(&series, &query).unwrap();

        assert_eq!(result[&group("A")].values(), vec![0.0, 7.0, 0.0, 0.0]);
        assert_eq!(result[&group("A")].buckets()[0], month(2));
    }

    #[test]
    fn test_groups_share_one_axis() {
        let mut series = SeriesByGroup::new();
        series.insert(group("A"), monthly(&[(1, 1.0)]));
        series.insert(group("B"), monthly(&[(3, 1.0)]));

        let result = normalize(&series, &TrendQuery::new(Granularity::Month, TrendMode::Absolute)).unwrap();

        assert_eq!(result[&group("A")].values(), vec![1.0, 0.0, 0.0]);
        assert_eq!(result[&group("B")].values(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_invalid_queries() {
        let series = SeriesByGroup::new();

        let zero_window = TrendQuery::new(Granularity::Week, TrendMode::MovingAverage).with_window(0);
        assert!(matches!(normalize(&series, &zero_window), Err(AnalyticsError::InvalidWindow(0))));

        let reversed = TrendQuery::new(Granularity::Month, TrendMode::Absolute).with_range(Some(month(5)), Some(month(1)));
        assert!(matches!(normalize(&series, &reversed), Err(AnalyticsError::DateRange { .. })));
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let result = normalize(&SeriesByGroup::new(), &TrendQuery::new(Granularity::Month, TrendMode::Absolute)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_series_from_weekly_aggregation() {
        let mut first = entry("Alice", "2024-03-05 09:00:00", 60.0, None);
        first.team = Some("Platform".to_string());
        let mut second = entry("Bob", "2024-03-20 09:00:00", 30.0, None);
        second.team = Some("Platform".to_string());

        let group_by = GroupBy::new(vec![Dimension::Bucket(Granularity::Week), Dimension::Team]);
        let agg = aggregate(&[first, second], |_| Classification::uncategorized(), &group_by);

        let (series, granularity) = series_from_aggregation(&agg).unwrap();
        assert_eq!(granularity, Granularity::Week);

        let result = normalize(&series, &TrendQuery::new(granularity, TrendMode::Absolute)).unwrap();
        let platform = &result[&group("Platform")];
        assert_eq!(platform.values(), vec![1.0, 0.0, 0.5]);
        assert_eq!(platform.buckets()[0], NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn test_no_bucket_dimension() {
        let agg = aggregate(&[], |_| Classification::uncategorized(), &GroupBy::new(vec![Dimension::Person]));
        assert!(series_from_aggregation(&agg).is_none());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("percentage".parse::<TrendMode>(), Ok(TrendMode::PercentageOfTotal));
        assert_eq!("moving_average".parse::<TrendMode>(), Ok(TrendMode::MovingAverage));
        assert!("median".parse::<TrendMode>().is_err());
    }
}
