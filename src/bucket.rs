// 🗓️ Time Buckets - fixed calendar intervals for trend analysis
// Buckets use the naive wall-clock timestamp as given; no timezone handling here

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// First day of the calendar month
    Month,

    /// ISO week start (Monday)
    Week,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Month => "month",
            Granularity::Week => "week",
        }
    }

    /// Default trailing moving-average window for this granularity
    pub fn default_window(&self) -> usize {
        match self {
            Granularity::Month => 4,
            Granularity::Week => 2,
        }
    }

    /// Truncate a timestamp to the start of its bucket
    pub fn bucket_of(&self, timestamp: NaiveDateTime) -> NaiveDate {
        self.truncate(timestamp.date())
    }

    /// Truncate a date to the start of its bucket
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
        }
    }

    /// Start of the bucket following `bucket`
    pub fn next(&self, bucket: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Month => {
                let (year, month) = if bucket.month() == 12 {
                    (bucket.year() + 1, 1)
                } else {
                    (bucket.year(), bucket.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(bucket)
            }
            Granularity::Week => bucket + Duration::days(7),
        }
    }

    /// Every bucket start from the bucket of `from` through the bucket of `to`, inclusive.
    /// Empty when `from` is after `to`.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        let mut buckets = Vec::new();
        let last = self.truncate(to);
        let mut current = self.truncate(from);

        while current <= last {
            buckets.push(current);
            let next = self.next(current);
            if next <= current {
                break;
            }
            current = next;
        }

        buckets
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" | "monthly" => Ok(Granularity::Month),
            "week" | "weekly" => Ok(Granularity::Week),
            other => Err(format!("unknown granularity: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_truncation() {
        let ts = date(2024, 3, 17).and_hms_opt(23, 59, 0).unwrap();
        assert_eq!(Granularity::Month.bucket_of(ts), date(2024, 3, 1));
    }

    #[test]
    fn test_week_truncation_to_monday() {
        // 2024-03-17 is a Sunday
        assert_eq!(Granularity::Week.truncate(date(2024, 3, 17)), date(2024, 3, 11));
        // Monday maps to itself
        assert_eq!(Granularity::Week.truncate(date(2024, 3, 11)), date(2024, 3, 11));
        // Crosses a year boundary
        assert_eq!(Granularity::Week.truncate(date(2025, 1, 1)), date(2024, 12, 30));
    }

    #[test]
    fn test_month_range_is_contiguous() {
        let buckets = Granularity::Month.range(date(2023, 11, 20), date(2024, 2, 3));
        assert_eq!(
            buckets,
            vec![
                date(2023, 11, 1),
                date(2023, 12, 1),
                date(2024, 1, 1),
                date(2024, 2, 1)
            ]
        );
    }

    #[test]
    fn test_week_range() {
        let buckets = Granularity::Week.range(date(2024, 3, 13), date(2024, 3, 26));
        assert_eq!(
            buckets,
            vec![date(2024, 3, 11), date(2024, 3, 18), date(2024, 3, 25)]
        );
    }

    #[test]
    fn test_empty_range_when_reversed() {
        assert!(Granularity::Month
            .range(date(2024, 5, 1), date(2024, 1, 1))
            .is_empty());
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!("monthly".parse::<Granularity>(), Ok(Granularity::Month));
        assert_eq!("Week".parse::<Granularity>(), Ok(Granularity::Week));
        assert!("daily".parse::<Granularity>().is_err());
    }
}
