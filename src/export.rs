// 📤 Export - row-oriented CSV and narrative text for reporting collaborators

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::aggregate::GroupKey;
use crate::lexicon::DomainType;
use crate::profile::PersonProfile;
use crate::trend::TimeSeries;

#[derive(Debug, Serialize)]
struct DistributionRecord<'a> {
    person: &'a str,
    domain_type: &'static str,
    category: &'a str,
    hours: f64,
    count: f64,
    percentage: f64,
}

#[derive(Debug, Serialize)]
struct KeywordRecord<'a> {
    person: &'a str,
    term: &'a str,
    hours: f64,
    count: usize,
}

#[derive(Debug, Serialize)]
struct SeriesRecord {
    group: String,
    bucket_start: String,
    value: f64,
}

/// Human-readable label for a group key ("Platform / Alice")
pub fn group_label(key: &GroupKey) -> String {
    if key.is_empty() {
        return "All".to_string();
    }
    key.iter().map(|part| part.label()).collect::<Vec<_>>().join(" / ")
}

/// One row per domain/activity category
pub fn write_distribution_csv<W: Write>(profile: &PersonProfile, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for domain_type in DomainType::ALL {
        for row in profile.distribution(domain_type) {
            wtr.serialize(DistributionRecord {
                person: &profile.person,
                domain_type: domain_type.as_str(),
                category: &row.category,
                hours: row.hours,
                count: row.count,
                percentage: row.percentage,
            })
            .context("Failed to write distribution row")?;
        }
    }

    wtr.flush().context("Failed to flush distribution CSV")?;
    Ok(())
}

/// One row per keyword, in ranking order
pub fn write_keywords_csv<W: Write>(profile: &PersonProfile, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for keyword in &profile.keyword_frequency {
        wtr.serialize(KeywordRecord {
            person: &profile.person,
            term: &keyword.term,
            hours: keyword.hours,
            count: keyword.count,
        })
        .context("Failed to write keyword row")?;
    }

    wtr.flush().context("Failed to flush keyword CSV")?;
    Ok(())
}

/// One row per (group, bucket) point
pub fn write_series_csv<W: Write>(series: &BTreeMap<GroupKey, TimeSeries>, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for (key, timeseries) in series {
        let group = group_label(key);
        for point in &timeseries.points {
            wtr.serialize(SeriesRecord {
                group: group.clone(),
                bucket_start: point.bucket_start.format("%Y-%m-%d").to_string(),
                value: point.value,
            })
            .context("Failed to write series row")?;
        }
    }

    wtr.flush().context("Failed to flush series CSV")?;
    Ok(())
}

/// Summary bullets, one per line
pub fn summary_text(profile: &PersonProfile) -> String {
    profile
        .summary
        .iter()
        .map(|bullet| format!("• {}\n", bullet))
        .collect()
}

/// Write distribution, keyword and summary files for a profile into `dir`.
/// Returns the written paths.
pub fn export_profile(profile: &PersonProfile, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create export dir: {:?}", dir))?;

    let stem: String = profile
        .person
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();

    let distribution_path = dir.join(format!("{}_distribution.csv", stem));
    let keywords_path = dir.join(format!("{}_keywords.csv", stem));
    let summary_path = dir.join(format!("{}_summary.txt", stem));

    let file = fs::File::create(&distribution_path)
        .with_context(|| format!("Failed to create {:?}", distribution_path))?;
    write_distribution_csv(profile, file)?;

    let file = fs::File::create(&keywords_path)
        .with_context(|| format!("Failed to create {:?}", keywords_path))?;
    write_keywords_csv(profile, file)?;

    fs::write(&summary_path, summary_text(profile))
        .with_context(|| format!("Failed to write {:?}", summary_path))?;

    Ok(vec![distribution_path, keywords_path, summary_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::KeyPart;
    use crate::entry::entry;
    use crate::lexicon::{Lexicon, RuleDefinition};
    use crate::profile::build_profile;
    use crate::trend::TimePoint;
    use chrono::NaiveDate;

    fn profile() -> PersonProfile {
        let lexicon = Lexicon::build(vec![
            RuleDefinition::new("API Integration", DomainType::TechnicalDomain, &["api", "integration"], 0),
            RuleDefinition::new("Meetings", DomainType::ActivityType, &["stand up", "meeting"], 0),
        ])
        .unwrap();
        let entries = vec![
            entry("Alice", "2024-01-10 09:00:00", 60.0, Some("API integration work")),
            entry("Alice", "2024-01-11 09:00:00", 30.0, Some("Stand up meeting")),
        ];
        build_profile(&entries, &lexicon, "Alice", None, None).unwrap()
    }

    #[test]
    fn test_distribution_rows() {
        let mut buffer = Vec::new();
        write_distribution_csv(&profile(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "person,domain_type,category,hours,count,percentage");
        // two technical rows + two activity rows
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("Alice,technical_domain,API Integration,1.0,1.0,"));
        assert!(lines[3].starts_with("Alice,activity_type,Uncategorized,1.0,1.0,"));
    }

    #[test]
    fn test_keyword_rows() {
        let mut buffer = Vec::new();
        write_keywords_csv(&profile(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(text.lines().next(), Some("person,term,hours,count"));
        assert_eq!(text.lines().nth(1), Some("Alice,api,1.0,1"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_series_rows() {
        let mut series = BTreeMap::new();
        series.insert(
            vec![KeyPart::Label("Platform".to_string())],
            TimeSeries {
                points: vec![
                    TimePoint {
                        bucket_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                        value: 2.5,
                    },
                    TimePoint {
                        bucket_start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                        value: 0.0,
                    },
                ],
            },
        );

        let mut buffer = Vec::new();
        write_series_csv(&series, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["group,bucket_start,value", "Platform,2024-01-01,2.5", "Platform,2024-02-01,0.0"]
        );
    }

    #[test]
    fn test_summary_text_one_bullet_per_line() {
        let profile = profile();
        let text = summary_text(&profile);

        assert_eq!(text.lines().count(), profile.summary.len());
        assert!(text.starts_with("• Primary technical domain"));
    }

    #[test]
    fn test_export_profile_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = export_profile(&profile(), dir.path()).unwrap();

        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.exists()));
        assert!(paths[0].ends_with("alice_distribution.csv"));
    }

    #[test]
    fn test_group_label() {
        assert_eq!(group_label(&Vec::new()), "All");
        assert_eq!(
            group_label(&vec![
                KeyPart::Label("Platform".to_string()),
                KeyPart::Bucket(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
            ]),
            "Platform / 2024-03-04"
        );
    }
}
