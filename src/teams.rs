// 👥 Team Mapping - person → team assignment and enablement filtering
//
// Mapping document:
//   { "teams": { "Platform": ["Alice", "Bob"] }, "enablement_categories": ["Enablement"] }

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::aggregate::{aggregate, Dimension, GroupBy, KeyPart};
use crate::classifier::Classification;
use crate::entry::TimeEntry;
use crate::error::{check_date_range, AnalyticsError};

/// Enablement hours and sessions of one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamHours {
    pub team: String,
    pub hours: f64,
    pub sessions: usize,
}

/// Enablement hours and sessions of one person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonHours {
    pub person: String,
    pub team: String,
    pub hours: f64,
    pub sessions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMapping {
    /// Team name → people in that team
    #[serde(default)]
    pub teams: BTreeMap<String, Vec<String>>,

    /// Source categories that count as enablement work
    #[serde(default)]
    pub enablement_categories: Vec<String>,
}

impl TeamMapping {
    /// Load and validate a mapping from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read team mapping: {:?}", path.as_ref()))?;

        let mapping: TeamMapping =
            serde_json::from_str(&content).context("Failed to parse team mapping JSON")?;
        mapping.validate()?;

        Ok(mapping)
    }

    /// A person may belong to at most one team
    pub fn validate(&self) -> std::result::Result<(), AnalyticsError> {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();

        for (team, people) in &self.teams {
            for person in people {
                if let Some(other) = seen.insert(person.trim(), team.as_str()) {
                    if other != team.as_str() {
                        return Err(AnalyticsError::InvalidTeamMapping(format!(
                            "{} is mapped to both {} and {}",
                            person.trim(),
                            other,
                            team
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn team_of(&self, person: &str) -> Option<&str> {
        let person = person.trim();
        self.teams
            .iter()
            .find(|(_, people)| people.iter().any(|p| p.trim() == person))
            .map(|(team, _)| team.as_str())
    }

    pub fn is_enablement(&self, entry: &TimeEntry) -> bool {
        let category = entry.category.trim();
        self.enablement_categories.iter().any(|c| c.trim() == category)
    }

    /// Copies of `entries` with `team` filled from the mapping where missing
    pub fn assign_teams(&self, entries: &[TimeEntry]) -> Vec<TimeEntry> {
        entries
            .iter()
            .map(|entry| {
                let mut assigned = entry.clone();
                let has_team = assigned.team.as_deref().is_some_and(|t| !t.trim().is_empty());
                if !has_team {
                    assigned.team = self.team_of(&entry.person).map(str::to_string);
                }
                assigned
            })
            .collect()
    }

    /// Enablement entries with a known team
    pub fn enablement_only(&self, entries: &[TimeEntry]) -> Vec<TimeEntry> {
        self.assign_teams(entries)
            .into_iter()
            .filter(|entry| self.is_enablement(entry) && entry.team.is_some())
            .collect()
    }

    /// Enablement entries of mapped teams whose start date lies in the
    /// inclusive range. Malformed entries are dropped.
    fn enablement_in_range(
        &self,
        entries: &[TimeEntry],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> crate::error::Result<Vec<TimeEntry>> {
        check_date_range(start_date, end_date)?;

        Ok(self
            .enablement_only(entries)
            .into_iter()
            .filter(|entry| match entry.validate() {
                Ok(valid) => {
                    let date = valid.date();
                    !start_date.is_some_and(|start| date < start) && !end_date.is_some_and(|end| date > end)
                }
                Err(_) => false,
            })
            .collect())
    }

    /// Enablement hours per team, most hours first
    pub fn hours_by_team(
        &self,
        entries: &[TimeEntry],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> crate::error::Result<Vec<TeamHours>> {
        let selected = self.enablement_in_range(entries, start_date, end_date)?;
        let group_by = GroupBy::new(vec![Dimension::Team]);

        let mut rows: Vec<TeamHours> = aggregate(&selected, |_| Classification::uncategorized(), &group_by)
            .totals()
            .into_iter()
            .filter_map(|(key, totals)| match key.as_slice() {
                [KeyPart::Label(team)] => Some(TeamHours {
                    team: team.clone(),
                    hours: totals.hours,
                    sessions: totals.count.round() as usize,
                }),
                _ => None,
            })
            .collect();

        rows.sort_by(|a, b| b.hours.total_cmp(&a.hours).then_with(|| a.team.cmp(&b.team)));
        Ok(rows)
    }

    /// Enablement hours per person with their team, most hours first
    pub fn hours_by_person(
        &self,
        entries: &[TimeEntry],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> crate::error::Result<Vec<PersonHours>> {
        let selected = self.enablement_in_range(entries, start_date, end_date)?;
        let group_by = GroupBy::new(vec![Dimension::Person, Dimension::Team]);

        let mut rows: Vec<PersonHours> = aggregate(&selected, |_| Classification::uncategorized(), &group_by)
            .totals()
            .into_iter()
            .filter_map(|(key, totals)| match key.as_slice() {
                [KeyPart::Label(person), KeyPart::Label(team)] => Some(PersonHours {
                    person: person.clone(),
                    team: team.clone(),
                    hours: totals.hours,
                    sessions: totals.count.round() as usize,
                }),
                _ => None,
            })
            .collect();

        rows.sort_by(|a, b| b.hours.total_cmp(&a.hours).then_with(|| a.person.cmp(&b.person)));
        Ok(rows)
    }

    /// People with enablement entries who are not in any team
    pub fn unassigned_people(&self, entries: &[TimeEntry]) -> Vec<String> {
        let people: BTreeSet<String> = entries
            .iter()
            .filter(|entry| self.is_enablement(entry))
            .map(|entry| entry.person.trim().to_string())
            .filter(|person| !person.is_empty() && self.team_of(person).is_none())
            .collect();

        people.into_iter().collect()
    }
}
