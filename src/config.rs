// ⚙️ Analytics Configuration - one JSON document for taxonomy, teams and windows
// The core only consumes the validated values; reading files stays here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bucket::Granularity;
use crate::lexicon::{default_rules, Lexicon, RuleDefinition};
use crate::teams::TeamMapping;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Category rules; the built-in taxonomy is used when empty
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,

    /// Keep only the N best-ranked matches per domain type
    #[serde(default)]
    pub max_matches_per_domain: Option<usize>,

    #[serde(default)]
    pub teams: Option<TeamMapping>,

    #[serde(default = "default_monthly_window")]
    pub monthly_window: usize,

    #[serde(default = "default_weekly_window")]
    pub weekly_window: usize,
}

fn default_monthly_window() -> usize {
    Granularity::Month.default_window()
}

fn default_weekly_window() -> usize {
    Granularity::Week.default_window()
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            rules: Vec::new(),
            max_matches_per_domain: None,
            teams: None,
            monthly_window: default_monthly_window(),
            weekly_window: default_weekly_window(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: AnalyticsConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        if let Some(teams) = &config.teams {
            teams.validate()?;
        }

        Ok(config)
    }

    /// Validated lexicon from the configured rules (or the defaults)
    pub fn lexicon(&self) -> Result<Lexicon> {
        let rules = if self.rules.is_empty() {
            default_rules()
        } else {
            self.rules.clone()
        };

        let lexicon = Lexicon::build(rules).context("Invalid category rules in configuration")?;
        Ok(lexicon.with_max_matches(self.max_matches_per_domain))
    }

    pub fn window_for(&self, granularity: Granularity) -> usize {
        match granularity {
            Granularity::Month => self.monthly_window,
            Granularity::Week => self.weekly_window,
        }
    }
}
