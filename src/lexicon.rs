// 🏷️ Lexicon - validated taxonomy of categories
// Rules as data: each category declares its domain type, aliases and priority.
// Every domain type also owns an implicit "Uncategorized" fallback.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::LexiconError;

/// Name of the implicit fallback category in every domain type
pub const UNCATEGORIZED: &str = "Uncategorized";

// ============================================================================
// DOMAIN TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    /// What subject the work concerns
    TechnicalDomain,

    /// What kind of work was done
    ActivityType,
}

impl DomainType {
    pub const ALL: [DomainType; 2] = [DomainType::TechnicalDomain, DomainType::ActivityType];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainType::TechnicalDomain => "technical_domain",
            DomainType::ActivityType => "activity_type",
        }
    }
}

impl std::fmt::Display for DomainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DomainType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "technical_domain" => Ok(DomainType::TechnicalDomain),
            "activity_type" => Ok(DomainType::ActivityType),
            other => Err(other.to_string()),
        }
    }
}

// ============================================================================
// TEXT NORMALIZATION
// ============================================================================

/// Lowercase, drop everything that is not alphanumeric or whitespace,
/// collapse whitespace runs to a single space.
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// RULE DEFINITION (configuration document shape)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Category name (e.g., "API Integration", "Meetings")
    pub name: String,

    /// technical_domain or activity_type
    pub domain_type: String,

    /// Patterns matched against the normalized comment
    pub aliases: Vec<String>,

    /// Higher wins ranking ties
    #[serde(default)]
    pub priority: i32,

    /// Require aliases to match on word boundaries
    #[serde(default)]
    pub whole_word: bool,
}

impl RuleDefinition {
    pub fn new(name: &str, domain_type: DomainType, aliases: &[&str], priority: i32) -> Self {
        RuleDefinition {
            name: name.to_string(),
            domain_type: domain_type.as_str().to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            priority,
            whole_word: false,
        }
    }

    pub fn whole_word(mut self) -> Self {
        self.whole_word = true;
        self
    }
}

// ============================================================================
// CATEGORY RULE (validated)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRule {
    pub name: String,
    pub domain_type: DomainType,

    /// Normalized aliases, declaration order preserved
    pub aliases: Vec<String>,
    pub priority: i32,
    pub whole_word: bool,

    /// Position in the declared rule list
    pub order: usize,
}

impl CategoryRule {
    /// Longest alias of this rule found in an already-normalized text
    pub fn longest_match(&self, normalized: &str) -> Option<&str> {
        self.matched_aliases(normalized)
            .into_iter()
            .max_by_key(|alias| alias.len())
    }

    /// Every alias of this rule found in an already-normalized text
    pub fn matched_aliases(&self, normalized: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .map(String::as_str)
            .filter(|alias| self.alias_matches(normalized, alias))
            .collect()
    }

    fn alias_matches(&self, normalized: &str, alias: &str) -> bool {
        if self.whole_word {
            contains_words(normalized, alias)
        } else {
            normalized.contains(alias)
        }
    }
}

/// Whole-word containment on space-separated normalized text
fn contains_words(haystack: &str, needle: &str) -> bool {
    let padded_haystack = format!(" {} ", haystack);
    let padded_needle = format!(" {} ", needle);
    padded_haystack.contains(&padded_needle)
}

// ============================================================================
// LEXICON
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lexicon {
    rules: Vec<CategoryRule>,

    /// When set, keep only the top-ranked N matches per domain type
    max_matches_per_domain: Option<usize>,
}

impl Lexicon {
    /// Validate rule definitions into an immutable lexicon.
    /// No partial lexicon is ever returned.
    pub fn build(definitions: Vec<RuleDefinition>) -> std::result::Result<Self, LexiconError> {
        let mut rules = Vec::with_capacity(definitions.len());
        let mut alias_owner: HashMap<(DomainType, String), String> = HashMap::new();

        for (order, def) in definitions.into_iter().enumerate() {
            let name = def.name.trim().to_string();
            if name.is_empty() {
                return Err(LexiconError::EmptyName);
            }
            if name.eq_ignore_ascii_case(UNCATEGORIZED) {
                return Err(LexiconError::ReservedName(name));
            }

            let domain_type: DomainType =
                def.domain_type
                    .parse()
                    .map_err(|domain_type| LexiconError::UnknownDomainType {
                        rule: name.clone(),
                        domain_type,
                    })?;

            if def.aliases.is_empty() {
                return Err(LexiconError::EmptyAliases(name));
            }

            let mut aliases: Vec<String> = Vec::with_capacity(def.aliases.len());
            for raw in &def.aliases {
                let alias = normalize_text(raw);
                if alias.is_empty() {
                    return Err(LexiconError::BlankAlias {
                        rule: name.clone(),
                        alias: raw.clone(),
                    });
                }
                if aliases.contains(&alias) {
                    return Err(LexiconError::RepeatedAlias {
                        rule: name.clone(),
                        alias,
                    });
                }

                let key = (domain_type, alias.clone());
                if let Some(first) = alias_owner.get(&key) {
                    return Err(LexiconError::DuplicateAlias {
                        alias,
                        domain_type: domain_type.to_string(),
                        first: first.clone(),
                        second: name,
                    });
                }
                alias_owner.insert(key, name.clone());
                aliases.push(alias);
            }

            rules.push(CategoryRule {
                name,
                domain_type,
                aliases,
                priority: def.priority,
                whole_word: def.whole_word,
                order,
            });
        }

        debug!(
            technical = rules.iter().filter(|r| r.domain_type == DomainType::TechnicalDomain).count(),
            activity = rules.iter().filter(|r| r.domain_type == DomainType::ActivityType).count(),
            "lexicon built"
        );

        Ok(Lexicon {
            rules,
            max_matches_per_domain: None,
        })
    }

    /// Load rule definitions from a JSON file (array of rules)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read lexicon file: {:?}", path.as_ref()))?;

        let definitions: Vec<RuleDefinition> =
            serde_json::from_str(&content).context("Failed to parse lexicon JSON")?;

        Ok(Lexicon::build(definitions)?)
    }

    /// Built-in taxonomy used when no configuration is supplied
    pub fn with_defaults() -> std::result::Result<Self, LexiconError> {
        Lexicon::build(default_rules())
    }

    /// Keep at most `limit` ranked matches per domain type (0 disables the limit)
    pub fn with_max_matches(mut self, limit: Option<usize>) -> Self {
        self.max_matches_per_domain = limit.filter(|n| *n > 0);
        self
    }

    pub fn max_matches_per_domain(&self) -> Option<usize> {
        self.max_matches_per_domain
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn rules_for(&self, domain_type: DomainType) -> impl Iterator<Item = &CategoryRule> {
        self.rules
            .iter()
            .filter(move |rule| rule.domain_type == domain_type)
    }

    /// Category names of a domain type, declaration order, fallback last
    pub fn categories(&self, domain_type: DomainType) -> Vec<&str> {
        self.rules_for(domain_type)
            .map(|rule| rule.name.as_str())
            .chain(std::iter::once(UNCATEGORIZED))
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Default category rules
///
/// technical_domain: API Integration, Data & Analytics, Infrastructure, Security, Documentation
/// activity_type: Meetings, Development, Review, Support, Planning
pub fn default_rules() -> Vec<RuleDefinition> {
    use DomainType::{ActivityType, TechnicalDomain};

    vec![
        RuleDefinition::new("API Integration", TechnicalDomain, &["api", "integration", "endpoint", "webhook"], 10),
        RuleDefinition::new("Data & Analytics", TechnicalDomain, &["data", "sql", "report", "dashboard", "analytics"], 5),
        RuleDefinition::new("Infrastructure", TechnicalDomain, &["deploy", "server", "docker", "kubernetes", "ci", "pipeline"], 5)
            .whole_word(),
        RuleDefinition::new("Security", TechnicalDomain, &["security", "auth", "permission", "vulnerability"], 5),
        RuleDefinition::new("Documentation", TechnicalDomain, &["docs", "documentation", "readme", "wiki"], 1),
        RuleDefinition::new("Meetings", ActivityType, &["meeting", "meetings", "stand up", "standup", "standups", "sync", "syncs", "call", "calls"], 5)
            .whole_word(),
        RuleDefinition::new("Development", ActivityType, &["implement", "develop", "code", "fix", "refactor", "build"], 5),
        RuleDefinition::new("Review", ActivityType, &["review", "feedback", "audit"], 5),
        RuleDefinition::new("Support", ActivityType, &["support", "help", "troubleshoot", "debug", "enablement"], 5),
        RuleDefinition::new("Planning", ActivityType, &["plan", "roadmap", "estimate"], 1),
    ]
}
