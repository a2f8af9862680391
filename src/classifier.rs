// 🔎 Classifier - free-text comment → weighted categories per domain type
//
// Every matching category in a domain type receives an equal share of the
// entry, so weights always sum to 1.0. No match means "Uncategorized" = 1.0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::lexicon::{normalize_text, CategoryRule, DomainType, Lexicon, UNCATEGORIZED};

/// Category name → weight in (0, 1]
pub type CategoryWeights = BTreeMap<String, f64>;

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Weights per domain type; each inner map sums to 1.0
    pub weights: BTreeMap<DomainType, CategoryWeights>,

    /// Normalized aliases that matched, in rank order, without repeats
    pub terms: Vec<String>,
}

impl Classification {
    /// Everything falls into the fallback category
    pub fn uncategorized() -> Self {
        let weights = DomainType::ALL
            .iter()
            .map(|domain| (*domain, fallback_weights()))
            .collect();

        Classification {
            weights,
            terms: Vec::new(),
        }
    }

    pub fn weights_for(&self, domain_type: DomainType) -> &CategoryWeights {
        // Both domain types are always populated by `classify`
        static EMPTY: BTreeMap<String, f64> = BTreeMap::new();
        self.weights.get(&domain_type).unwrap_or(&EMPTY)
    }

    pub fn is_uncategorized(&self, domain_type: DomainType) -> bool {
        self.weights_for(domain_type).contains_key(UNCATEGORIZED)
    }
}

fn fallback_weights() -> CategoryWeights {
    let mut weights = BTreeMap::new();
    weights.insert(UNCATEGORIZED.to_string(), 1.0);
    weights
}

/// A rule that matched, with the length of its longest matching alias
struct RuleMatch<'a> {
    rule: &'a CategoryRule,
    match_len: usize,
}

// ============================================================================
// CLASSIFY
// ============================================================================

/// Classify a comment against the lexicon. Pure and deterministic.
pub fn classify(comment: Option<&str>, lexicon: &Lexicon) -> Classification {
    let normalized = match comment {
        Some(text) => normalize_text(text),
        None => String::new(),
    };

    if normalized.is_empty() {
        return Classification::uncategorized();
    }

    let mut weights = BTreeMap::new();
    let mut terms: Vec<String> = Vec::new();

    for domain_type in DomainType::ALL {
        let matches = ranked_matches(&normalized, lexicon, domain_type);

        if matches.is_empty() {
            weights.insert(domain_type, fallback_weights());
            continue;
        }

        let share = 1.0 / matches.len() as f64;
        let mut domain_weights = BTreeMap::new();

        for m in &matches {
            domain_weights.insert(m.rule.name.clone(), share);

            for alias in m.rule.matched_aliases(&normalized) {
                if !terms.iter().any(|t| t == alias) {
                    terms.push(alias.to_string());
                }
            }
        }

        weights.insert(domain_type, domain_weights);
    }

    Classification { weights, terms }
}

/// Matching rules of one domain type, ranked by alias length (desc),
/// priority (desc), then declaration order (asc). Truncated when the
/// lexicon caps matches per domain type.
fn ranked_matches<'a>(normalized: &str, lexicon: &'a Lexicon, domain_type: DomainType) -> Vec<RuleMatch<'a>> {
    let mut matches: Vec<RuleMatch<'a>> = lexicon
        .rules_for(domain_type)
        .filter_map(|rule| {
            rule.longest_match(normalized).map(|alias| RuleMatch {
                rule,
                match_len: alias.len(),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.match_len
            .cmp(&a.match_len)
            .then_with(|| b.rule.priority.cmp(&a.rule.priority))
            .then_with(|| a.rule.order.cmp(&b.rule.order))
    });

    if let Some(limit) = lexicon.max_matches_per_domain() {
        matches.truncate(limit);
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::RuleDefinition;
    use proptest::prelude::*;

    fn scenario_lexicon() -> Lexicon {
        Lexicon::build(vec![
            RuleDefinition::new("API Integration", DomainType::TechnicalDomain, &["api", "integration"], 0),
            RuleDefinition::new("Meetings", DomainType::ActivityType, &["stand up", "meeting"], 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_match_per_domain() {
        let result = classify(Some("API integration work"), &scenario_lexicon());

        let technical = result.weights_for(DomainType::TechnicalDomain);
        assert_eq!(technical.len(), 1);
        assert_eq!(technical["API Integration"], 1.0);

        let activity = result.weights_for(DomainType::ActivityType);
        assert_eq!(activity[UNCATEGORIZED], 1.0);
        assert_eq!(result.terms, vec!["api", "integration"]);
    }

    #[test]
    fn test_empty_and_missing_comments() {
        let lexicon = scenario_lexicon();

        for comment in [None, Some(""), Some("   "), Some("...")] {
            let result = classify(comment, &lexicon);
            assert_eq!(result, Classification::uncategorized());
            assert!(result.is_uncategorized(DomainType::TechnicalDomain));
            assert!(result.is_uncategorized(DomainType::ActivityType));
        }
    }

    #[test]
    fn test_even_split_across_matches() {
        let lexicon = Lexicon::build(vec![
            RuleDefinition::new("API Integration", DomainType::TechnicalDomain, &["api"], 0),
            RuleDefinition::new("Data", DomainType::TechnicalDomain, &["sql"], 0),
            RuleDefinition::new("Security", DomainType::TechnicalDomain, &["auth"], 0),
        ])
        .unwrap();

        let result = classify(Some("API auth bug in sql layer"), &lexicon);
        let technical = result.weights_for(DomainType::TechnicalDomain);

        assert_eq!(technical.len(), 3);
        for weight in technical.values() {
            assert!((weight - 1.0 / 3.0).abs() < 1e-12);
        }
        assert!((technical.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_matches_keeps_best_ranked() {
        let lexicon = Lexicon::build(vec![
            RuleDefinition::new("Short", DomainType::TechnicalDomain, &["api"], 100),
            RuleDefinition::new("Long", DomainType::TechnicalDomain, &["integration"], 0),
            RuleDefinition::new("Priority", DomainType::TechnicalDomain, &["webhook"], 5),
            RuleDefinition::new("Later", DomainType::TechnicalDomain, &["backend"], 5),
        ])
        .unwrap()
        .with_max_matches(Some(2));

        let result = classify(Some("api integration webhook backend"), &lexicon);
        let technical = result.weights_for(DomainType::TechnicalDomain);

        // "integration" (11 chars) wins on length; "webhook" and "backend" tie
        // on length and priority, declaration order keeps "webhook"
        assert_eq!(technical.keys().collect::<Vec<_>>(), vec!["Long", "Priority"]);
        assert_eq!(technical["Long"], 0.5);
        assert!(!result.terms.contains(&"api".to_string()));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let lexicon = Lexicon::with_defaults().unwrap();
        let comment = Some("Stand-up meeting about the API deploy pipeline");

        let first = classify(comment, &lexicon);
        let second = classify(comment, &lexicon);
        assert_eq!(first, second);
        assert_eq!(first.weights_for(DomainType::ActivityType)["Meetings"], 1.0);
    }

    #[test]
    fn test_terms_not_repeated_across_domains() {
        let lexicon = Lexicon::build(vec![
            RuleDefinition::new("Review Tooling", DomainType::TechnicalDomain, &["review"], 0),
            RuleDefinition::new("Review", DomainType::ActivityType, &["review"], 0),
        ])
        .unwrap();

        let result = classify(Some("code review"), &lexicon);
        assert_eq!(result.terms, vec!["review"]);
    }

    proptest! {
        #[test]
        fn prop_weights_sum_to_one(comment in "[a-zA-Z ,.!-]{0,60}") {
            let lexicon = Lexicon::with_defaults().unwrap();
            let result = classify(Some(comment.as_str()), &lexicon);

            for domain_type in DomainType::ALL {
                let weights = result.weights_for(domain_type);
                prop_assert!(!weights.is_empty());
                prop_assert!(weights.values().all(|w| *w > 0.0 && *w <= 1.0));
                prop_assert!((weights.values().sum::<f64>() - 1.0).abs() < 1e-9);
            }
        }
    }
}
