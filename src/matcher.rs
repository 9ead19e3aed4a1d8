//! Intent matching - scores an utterance against the catalog, ranks every
//! candidate, and falls back to a rule table when nothing clears the
//! threshold
//!
//! Matching order:
//! 1. Catalog similarity under the selected strategy (`plugin`)
//! 2. Ordered fallback rules, first hit wins (`fallback`)
//! 3. No classification (`none`), which is a normal outcome for noise

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{CatalogEntry, intents};
use crate::config::ConfigError;
use crate::fuzzy::{clean_for_matching, edit_similarity, word_overlap};

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("invalid fallback pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Weighting used to blend word overlap and edit similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FuzzyStrategy {
    Damerau,
    Soundex,
    DoubleMetaphone,
    #[default]
    Hybrid,
}

impl FuzzyStrategy {
    /// (overlap weight, edit weight)
    pub fn weights(&self) -> (f32, f32) {
        match self {
            FuzzyStrategy::Damerau => (0.0, 1.0),
            FuzzyStrategy::Soundex => (0.8, 0.2),
            FuzzyStrategy::DoubleMetaphone => (0.7, 0.3),
            FuzzyStrategy::Hybrid => (0.6, 0.4),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FuzzyStrategy::Damerau => "damerau",
            FuzzyStrategy::Soundex => "soundex",
            FuzzyStrategy::DoubleMetaphone => "double-metaphone",
            FuzzyStrategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for FuzzyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuzzyStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "damerau" => Ok(FuzzyStrategy::Damerau),
            "soundex" => Ok(FuzzyStrategy::Soundex),
            "double-metaphone" | "metaphone" => Ok(FuzzyStrategy::DoubleMetaphone),
            "hybrid" => Ok(FuzzyStrategy::Hybrid),
            other => Err(ConfigError::Invalid(format!("unknown strategy '{}'", other))),
        }
    }
}

/// Provenance of a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedBy {
    Plugin,
    Fallback,
    None,
}

/// One scored catalog entry, as shown by the explain view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentCandidate {
    pub pattern: String,
    pub intent: String,
    pub score: f32,
    pub reason: String,
}

/// Classification of one cleaned command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub intent: String,
    pub confidence: f32,
    pub matched_by: MatchedBy,
}

impl MatchOutcome {
    pub fn none() -> Self {
        Self {
            intent: String::new(),
            confidence: 0.0,
            matched_by: MatchedBy::None,
        }
    }
}

/// Fallback heuristic: every predicate must match the folded text
pub struct FallbackRule {
    predicates: Vec<Regex>,
    pub intent: String,
    pub confidence: f32,
}

impl FallbackRule {
    pub fn new(predicates: &[&str], intent: &str, confidence: f32) -> Result<Self, MatcherError> {
        let predicates = predicates
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            predicates,
            intent: intent.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.predicates.iter().all(|re| re.is_match(text))
    }
}

/// Default rule table, one family per known intent, in priority order.
/// Patterns run against diacritic-folded text.
pub fn default_rules() -> Result<Vec<FallbackRule>, MatcherError> {
    use intents::*;

    Ok(vec![
        FallbackRule::new(&["abre|abrir|open", "menu"], OPEN_MENU, 0.6)?,
        FallbackRule::new(&["elimina|borra|delete", "orden|order"], DELETE_ORDER, 0.6)?,
        FallbackRule::new(&["agrega|anade|add", "orden|order"], CREATE_ORDER, 0.58)?,
        FallbackRule::new(&["modifica|actualiza|update", "orden|order"], UPDATE_ORDER, 0.58)?,
        FallbackRule::new(&["show|help|ayuda|capacidad|capabilit"], SHOW_CAPABILITIES, 0.55)?,
        FallbackRule::new(&["telemetr|ranking"], OPEN_TELEMETRY, 0.55)?,
        FallbackRule::new(&["explain", r"\b(on|activa|activar|enable)\b"], EXPLAIN_ON, 0.55)?,
        FallbackRule::new(&["explain"], EXPLAIN_OFF, 0.55)?,
        FallbackRule::new(&["mcp|gateway", "connect|conect"], CONNECT_GATEWAY, 0.55)?,
        FallbackRule::new(&["mcp|gateway", "resource|recurso"], LIST_RESOURCES, 0.55)?,
        FallbackRule::new(&["mcp|gateway", "tool|herramienta"], LIST_TOOLS, 0.55)?,
    ])
}

/// Similarity of `text` to `pattern` under `strategy`, in `[0, 1]`
pub fn similarity(text: &str, pattern: &str, strategy: FuzzyStrategy) -> f32 {
    let text = clean_for_matching(text);
    let pattern = clean_for_matching(pattern);

    if text == pattern {
        return 1.0;
    }
    if !pattern.is_empty() && text.contains(&pattern) {
        return 0.9;
    }

    let (overlap_weight, edit_weight) = strategy.weights();
    let score =
        word_overlap(&text, &pattern) * overlap_weight + edit_similarity(&text, &pattern) * edit_weight;
    score.clamp(0.0, 1.0)
}

pub struct IntentMatcher {
    catalog: Vec<CatalogEntry>,
    rules: Vec<FallbackRule>,
    strategy: FuzzyStrategy,
    threshold: f32,
    last_ranking: Vec<IntentCandidate>,
}

impl IntentMatcher {
    pub fn new(
        catalog: Vec<CatalogEntry>,
        rules: Vec<FallbackRule>,
        strategy: FuzzyStrategy,
        threshold: f32,
    ) -> Self {
        let catalog = catalog
            .into_iter()
            .filter(|entry| !entry.pattern.trim().is_empty())
            .collect();
        Self {
            catalog,
            rules,
            strategy,
            threshold: threshold.clamp(0.0, 1.0),
            last_ranking: Vec::new(),
        }
    }

    pub fn strategy(&self) -> FuzzyStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: FuzzyStrategy) {
        self.strategy = strategy;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold {} outside [0, 1]",
                threshold
            )));
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Append a fallback rule; it runs after the existing ones
    pub fn push_rule(&mut self, rule: FallbackRule) {
        self.rules.push(rule);
    }

    /// Sorted ranking from the most recent `classify` call
    pub fn last_ranking(&self) -> &[IntentCandidate] {
        &self.last_ranking
    }

    /// Score every catalog entry, highest first. Ties keep catalog order.
    pub fn rank(&self, text: &str) -> Vec<IntentCandidate> {
        let mut ranking: Vec<IntentCandidate> = self
            .catalog
            .iter()
            .map(|entry| IntentCandidate {
                pattern: entry.pattern.clone(),
                intent: entry.intent.clone(),
                score: similarity(text, &entry.pattern, self.strategy),
                reason: format!(
                    "{} similarity with pattern \"{}\"",
                    self.strategy, entry.pattern
                ),
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranking
    }

    pub fn classify(&mut self, text: &str) -> MatchOutcome {
        self.last_ranking = self.rank(text);

        if let Some(best) = self.last_ranking.first() {
            if best.score >= self.threshold {
                return MatchOutcome {
                    intent: best.intent.clone(),
                    confidence: best.score,
                    matched_by: MatchedBy::Plugin,
                };
            }
        }

        let folded = clean_for_matching(text);
        match self.rules.iter().find(|rule| rule.matches(&folded)) {
            Some(rule) => {
                debug!(intent = %rule.intent, "fallback rule matched");
                MatchOutcome {
                    intent: rule.intent.clone(),
                    confidence: rule.confidence,
                    matched_by: MatchedBy::Fallback,
                }
            }
            None => MatchOutcome::none(),
        }
    }
}
