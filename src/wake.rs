//! Wake word detection - checks if an utterance starts with a wake phrase or
//! one of its aliases, and strips it off

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::WakeConfig;
use crate::fuzzy::{edit_similarity, normalize};

/// How the wake phrase was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeVia {
    #[default]
    None,
    /// The canonical phrase itself
    Exact,
    /// An alias, scored by edit similarity to its canonical phrase
    Phonetic,
}

impl WakeVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            WakeVia::None => "none",
            WakeVia::Exact => "exact",
            WakeVia::Phonetic => "phonetic",
        }
    }
}

/// Result of wake detection
///
/// When a candidate was found but scored under the minimum, `matched` is false
/// but `wake_word`, `alias` and `confidence` still describe the candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeMatch {
    pub matched: bool,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wake_word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub command: String,
    pub via: WakeVia,
}

impl WakeMatch {
    fn unmatched(command: &str) -> Self {
        Self {
            matched: false,
            confidence: 0.0,
            wake_word: None,
            alias: None,
            command: command.to_string(),
            via: WakeVia::None,
        }
    }
}

struct Candidate {
    /// Lowercased, diacritic-folded form used for prefix comparison
    folded: String,
    canonical: String,
    alias: Option<String>,
    confidence: f32,
}

pub struct WakeWordStripper {
    candidates: Vec<Candidate>,
    min_confidence: f32,
}

impl WakeWordStripper {
    pub fn new(
        phrases: &[String],
        aliases: &BTreeMap<String, Vec<String>>,
        min_confidence: f32,
    ) -> Self {
        let mut candidates: Vec<Candidate> = Vec::new();

        // Alias map keys count as canonical phrases too
        let canonicals = phrases.iter().chain(aliases.keys());
        for phrase in canonicals {
            let folded = normalize(phrase.trim());
            if folded.is_empty() || candidates.iter().any(|c| c.folded == folded) {
                continue;
            }
            candidates.push(Candidate {
                folded,
                canonical: phrase.trim().to_string(),
                alias: None,
                confidence: 1.0,
            });
        }

        for (canonical, alias_list) in aliases {
            let canonical_folded = normalize(canonical.trim());
            for alias in alias_list {
                let folded = normalize(alias.trim());
                if folded.is_empty() || candidates.iter().any(|c| c.folded == folded) {
                    continue;
                }
                candidates.push(Candidate {
                    confidence: edit_similarity(&folded, &canonical_folded),
                    folded,
                    canonical: canonical.trim().to_string(),
                    alias: Some(alias.trim().to_string()),
                });
            }
        }

        // Longest first so "ok nura" beats a bare "ok"
        candidates.sort_by(|a, b| b.folded.chars().count().cmp(&a.folded.chars().count()));

        Self {
            candidates,
            min_confidence,
        }
    }

    pub fn from_config(config: &WakeConfig) -> Self {
        Self::new(&config.phrases, &config.aliases, config.min_confidence)
    }

    /// Check if text starts with a wake phrase and return the stripped command
    pub fn strip(&self, utterance: &str) -> WakeMatch {
        let trimmed = utterance.trim();
        let (folded, offsets) = fold_with_offsets(trimmed);

        let Some(candidate) = self
            .candidates
            .iter()
            .find(|c| starts_with_word(&folded, &c.folded))
        else {
            return WakeMatch::unmatched(trimmed);
        };

        if candidate.confidence < self.min_confidence {
            debug!(
                wake_word = %candidate.canonical,
                confidence = candidate.confidence,
                "wake candidate below minimum confidence"
            );
            return WakeMatch {
                matched: false,
                confidence: candidate.confidence,
                wake_word: Some(candidate.canonical.clone()),
                alias: candidate.alias.clone(),
                command: trimmed.to_string(),
                via: WakeVia::None,
            };
        }

        let prefix_chars = candidate.folded.chars().count();
        let cut = if prefix_chars == 0 {
            0
        } else {
            offsets[prefix_chars - 1]
        };
        let command = trimmed[cut..]
            .trim_start_matches(|c: char| {
                c.is_whitespace() || is_combining_mark(c) || matches!(c, ',' | '!' | '.' | ':' | ';')
            })
            .trim_end()
            .to_string();

        let via = if candidate.alias.is_some() {
            WakeVia::Phonetic
        } else {
            WakeVia::Exact
        };
        debug!(
            via = via.as_str(),
            wake_word = %candidate.canonical,
            alias = candidate.alias.as_deref().unwrap_or(""),
            confidence = candidate.confidence,
            "wake phrase detected"
        );

        WakeMatch {
            matched: true,
            confidence: candidate.confidence,
            wake_word: Some(candidate.canonical.clone()),
            alias: candidate.alias.clone(),
            command,
            via,
        }
    }
}

/// Fold case and diacritics, remembering for every output char the byte
/// offset in `text` just past the char it came from
fn fold_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    for (start, c) in text.char_indices() {
        let end = start + c.len_utf8();
        for lower in c.to_lowercase() {
            for d in std::iter::once(lower).nfd().filter(|d| !is_combining_mark(*d)) {
                folded.push(d);
                offsets.push(end);
            }
        }
    }
    (folded, offsets)
}

/// Prefix match that must end on a word boundary
fn starts_with_word(text: &str, prefix: &str) -> bool {
    if !text.starts_with(prefix) {
        return false;
    }
    match text[prefix.len()..].chars().next() {
        None => true,
        Some(next) => !next.is_alphanumeric(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripper(min_confidence: f32) -> WakeWordStripper {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            "ok nura".to_string(),
            vec!["ok nora".to_string(), "oye nura".to_string()],
        );
        WakeWordStripper::new(&["ok nura".to_string()], &aliases, min_confidence)
    }

    #[test]
    fn test_exact_wake_word() {
        let result = stripper(0.7).strip("ok nura abre dashboard");
        assert!(result.matched);
        assert_eq!(result.command, "abre dashboard");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.via, WakeVia::Exact);
        assert_eq!(result.wake_word.as_deref(), Some("ok nura"));
        assert!(result.alias.is_none());
    }

    #[test]
    fn test_alias_is_phonetic() {
        let result = stripper(0.7).strip("ok nora abrir órdenes");
        assert!(result.matched);
        assert_eq!(result.via, WakeVia::Phonetic);
        assert_eq!(result.command, "abrir órdenes");
        assert_eq!(result.alias.as_deref(), Some("ok nora"));
        // one edit over seven chars
        assert!((result.confidence - (1.0 - 1.0 / 7.0)).abs() < 1e-6);
    }

    #[test]
    fn test_alias_below_minimum_is_diagnostic_only() {
        // "oye nura" vs "ok nura": two edits over eight chars = 0.75
        let result = stripper(0.8).strip("oye nura abre el menú");
        assert!(!result.matched);
        assert_eq!(result.wake_word.as_deref(), Some("ok nura"));
        assert!((result.confidence - 0.75).abs() < 1e-6);
        assert_eq!(result.command, "oye nura abre el menú");
        assert_eq!(result.via, WakeVia::None);
    }

    #[test]
    fn test_no_wake_word() {
        let result = stripper(0.7).strip("hola nura dime el clima");
        assert!(!result.matched);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.command, "hola nura dime el clima");
    }

    #[test]
    fn test_case_and_diacritics() {
        let result = stripper(0.7).strip("OK Nurá, abre el menú");
        assert!(result.matched);
        assert_eq!(result.via, WakeVia::Exact);
        assert_eq!(result.command, "abre el menú");
    }

    #[test]
    fn test_requires_word_boundary() {
        let result = stripper(0.7).strip("ok nuraabre el menú");
        assert!(!result.matched);
    }

    #[test]
    fn test_wake_word_only() {
        let result = stripper(0.7).strip("  ok nura  ");
        assert!(result.matched);
        assert_eq!(result.command, "");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut aliases = BTreeMap::new();
        aliases.insert("ok nura".to_string(), vec!["ok".to_string()]);
        let stripper = WakeWordStripper::new(&["ok nura".to_string()], &aliases, 0.0);
        let result = stripper.strip("ok nura abre");
        assert_eq!(result.via, WakeVia::Exact);
        assert_eq!(result.command, "abre");
    }
}
