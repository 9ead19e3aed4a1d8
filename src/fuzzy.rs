//! Fuzzy string matching utilities using Levenshtein distance
//!
//! Shared by wake-word detection, intent scoring and the confirmation
//! lexicon. Everything here is lexical: no phonetic codes, no models.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Calculate Levenshtein distance between two strings (in chars, not bytes)
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

/// Normalized edit similarity: `1 - levenshtein / max(len)`, in `[0, 1]`.
///
/// Two empty strings are identical and score 1.0.
pub fn edit_similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    (1.0 - distance as f32 / max_len as f32).clamp(0.0, 1.0)
}

/// Fraction of `pattern` words that also appear in `text`
pub fn word_overlap(text: &str, pattern: &str) -> f32 {
    let pattern_words: Vec<&str> = pattern.split_whitespace().collect();
    if pattern_words.is_empty() {
        return 0.0;
    }
    let text_words: Vec<&str> = text.split_whitespace().collect();
    let hits = pattern_words
        .iter()
        .filter(|w| text_words.contains(w))
        .count();
    hits as f32 / pattern_words.len() as f32
}

/// Strip diacritics: "menú de órdenes" -> "menu de ordenes"
pub fn fold_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Lowercase and fold diacritics, keeping punctuation and spacing intact
pub fn normalize(text: &str) -> String {
    fold_diacritics(&text.to_lowercase())
}

/// Clean text for matching: lowercase, fold diacritics, drop punctuation,
/// collapse whitespace
pub fn clean_for_matching(text: &str) -> String {
    let folded = normalize(text);
    let kept: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
