//! Spoken numeral extraction
//!
//! Converts number words to digits ("borra la orden quince" ->
//! "borra la orden 15") and records the value under the `"id"` key.
//!
//! When several distinct number words appear in one utterance the word pass
//! leaves `"id"` at the entry processed last in *table order*, not the one
//! spoken last. The digit scan that follows then overwrites `"id"` with the
//! first digit run in the substituted text. This ordering dependence is known
//! and intentionally left as is.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::fuzzy::normalize;
use crate::locale::Locale;

// Compounds come first: "\bone\b" also matches inside "twenty-one", so the
// longer phrases must be substituted before their parts.
const EN_TABLE: &[(&str, i64)] = &[
    ("thirty-one", 31),
    ("thirty one", 31),
    ("thirty-two", 32),
    ("thirty two", 32),
    ("thirty-three", 33),
    ("thirty three", 33),
    ("thirty-four", 34),
    ("thirty four", 34),
    ("thirty-five", 35),
    ("thirty five", 35),
    ("thirty-six", 36),
    ("thirty six", 36),
    ("thirty-seven", 37),
    ("thirty seven", 37),
    ("thirty-eight", 38),
    ("thirty eight", 38),
    ("thirty-nine", 39),
    ("thirty nine", 39),
    ("forty-one", 41),
    ("forty one", 41),
    ("forty-two", 42),
    ("forty two", 42),
    ("forty-three", 43),
    ("forty three", 43),
    ("forty-four", 44),
    ("forty four", 44),
    ("forty-five", 45),
    ("forty five", 45),
    ("forty-six", 46),
    ("forty six", 46),
    ("forty-seven", 47),
    ("forty seven", 47),
    ("forty-eight", 48),
    ("forty eight", 48),
    ("forty-nine", 49),
    ("forty nine", 49),
    ("twenty-one", 21),
    ("twenty one", 21),
    ("twenty-two", 22),
    ("twenty two", 22),
    ("twenty-three", 23),
    ("twenty three", 23),
    ("twenty-four", 24),
    ("twenty four", 24),
    ("twenty-five", 25),
    ("twenty five", 25),
    ("twenty-six", 26),
    ("twenty six", 26),
    ("twenty-seven", 27),
    ("twenty seven", 27),
    ("twenty-eight", 28),
    ("twenty eight", 28),
    ("twenty-nine", 29),
    ("twenty nine", 29),
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
];

// "treinta y cinco" would otherwise become "30 y 5"
const ES_TABLE: &[(&str, i64)] = &[
    ("treinta y uno", 31),
    ("treinta y una", 31),
    ("treinta y dos", 32),
    ("treinta y tres", 33),
    ("treinta y cuatro", 34),
    ("treinta y cinco", 35),
    ("treinta y seis", 36),
    ("treinta y siete", 37),
    ("treinta y ocho", 38),
    ("treinta y nueve", 39),
    ("cuarenta y uno", 41),
    ("cuarenta y una", 41),
    ("cuarenta y dos", 42),
    ("cuarenta y tres", 43),
    ("cuarenta y cuatro", 44),
    ("cuarenta y cinco", 45),
    ("cuarenta y seis", 46),
    ("cuarenta y siete", 47),
    ("cuarenta y ocho", 48),
    ("cuarenta y nueve", 49),
    ("cero", 0),
    ("uno", 1),
    ("dos", 2),
    ("tres", 3),
    ("cuatro", 4),
    ("cinco", 5),
    ("seis", 6),
    ("siete", 7),
    ("ocho", 8),
    ("nueve", 9),
    ("diez", 10),
    ("once", 11),
    ("doce", 12),
    ("trece", 13),
    ("catorce", 14),
    ("quince", 15),
    ("dieciséis", 16),
    ("dieciseis", 16),
    ("diecisiete", 17),
    ("dieciocho", 18),
    ("diecinueve", 19),
    ("veinte", 20),
    ("veintiuno", 21),
    ("veintiuna", 21),
    ("veintidós", 22),
    ("veintidos", 22),
    ("veintitrés", 23),
    ("veintitres", 23),
    ("veinticuatro", 24),
    ("veinticinco", 25),
    ("veintiséis", 26),
    ("veintiseis", 26),
    ("veintisiete", 27),
    ("veintiocho", 28),
    ("veintinueve", 29),
    ("treinta", 30),
    ("cuarenta", 40),
    ("cincuenta", 50),
];

/// Word -> value table for a locale, in iteration order
pub fn numeral_table(locale: Locale) -> &'static [(&'static str, i64)] {
    match locale {
        Locale::Es => ES_TABLE,
        Locale::En => EN_TABLE,
    }
}

/// Text with number words replaced, plus the extracted values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NumeralExtraction {
    pub cleaned: String,
    pub numbers: BTreeMap<String, i64>,
}

impl NumeralExtraction {
    pub fn id(&self) -> Option<i64> {
        self.numbers.get("id").copied()
    }
}

struct CompiledEntry {
    regex: Regex,
    value: i64,
}

/// Precompiled word-boundary matchers for both locale tables
pub struct NumeralExtractor {
    es: Vec<CompiledEntry>,
    en: Vec<CompiledEntry>,
    digits: Regex,
}

fn compile(table: &[(&str, i64)]) -> Result<Vec<CompiledEntry>, regex::Error> {
    table
        .iter()
        .map(|(word, value)| {
            let regex = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))?;
            Ok(CompiledEntry {
                regex,
                value: *value,
            })
        })
        .collect()
}

impl NumeralExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            es: compile(ES_TABLE)?,
            en: compile(EN_TABLE)?,
            digits: Regex::new(r"\b(\d+)\b")?,
        })
    }

    /// Replace every number word with digits and record the value as `"id"`
    pub fn extract(&self, text: &str, locale: Locale) -> NumeralExtraction {
        let entries = match locale {
            Locale::Es => &self.es,
            Locale::En => &self.en,
        };

        let mut numbers = BTreeMap::new();
        let mut cleaned = text.to_string();

        for entry in entries {
            if entry.regex.is_match(&cleaned) {
                numbers.insert("id".to_string(), entry.value);
                cleaned = entry
                    .regex
                    .replace_all(&cleaned, entry.value.to_string().as_str())
                    .into_owned();
            }
        }

        if let Some(caps) = self.digits.captures(&cleaned) {
            if let Ok(value) = caps[1].parse::<i64>() {
                numbers.insert("id".to_string(), value);
            }
        }

        NumeralExtraction { cleaned, numbers }
    }
}

/// Parse a single numeral: digits, a table word, or space-separated words
/// that sum ("veinte uno" -> 21)
pub fn parse_numeral(input: &str, locale: Locale) -> Option<i64> {
    let normalized = normalize(input.trim());
    if normalized.is_empty() {
        return None;
    }

    let digits = normalized.strip_prefix('-').unwrap_or(&normalized);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return normalized.parse().ok();
    }

    let table = numeral_table(locale);
    let lookup = |word: &str| {
        table
            .iter()
            .find(|(entry, _)| normalize(entry) == word)
            .map(|(_, value)| *value)
    };

    if let Some(value) = lookup(&normalized) {
        return Some(value);
    }

    if normalized.contains(' ') {
        let mut total = 0;
        for segment in normalized.split_whitespace() {
            total += lookup(segment)?;
        }
        return Some(total);
    }

    None
}
