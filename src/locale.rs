//! Locale selection - forced setting or keyword-frequency heuristic
//!
//! This is a word count, not a language model. Short utterances get
//! misclassified now and then and that is accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::fuzzy::clean_for_matching;

/// Languages the pipeline actually works in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Es,
    En,
}

impl Locale {
    /// Winner on a keyword tie
    pub const DEFAULT: Locale = Locale::Es;

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing locale setting, including `auto` and regional variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocaleSetting {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "es")]
    Es,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "es-419")]
    Es419,
}

impl LocaleSetting {
    /// The forced base language, or `None` for `auto`
    pub fn forced(&self) -> Option<Locale> {
        match self {
            LocaleSetting::Auto => None,
            LocaleSetting::Es | LocaleSetting::Es419 => Some(Locale::Es),
            LocaleSetting::En => Some(Locale::En),
        }
    }
}

impl fmt::Display for LocaleSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocaleSetting::Auto => "auto",
            LocaleSetting::Es => "es",
            LocaleSetting::En => "en",
            LocaleSetting::Es419 => "es-419",
        };
        f.write_str(s)
    }
}

impl FromStr for LocaleSetting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(LocaleSetting::Auto),
            "es" => Ok(LocaleSetting::Es),
            "en" => Ok(LocaleSetting::En),
            "es-419" => Ok(LocaleSetting::Es419),
            other => Err(ConfigError::Invalid(format!("unknown locale '{}'", other))),
        }
    }
}

// Folded (no diacritics) so "menú" and "menu" count the same
const ES_KEYWORDS: &[&str] = &[
    "abre", "elimina", "borra", "menu", "ordenes", "pedidos", "orden", "si", "telemetria",
    "capacidades", "ayuda", "recursos", "herramientas", "explica", "agrega", "anade", "modifica",
    "actualiza", "muestra", "listar", "conectar",
];

const EN_KEYWORDS: &[&str] = &[
    "open", "delete", "menu", "orders", "order", "yes", "telemetry", "capabilities", "help",
    "resources", "tools", "explain", "add", "update", "show", "list", "connect",
];

/// Pick the working locale for a command
pub fn detect_locale(setting: LocaleSetting, command: &str) -> Locale {
    if let Some(forced) = setting.forced() {
        return forced;
    }

    let cleaned = clean_for_matching(command);
    let mut es_count = 0;
    let mut en_count = 0;
    for token in cleaned.split_whitespace() {
        if ES_KEYWORDS.contains(&token) {
            es_count += 1;
        }
        if EN_KEYWORDS.contains(&token) {
            en_count += 1;
        }
    }

    if es_count > en_count {
        Locale::Es
    } else if en_count > es_count {
        Locale::En
    } else {
        Locale::DEFAULT
    }
}

/// Outcome of synonym normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymMatch {
    pub input: String,
    pub normalized: String,
    pub matched: bool,
    /// Distinct spellings seen: canonical, folded input, raw input
    pub variants: Vec<String>,
}

fn synonyms(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::Es => &[
            ("pedido", "órdenes"),
            ("pedidos", "órdenes"),
            ("orden", "órdenes"),
            ("ordenes", "órdenes"),
        ],
        Locale::En => &[("orders", "orders"), ("order", "orders")],
    }
}

/// Map an order-word synonym to its canonical term
pub fn normalize_synonym(term: &str, locale: Locale) -> SynonymMatch {
    let folded = crate::fuzzy::normalize(term.trim());
    let canonical = synonyms(locale)
        .iter()
        .find(|(word, _)| *word == folded)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| folded.clone());

    let mut variants: Vec<String> = Vec::new();
    for v in [canonical.clone(), folded.clone(), term.to_string()] {
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    }

    SynonymMatch {
        input: term.to_string(),
        matched: canonical != folded,
        normalized: canonical,
        variants,
    }
}
