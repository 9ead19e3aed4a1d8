//! Runtime configuration loaded from `nura.toml`
//!
//! Every field has a default, so a missing file or a partial file is valid.
//! `validate` checks the ranges serde cannot express.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::catalog::CatalogEntry;
use crate::locale::LocaleSetting;
use crate::matcher::FuzzyStrategy;

pub const DEFAULT_CONFIG_PATH: &str = "nura.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Minimum catalog score for a direct match (0.0-1.0)
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub strategy: FuzzyStrategy,
    #[serde(default)]
    pub locale: LocaleSetting,
    /// Classify without side-effects
    #[serde(default)]
    pub explain: bool,
    #[serde(default)]
    pub wake: WakeConfig,
    /// Replaces the built-in catalog when present
    #[serde(default)]
    pub catalog: Option<Vec<CatalogEntry>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            strategy: FuzzyStrategy::default(),
            locale: LocaleSetting::default(),
            explain: false,
            wake: WakeConfig::default(),
            catalog: None,
        }
    }
}

fn default_threshold() -> f32 {
    0.7
}

// ============================================================================
// Wake Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WakeConfig {
    /// Drop utterances that do not start with an accepted wake phrase
    #[serde(default)]
    pub required: bool,
    /// Phonetic aliases scoring under this are not accepted
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_wake_phrases")]
    pub phrases: Vec<String>,
    /// Canonical phrase -> misheard variants
    #[serde(default = "default_wake_aliases")]
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            required: false,
            min_confidence: default_min_confidence(),
            phrases: default_wake_phrases(),
            aliases: default_wake_aliases(),
        }
    }
}

fn default_min_confidence() -> f32 {
    0.6
}

fn default_wake_phrases() -> Vec<String> {
    vec!["ok nura".into(), "oye nura".into()]
}

fn default_wake_aliases() -> BTreeMap<String, Vec<String>> {
    let mut aliases = BTreeMap::new();
    aliases.insert(
        "ok nura".into(),
        vec![
            "ok nora".into(),
            "okay nura".into(),
            "ok lura".into(),
            "ok nula".into(),
            "hola nura".into(),
        ],
    );
    aliases
}

impl Config {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let text = fs::read_to_string(path)?;
        let config = Self::parse(&text)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.wake.min_confidence) {
            return Err(ConfigError::Invalid(format!(
                "wake.min_confidence {} outside [0, 1]",
                self.wake.min_confidence
            )));
        }
        if let Some(catalog) = &self.catalog {
            if let Some(entry) = catalog.iter().find(|e| e.intent.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "catalog pattern '{}' has an empty intent",
                    entry.pattern
                )));
            }
        }
        Ok(())
    }
}
