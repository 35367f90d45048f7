// File: src/config.rs
use crate::error::{Result, SpellError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Characters stripped from every token before it reaches the dictionary:
/// ASCII punctuation and digits, typographic quotes, dashes, bullets, and Kannada digits.
pub const DEFAULT_EXCLUDED_CHARS: &str = concat!(
    "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~",
    "0123456789",
    "\u{2018}\u{2019}\u{201C}\u{201D}\u{02BC}\u{2013}\u{2014}\u{2022}\u{2026}",
    "\u{0CE6}\u{0CE7}\u{0CE8}\u{0CE9}\u{0CEA}\u{0CEB}\u{0CEC}\u{0CED}\u{0CEE}\u{0CEF}",
);

/// Tunables for filter sizing, suggestion depth and token normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellConfig {
    /// Target false-positive rate of the membership filter, in (0, 1].
    pub error_rate: f64,
    /// Filter capacity floor, used when the store holds fewer words.
    pub min_capacity: usize,
    /// Deletion depth of the suggestion index.
    pub max_edit_distance: usize,
    /// Number of leading chars deletion keys are generated from.
    pub prefix_length: usize,
    pub excluded_chars: String,
    pub lowercase: bool,
    /// Rebuild from the store on this period, in seconds. Off when unset.
    pub reload_interval_secs: Option<u64>,
}

impl Default for SpellConfig {
    fn default() -> Self {
        Self {
            error_rate: 0.001,
            min_capacity: 100_000,
            max_edit_distance: 2,
            prefix_length: 7,
            excluded_chars: DEFAULT_EXCLUDED_CHARS.to_string(),
            lowercase: true,
            reload_interval_secs: None,
        }
    }
}

impl SpellConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SpellConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        validate_error_rate(self.error_rate)?;
        if self.min_capacity == 0 {
            return Err(SpellError::InvalidConfiguration(
                "min_capacity must be at least 1".to_string(),
            ));
        }
        if self.prefix_length < 1 {
            return Err(SpellError::InvalidConfiguration(
                "prefix_length must be at least 1".to_string(),
            ));
        }
        if self.reload_interval_secs == Some(0) {
            return Err(SpellError::InvalidConfiguration(
                "reload_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reload_interval(&self) -> Option<Duration> {
        self.reload_interval_secs.map(Duration::from_secs)
    }
}

pub(crate) fn validate_error_rate(error_rate: f64) -> Result<()> {
    if error_rate > 0.0 && error_rate <= 1.0 {
        Ok(())
    } else {
        Err(SpellError::InvalidConfiguration(format!(
            "error rate {} outside (0, 1]",
            error_rate
        )))
    }
}
