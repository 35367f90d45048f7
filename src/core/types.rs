// src/core/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A word frequency count. Only ever grows through ingestion.
pub type Frequency = u64;

/// One dictionary row as the word store holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    /// Normalized key; unique within a store.
    pub word: String,
    /// Total number of times this word has been ingested.
    pub frequency: Frequency,
    /// Who first contributed the word, if known.
    pub contributor: Option<String>,
}

impl WordRecord {
    pub fn new(word: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            word: word.into(),
            frequency,
            contributor: None,
        }
    }
}

/// Controls how many suggestions a lookup returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// The single best suggestion.
    Top,
    /// Every suggestion tied at the smallest distance found.
    Closest,
    /// Every suggestion within the edit distance, fully ranked.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub word: String,
    pub frequency: Frequency,
    pub distance: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub capacity: usize,
    pub error_rate: f64,
    pub estimated_count: usize,
    pub is_empty: bool,
}

/// What the HTTP layer reports about the currently published generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation_id: u64,
    pub word_count: usize,
    pub capacity: usize,
    pub error_rate: f64,
    pub estimated_count: usize,
    pub max_edit_distance: usize,
    pub last_built_at: DateTime<Utc>,
}

/// A word that could not be written to the store, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedWord {
    pub word: String,
    pub reason: String,
}

/// Result of merging one ingestion batch into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub inserted_words: Vec<String>,
    pub updated_words: Vec<String>,
    pub inserted_count: usize,
    pub updated_count: usize,
}

/// Result of removing words from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalSummary {
    pub removed: Vec<String>,
    pub not_found: Vec<String>,
}

impl MergeSummary {
    pub fn has_changes(&self) -> bool {
        self.inserted_count + self.updated_count > 0
    }
}
