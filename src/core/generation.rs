// File: src/core/generation.rs
use crate::config::SpellConfig;
use crate::core::normalize::Normalizer;
use crate::core::types::{GenerationStats, Suggestion, Verbosity, WordRecord};
use crate::error::Result;
use crate::filter::bloom::MembershipFilter;
use crate::fuzzy::symspell::SuggestionIndex;
use chrono::{DateTime, Utc};

/// One fully built, immutable copy of the dictionary's derived indexes.
///
/// Built off to the side during a reload, then published whole. Readers hold
/// an `Arc` to it, so it is dropped only after the last in-flight lookup ends.
#[derive(Debug)]
pub struct DictionaryGeneration {
    generation_id: u64,
    filter: MembershipFilter,
    index: SuggestionIndex,
    normalizer: Normalizer,
    built_at: DateTime<Utc>,
    word_count: usize,
}

impl DictionaryGeneration {
    pub fn build(generation_id: u64, records: &[WordRecord], config: &SpellConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = Normalizer::from_config(config);

        let index = SuggestionIndex::build(
            records,
            config.max_edit_distance,
            config.prefix_length,
            normalizer.clone(),
        )?;

        let words: Vec<String> = records
            .iter()
            .filter_map(|record| normalizer.normalize_word(&record.word))
            .collect();
        let filter = MembershipFilter::build(&words, config.min_capacity, config.error_rate)?;

        Ok(Self {
            generation_id,
            word_count: index.word_count(),
            filter,
            index,
            normalizer,
            built_at: Utc::now(),
        })
    }

    /// `false` means the word is definitely not in this generation.
    pub fn contains(&self, word: &str) -> bool {
        match self.normalizer.normalize_word(word) {
            Some(word) => self.filter.contains(&word),
            None => false,
        }
    }

    pub fn suggest(
        &self,
        word: &str,
        max_edit_distance: usize,
        verbosity: Verbosity,
    ) -> Result<Vec<Suggestion>> {
        self.index.lookup(word, max_edit_distance, verbosity)
    }

    pub fn stats(&self) -> GenerationStats {
        let filter = self.filter.stats();
        GenerationStats {
            generation_id: self.generation_id,
            word_count: self.word_count,
            capacity: filter.capacity,
            error_rate: filter.error_rate,
            estimated_count: filter.estimated_count,
            max_edit_distance: self.index.max_edit_distance(),
            last_built_at: self.built_at,
        }
    }

    pub fn generation_id(&self) -> u64 {
        self.generation_id
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn filter(&self) -> &MembershipFilter {
        &self.filter
    }

    pub fn index(&self) -> &SuggestionIndex {
        &self.index
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}
