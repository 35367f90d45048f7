// File: src/fuzzy/symspell.rs
use crate::core::normalize::Normalizer;
use crate::core::types::{Frequency, Suggestion, Verbosity, WordRecord};
use crate::error::{Result, SpellError};
use crate::fuzzy::distance::damerau_levenshtein;
use ahash::{AHashMap, AHashSet};
use std::cmp::Reverse;

/// Index into `SuggestionIndex::entries`.
pub type WordId = usize;

/// A frequency-ranked fuzzy lookup structure based on the Symmetric Delete
/// (SymSpell) algorithm. Every dictionary word is registered under all of its
/// deletion variants, so a lookup only has to generate the deletions of the
/// query and intersect keys, independent of dictionary size.
#[derive(Debug, Clone)]
pub struct SuggestionIndex {
    /// Maps a deletion variant (e.g. "aple") to every word that produced it.
    deletes: AHashMap<String, Vec<WordId>>,
    /// Distinct dictionary words with their frequencies, in insertion order.
    entries: Vec<(String, Frequency)>,
    /// Exact lookup: word -> position in `entries`.
    words: AHashMap<String, WordId>,
    max_edit_distance: usize,
    prefix_length: usize,
    normalizer: Normalizer,
}

impl SuggestionIndex {
    pub fn new(max_edit_distance: usize, prefix_length: usize, normalizer: Normalizer) -> Result<Self> {
        if prefix_length < 1 {
            return Err(SpellError::InvalidConfiguration(
                "prefix_length must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            deletes: AHashMap::new(),
            entries: Vec::new(),
            words: AHashMap::new(),
            max_edit_distance,
            prefix_length,
            normalizer,
        })
    }

    /// Builds an index over `records`. Repeated words have their frequencies summed.
    pub fn build<'a, I>(
        records: I,
        max_edit_distance: usize,
        prefix_length: usize,
        normalizer: Normalizer,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a WordRecord>,
    {
        let mut index = Self::new(max_edit_distance, prefix_length, normalizer)?;
        for record in records {
            index.add_word(&record.word, record.frequency);
        }
        tracing::debug!(
            words = index.entries.len(),
            delete_keys = index.deletes.len(),
            "built suggestion index"
        );
        Ok(index)
    }

    /// Registers a word under all of its deletion variants up to the
    /// configured edit distance, the word's own key included.
    fn add_word(&mut self, raw: &str, frequency: Frequency) {
        let Some(word) = self.normalizer.normalize_word(raw) else {
            return;
        };

        if let Some(&id) = self.words.get(&word) {
            self.entries[id].1 = self.entries[id].1.saturating_add(frequency);
            return;
        }

        let id = self.entries.len();
        for edit in self.generate_edits(&word, self.max_edit_distance) {
            self.deletes.entry(edit).or_default().push(id);
        }
        self.words.insert(word.clone(), id);
        self.entries.push((word, frequency));
    }

    /// Looks up a possibly misspelled word.
    ///
    /// Results are ordered by distance ascending, then frequency descending,
    /// then word; `verbosity` decides how much of that list comes back.
    pub fn lookup(
        &self,
        query: &str,
        max_edit_distance: usize,
        verbosity: Verbosity,
    ) -> Result<Vec<Suggestion>> {
        if max_edit_distance > self.max_edit_distance {
            return Err(SpellError::InvalidConfiguration(format!(
                "lookup distance {} exceeds index distance {}",
                max_edit_distance, self.max_edit_distance
            )));
        }
        let Some(query) = self.normalizer.normalize_word(query) else {
            return Ok(vec![]);
        };

        let mut candidates: AHashSet<WordId> = AHashSet::new();
        for edit in self.generate_edits(&query, max_edit_distance) {
            if let Some(word_ids) = self.deletes.get(&edit) {
                candidates.extend(word_ids.iter().copied());
            }
        }

        let mut suggestions: Vec<Suggestion> = candidates
            .into_iter()
            .filter_map(|id| {
                let (word, frequency) = &self.entries[id];
                damerau_levenshtein(&query, word, max_edit_distance).map(|distance| Suggestion {
                    word: word.clone(),
                    frequency: *frequency,
                    distance,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| {
            (a.distance, Reverse(a.frequency), &a.word).cmp(&(b.distance, Reverse(b.frequency), &b.word))
        });

        match verbosity {
            Verbosity::Top => suggestions.truncate(1),
            Verbosity::Closest => {
                if let Some(best) = suggestions.first().map(|s| s.distance) {
                    suggestions.retain(|s| s.distance == best);
                }
            }
            Verbosity::All => {}
        }
        Ok(suggestions)
    }

    /// Frequency of an exact (normalized) dictionary word.
    pub fn frequency(&self, word: &str) -> Option<Frequency> {
        let word = self.normalizer.normalize_word(word)?;
        self.words.get(&word).map(|&id| self.entries[id].1)
    }

    pub fn word_count(&self) -> usize {
        self.entries.len()
    }

    pub fn delete_key_count(&self) -> usize {
        self.deletes.len()
    }

    pub fn max_edit_distance(&self) -> usize {
        self.max_edit_distance
    }

    pub fn prefix_length(&self) -> usize {
        self.prefix_length
    }

    /// All strings reachable by deleting up to `depth` chars from the
    /// first `prefix_length` chars of `word`, the prefix itself included.
    fn generate_edits(&self, word: &str, depth: usize) -> AHashSet<String> {
        let prefix: Vec<char> = word.chars().take(self.prefix_length).collect();

        let mut edits = AHashSet::new();
        edits.insert(prefix.iter().collect::<String>());

        let mut current: Vec<Vec<char>> = vec![prefix];
        for _ in 0..depth {
            let mut next = Vec::new();
            for edit in &current {
                for i in 0..edit.len() {
                    let mut variant = edit.clone();
                    variant.remove(i);
                    if edits.insert(variant.iter().collect()) {
                        next.push(variant);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            current = next;
        }
        edits
    }
}
