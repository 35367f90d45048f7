// File: src/learning.rs
use crate::core::engine::GenerationManager;
use crate::core::normalize::{split_words, Normalizer};
use crate::core::types::{FailedWord, Frequency, MergeSummary, RemovalSummary};
use crate::error::{Result, SpellError};
use crate::store::WordStore;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Feeds raw token batches into the word store and keeps the published
/// dictionary in step with it.
pub struct IngestionPipeline {
    store: Arc<dyn WordStore>,
    normalizer: Normalizer,
    reload_target: Option<Arc<GenerationManager>>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn WordStore>, normalizer: Normalizer) -> Self {
        Self {
            store,
            normalizer,
            reload_target: None,
        }
    }

    /// A pipeline that shares the manager's store and normalization and
    /// signals it to reload after every batch that changed something.
    pub fn for_manager(store: Arc<dyn WordStore>, manager: Arc<GenerationManager>) -> Self {
        Self {
            store,
            normalizer: manager.normalizer().clone(),
            reload_target: Some(manager),
        }
    }

    pub fn normalize<S: AsRef<str>>(&self, raw_tokens: &[S]) -> Vec<String> {
        self.normalizer.normalize(raw_tokens)
    }

    /// Per-word counts of a raw token batch. Does not touch the store.
    pub fn count_frequencies<S: AsRef<str>>(&self, raw_tokens: &[S]) -> BTreeMap<String, Frequency> {
        let mut counts = BTreeMap::new();
        for word in self.normalize(raw_tokens) {
            *counts.entry(word).or_insert(0) += 1;
        }
        counts
    }

    /// Merges words into the store.
    ///
    /// Words are normalized first (a no-op for words that already are), so
    /// the store never holds two spellings of one word. Duplicates inside the
    /// batch are counted, then each distinct word is upserted once with that
    /// count. Merging is additive: the same batch submitted twice doubles the
    /// frequencies. Words that fail to persist are reported in
    /// `PartialIngestionFailure`; the others stay committed.
    pub async fn merge_batch<S: AsRef<str>>(
        &self,
        words: &[S],
        contributor: Option<&str>,
    ) -> Result<MergeSummary> {
        let counts: Vec<(String, Frequency)> = self.count_frequencies(words).into_iter().collect();

        let results = self.store.upsert_batch(&counts, contributor).await;

        let mut summary = MergeSummary::default();
        let mut failed = Vec::new();
        for ((word, _), result) in counts.into_iter().zip(results) {
            match result {
                Ok(outcome) if outcome.was_inserted => summary.inserted_words.push(word),
                Ok(_) => summary.updated_words.push(word),
                Err(e) => {
                    tracing::warn!("Failed to persist '{}': {}", word, e);
                    failed.push(FailedWord {
                        word,
                        reason: e.to_string(),
                    });
                }
            }
        }
        summary.inserted_count = summary.inserted_words.len();
        summary.updated_count = summary.updated_words.len();

        tracing::info!(
            inserted = summary.inserted_count,
            updated = summary.updated_count,
            failed = failed.len(),
            "merged ingestion batch"
        );

        if summary.has_changes() {
            if let Some(manager) = &self.reload_target {
                manager.spawn_reload();
            }
        }

        if failed.is_empty() {
            Ok(summary)
        } else {
            Err(SpellError::PartialIngestionFailure { failed, summary })
        }
    }

    /// Entry point for raw token batches from outside the crate.
    pub async fn ingest_batch<S: AsRef<str>>(
        &self,
        raw_tokens: &[S],
        contributor: Option<&str>,
    ) -> Result<MergeSummary> {
        self.merge_batch(raw_tokens, contributor).await
    }

    /// Deletes words from the store and reloads if any row went away.
    /// The published filter only forgets a word once that reload lands.
    pub async fn remove_words<S: AsRef<str>>(&self, raw_tokens: &[S]) -> Result<RemovalSummary> {
        let words: Vec<String> = self
            .normalize(raw_tokens)
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let summary = self.store.remove_words(&words).await?;

        tracing::info!(
            removed = summary.removed.len(),
            not_found = summary.not_found.len(),
            "removed words"
        );

        if !summary.removed.is_empty() {
            if let Some(manager) = &self.reload_target {
                manager.spawn_reload();
            }
        }
        Ok(summary)
    }

    /// Splits free text on whitespace, then ingests the tokens.
    pub async fn ingest_text(&self, text: &str, contributor: Option<&str>) -> Result<MergeSummary> {
        self.ingest_batch(&split_words(text), contributor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpellConfig;
    use crate::core::types::WordRecord;
    use crate::store::MemoryWordStore;
    use std::time::Duration;

    fn pipeline(store: Arc<MemoryWordStore>) -> IngestionPipeline {
        IngestionPipeline::new(store, Normalizer::default())
    }

    async fn wait_for_generation(manager: &GenerationManager, generation_id: u64) {
        for _ in 0..200 {
            if manager.stats().map(|s| s.generation_id >= generation_id).unwrap_or(false) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("generation {} never published", generation_id);
    }

    #[test]
    fn test_count_frequencies() {
        let pipeline = pipeline(Arc::new(MemoryWordStore::new()));
        let counts = pipeline.count_frequencies(&["Rust,", "rust", "go", "!!"]);
        assert_eq!(counts.get("rust"), Some(&2));
        assert_eq!(counts.get("go"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_duplicates_are_aggregated() {
        let store = Arc::new(MemoryWordStore::new());
        let pipeline = pipeline(store.clone());

        let summary = pipeline
            .ingest_batch(&["word", "word", "Word.", "other"], Some("alice"))
            .await
            .unwrap();

        assert_eq!(summary.inserted_count, 2);
        assert_eq!(summary.updated_count, 0);
        assert_eq!(summary.inserted_words, vec!["other", "word"]);
        assert_eq!(store.get("word").await.unwrap().frequency, 3);
        assert_eq!(store.get("word").await.unwrap().contributor.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_merge_is_additive() {
        let store = Arc::new(MemoryWordStore::new());
        let pipeline = pipeline(store.clone());

        let first = pipeline.ingest_batch(&["word"], None).await.unwrap();
        assert_eq!(first.inserted_words, vec!["word"]);
        let second = pipeline.ingest_batch(&["word"], None).await.unwrap();
        assert_eq!(second.updated_words, vec!["word"]);
        assert_eq!(second.inserted_count, 0);

        assert_eq!(store.get("word").await.unwrap().frequency, 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_words() {
        let store = Arc::new(MemoryWordStore::new());
        store.fail_word("bad");
        let pipeline = pipeline(store.clone());

        let result = pipeline.ingest_batch(&["good", "bad", "fine"], None).await;
        match result {
            Err(SpellError::PartialIngestionFailure { failed, summary }) => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].word, "bad");
                assert_eq!(summary.inserted_words, vec!["fine", "good"]);
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
        assert!(store.get("good").await.is_some());
        assert!(store.get("fine").await.is_some());
        assert!(store.get("bad").await.is_none());
    }

    #[tokio::test]
    async fn test_merge_normalizes_before_persisting() {
        let store = Arc::new(MemoryWordStore::new());
        let pipeline = pipeline(store.clone());

        pipeline.merge_batch(&["Apple".to_string()], None).await.unwrap();
        let second = pipeline.merge_batch(&["apple".to_string()], None).await.unwrap();

        assert_eq!(second.updated_words, vec!["apple"]);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("apple").await.unwrap().frequency, 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let store = Arc::new(MemoryWordStore::new());
        let pipeline = pipeline(store.clone());
        let summary = pipeline.ingest_batch(&["...", " "], None).await.unwrap();
        assert!(!summary.has_changes());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_ingest_text_splits_on_whitespace() {
        let store = Arc::new(MemoryWordStore::new());
        let pipeline = pipeline(store.clone());
        let summary = pipeline
            .ingest_text("the cat\tsat on the mat.", None)
            .await
            .unwrap();
        assert_eq!(summary.inserted_count, 5);
        assert_eq!(store.get("the").await.unwrap().frequency, 2);
        assert!(store.get("mat").await.is_some());
    }

    #[tokio::test]
    async fn test_ingestion_triggers_reload() {
        let store = Arc::new(MemoryWordStore::with_records(vec![WordRecord::new("apple", 5)]));
        let manager = Arc::new(GenerationManager::new(store.clone(), SpellConfig::default()).unwrap());
        manager.initialize().await.unwrap();
        let pipeline = IngestionPipeline::for_manager(store.clone(), manager.clone());

        pipeline.ingest_batch(&["banana", "banana"], Some("bob")).await.unwrap();
        wait_for_generation(&manager, 2).await;

        assert!(manager.contains("banana").unwrap());
        let top = manager.suggest("banan", 2, crate::core::types::Verbosity::Top).unwrap();
        assert_eq!(top[0].word, "banana");
        assert_eq!(top[0].frequency, 2);
    }

    #[tokio::test]
    async fn test_ingest_during_rebuild_is_published() {
        let store = Arc::new(
            MemoryWordStore::with_records(vec![WordRecord::new("alpha", 1)])
                .with_snapshot_delay(Duration::from_millis(150)),
        );
        let manager = Arc::new(GenerationManager::new(store.clone(), SpellConfig::default()).unwrap());
        manager.initialize().await.unwrap();
        let pipeline = IngestionPipeline::for_manager(store.clone(), manager.clone());

        let in_flight = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.reload().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        let summary = pipeline.ingest_batch(&["beta"], None).await.unwrap();
        assert_eq!(summary.inserted_words, vec!["beta"]);

        in_flight.await.unwrap().unwrap();
        wait_for_generation(&manager, 3).await;
        assert!(manager.contains("beta").unwrap());
        assert_eq!(manager.stats().unwrap().word_count, 2);
    }

    #[tokio::test]
    async fn test_removed_word_leaves_dictionary_after_reload() {
        let store = Arc::new(MemoryWordStore::with_records(vec![
            WordRecord::new("apple", 5),
            WordRecord::new("banana", 2),
        ]));
        let manager = Arc::new(GenerationManager::new(store.clone(), SpellConfig::default()).unwrap());
        manager.initialize().await.unwrap();
        assert!(manager.contains("banana").unwrap());
        let pipeline = IngestionPipeline::for_manager(store.clone(), manager.clone());

        let summary = pipeline
            .remove_words(&["Banana!", "banana", "cherry"])
            .await
            .unwrap();
        assert_eq!(summary.removed, vec!["banana"]);
        assert_eq!(summary.not_found, vec!["cherry"]);

        wait_for_generation(&manager, 2).await;
        assert!(!manager.contains("banana").unwrap());
        assert!(manager.contains("apple").unwrap());
        let stats = manager.stats().unwrap();
        assert_eq!(stats.word_count, 1);
        assert_eq!(stats.estimated_count, 1);
    }

    #[tokio::test]
    async fn test_removing_unknown_words_does_not_reload() {
        let store = Arc::new(MemoryWordStore::with_records(vec![WordRecord::new("apple", 5)]));
        let manager = Arc::new(GenerationManager::new(store.clone(), SpellConfig::default()).unwrap());
        manager.initialize().await.unwrap();
        let pipeline = IngestionPipeline::for_manager(store.clone(), manager.clone());

        let summary = pipeline.remove_words(&["pear"]).await.unwrap();
        assert!(summary.removed.is_empty());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.snapshot_calls(), 1);
    }
}
