// File: src/store.rs
use crate::core::types::{Frequency, RemovalSummary, WordRecord};
use crate::error::{Result, SpellError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

/// Outcome of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub was_inserted: bool,
}

/// Durable table of (word, frequency, contributor) rows.
///
/// Words handed to the store are already normalized. Upserts add `delta`
/// to an existing row or create the row with frequency `delta`.
#[async_trait]
pub trait WordStore: Send + Sync {
    /// One bulk read of every current row.
    async fn snapshot(&self) -> Result<Vec<WordRecord>>;

    async fn upsert_frequency(
        &self,
        word: &str,
        delta: Frequency,
        contributor: Option<&str>,
    ) -> Result<UpsertOutcome>;

    /// Applies many upserts. Each entry fails or commits on its own; the
    /// returned vector lines up with `counts`.
    async fn upsert_batch(
        &self,
        counts: &[(String, Frequency)],
        contributor: Option<&str>,
    ) -> Vec<Result<UpsertOutcome>> {
        let mut results = Vec::with_capacity(counts.len());
        for (word, delta) in counts {
            results.push(self.upsert_frequency(word, *delta, contributor).await);
        }
        results
    }

    /// Deletes the given words. Words with no row are reported as not found.
    /// The call commits or fails as a whole.
    async fn remove_words(&self, words: &[String]) -> Result<RemovalSummary>;
}

/// Deletes `words` from an in-memory table.
pub(crate) fn remove_from(rows: &mut BTreeMap<String, WordRecord>, words: &[String]) -> RemovalSummary {
    let mut summary = RemovalSummary::default();
    for word in words {
        if rows.remove(word).is_some() {
            summary.removed.push(word.clone());
        } else {
            summary.not_found.push(word.clone());
        }
    }
    summary
}

/// Applies one additive merge to an in-memory table.
pub(crate) fn merge_into(
    rows: &mut BTreeMap<String, WordRecord>,
    word: &str,
    delta: Frequency,
    contributor: Option<&str>,
) -> UpsertOutcome {
    match rows.get_mut(word) {
        Some(record) => {
            record.frequency = record.frequency.saturating_add(delta);
            UpsertOutcome { was_inserted: false }
        }
        None => {
            rows.insert(
                word.to_string(),
                WordRecord {
                    word: word.to_string(),
                    frequency: delta,
                    contributor: contributor.map(str::to_string),
                },
            );
            UpsertOutcome { was_inserted: true }
        }
    }
}

/// In-process store. Supports failure injection so callers can exercise
/// their store-unavailable and partial-failure paths.
#[derive(Default)]
pub struct MemoryWordStore {
    rows: RwLock<BTreeMap<String, WordRecord>>,
    fail_snapshot: AtomicBool,
    failing_words: Mutex<HashSet<String>>,
    snapshot_delay: Option<Duration>,
    snapshot_calls: AtomicUsize,
}

impl MemoryWordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = WordRecord>,
    {
        let rows = records.into_iter().map(|r| (r.word.clone(), r)).collect();
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// Makes every snapshot take at least `delay` after reading its rows,
    /// to widen rebuild windows.
    pub fn with_snapshot_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = Some(delay);
        self
    }

    pub fn set_fail_snapshot(&self, fail: bool) {
        self.fail_snapshot.store(fail, Ordering::SeqCst);
    }

    /// Makes every upsert of `word` fail until cleared.
    pub fn fail_word(&self, word: &str) {
        if let Ok(mut words) = self.failing_words.lock() {
            words.insert(word.to_string());
        }
    }

    pub fn clear_failures(&self) {
        self.fail_snapshot.store(false, Ordering::SeqCst);
        if let Ok(mut words) = self.failing_words.lock() {
            words.clear();
        }
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, word: &str) -> Option<WordRecord> {
        self.rows.read().await.get(word).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    fn is_failing(&self, word: &str) -> bool {
        self.failing_words
            .lock()
            .map(|words| words.contains(word))
            .unwrap_or(false)
    }
}

#[async_trait]
impl WordStore for MemoryWordStore {
    async fn snapshot(&self) -> Result<Vec<WordRecord>> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(SpellError::StoreUnavailable("snapshot failed".to_string()));
        }
        let records = self.rows.read().await.values().cloned().collect();
        if let Some(delay) = self.snapshot_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(records)
    }

    async fn upsert_frequency(
        &self,
        word: &str,
        delta: Frequency,
        contributor: Option<&str>,
    ) -> Result<UpsertOutcome> {
        if self.is_failing(word) {
            return Err(SpellError::StoreUnavailable(format!("write rejected for '{}'", word)));
        }
        let mut rows = self.rows.write().await;
        Ok(merge_into(&mut rows, word, delta, contributor))
    }

    async fn remove_words(&self, words: &[String]) -> Result<RemovalSummary> {
        if let Some(word) = words.iter().find(|w| self.is_failing(w)) {
            return Err(SpellError::StoreUnavailable(format!("delete rejected for '{}'", word)));
        }
        let mut rows = self.rows.write().await;
        Ok(remove_from(&mut rows, words))
    }
}
