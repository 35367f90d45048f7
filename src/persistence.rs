// File: src/persistence.rs
use crate::core::types::{Frequency, RemovalSummary, WordRecord};
use crate::error::{Result, SpellError};
use crate::store::{merge_into, remove_from, UpsertOutcome, WordStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

const SNAPSHOT_VERSION: u32 = 1;

/// The on-disk form of the word table.
#[derive(serde::Serialize, serde::Deserialize)]
struct SerializableState {
    version: u32,
    records: Vec<WordRecord>,
}

/// Writes the table next to `path` and renames it over the target, so a
/// crash mid-write never leaves a truncated snapshot behind.
pub fn save_to_disk(records: &[WordRecord], path: &Path) -> Result<()> {
    let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;

    let state = SerializableState {
        version: SNAPSHOT_VERSION,
        records: records.to_vec(),
    };

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        bincode::serialize_into(&mut writer, &state)?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| SpellError::Io(e.error))?;
    Ok(())
}

pub fn load_from_disk(path: &Path) -> Result<Vec<WordRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let state: SerializableState = bincode::deserialize_from(reader)?;
    if state.version != SNAPSHOT_VERSION {
        return Err(SpellError::StoreUnavailable(format!(
            "unsupported snapshot version {} in {}",
            state.version,
            path.display()
        )));
    }
    Ok(state.records)
}

/// A word store persisted as a single bincode snapshot file.
///
/// Rows live in memory; every write call rewrites the whole snapshot on a
/// blocking thread while holding the table lock. Writers are serialized, so
/// this suits a single writer at a low rate: ingest in batches through
/// `upsert_batch` rather than word by word. A failed write rolls the
/// in-memory table back, so memory and disk never disagree.
pub struct FileWordStore {
    path: PathBuf,
    rows: Mutex<BTreeMap<String, WordRecord>>,
}

impl FileWordStore {
    /// Opens the snapshot at `path`, or starts empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = if path.exists() {
            let records = load_from_disk(&path)?;
            tracing::info!(path = %path.display(), words = records.len(), "loaded word store");
            records.into_iter().map(|r| (r.word.clone(), r)).collect()
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, rows: &BTreeMap<String, WordRecord>) -> Result<()> {
        let records: Vec<WordRecord> = rows.values().cloned().collect();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || save_to_disk(&records, &path))
            .await
            .map_err(|e| SpellError::StoreUnavailable(format!("persist task failed: {}", e)))?
            .map_err(|e| SpellError::StoreUnavailable(format!("persisting {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl WordStore for FileWordStore {
    async fn snapshot(&self) -> Result<Vec<WordRecord>> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn upsert_frequency(
        &self,
        word: &str,
        delta: Frequency,
        contributor: Option<&str>,
    ) -> Result<UpsertOutcome> {
        let mut rows = self.rows.lock().await;
        let previous = rows.get(word).cloned();
        let outcome = merge_into(&mut rows, word, delta, contributor);

        if let Err(e) = self.persist(&rows).await {
            match previous {
                Some(record) => rows.insert(word.to_string(), record),
                None => rows.remove(word),
            };
            return Err(e);
        }
        Ok(outcome)
    }

    async fn upsert_batch(
        &self,
        counts: &[(String, Frequency)],
        contributor: Option<&str>,
    ) -> Vec<Result<UpsertOutcome>> {
        let mut rows = self.rows.lock().await;
        let backup = rows.clone();

        let outcomes: Vec<UpsertOutcome> = counts
            .iter()
            .map(|(word, delta)| merge_into(&mut rows, word, *delta, contributor))
            .collect();

        match self.persist(&rows).await {
            Ok(()) => outcomes.into_iter().map(Ok).collect(),
            Err(e) => {
                *rows = backup;
                tracing::warn!(error = %e, words = counts.len(), "batch persist failed, rolled back");
                counts
                    .iter()
                    .map(|_| Err(SpellError::StoreUnavailable(e.to_string())))
                    .collect()
            }
        }
    }

    async fn remove_words(&self, words: &[String]) -> Result<RemovalSummary> {
        let mut rows = self.rows.lock().await;
        let backup = rows.clone();
        let summary = remove_from(&mut rows, words);
        if summary.removed.is_empty() {
            return Ok(summary);
        }
        if let Err(e) = self.persist(&rows).await {
            *rows = backup;
            return Err(e);
        }
        Ok(summary)
    }
}
