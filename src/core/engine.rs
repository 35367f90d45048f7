// File: src/core/engine.rs
use crate::config::SpellConfig;
use crate::core::generation::DictionaryGeneration;
use crate::core::normalize::Normalizer;
use crate::core::types::{GenerationStats, Suggestion, Verbosity};
use crate::error::{Result, SpellError};
use crate::store::WordStore;
use ahash::AHashSet;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    Empty,
    Building,
    Ready,
}

/// What a reload request did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// A new generation was built and published.
    Rebuilt(GenerationStats),
    /// Another rebuild was already running. Only background requests are
    /// carried over to it; a plain `reload` is simply turned away.
    AlreadyInProgress,
}

impl ReloadOutcome {
    pub fn triggered(&self) -> bool {
        matches!(self, ReloadOutcome::Rebuilt(_))
    }
}

/// Clears the build flag however the rebuild ends.
struct BuildGuard<'a>(&'a AtomicBool);

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the published dictionary generation.
///
/// # Concurrency Model
///
/// - `current`: lock-free reads via `ArcSwapOption`; each lookup takes its own
///   `Arc` at call start, so a swap never invalidates a read in progress.
/// - `building`: compare-exchange flag, at most one rebuild at a time. A second
///   `reload` is turned away instead of queued.
/// - `pending`: set by background requests (`spawn_reload`) before they try
///   the flag. The rebuild holding the flag clears it before taking its
///   snapshot and checks it again after releasing the flag, running one more
///   pass if it was set meanwhile. Changes signalled during a rebuild are
///   therefore always published, and any number of turned-away requests
///   collapse into a single follow-up.
/// - Rebuilds read the store once, build on a blocking thread, then publish
///   with a single pointer swap. A failed rebuild leaves `current` untouched.
pub struct GenerationManager {
    store: Arc<dyn WordStore>,
    config: SpellConfig,
    normalizer: Normalizer,
    current: ArcSwapOption<DictionaryGeneration>,
    building: AtomicBool,
    pending: AtomicBool,
    next_generation: AtomicU64,
}

impl GenerationManager {
    pub fn new(store: Arc<dyn WordStore>, config: SpellConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            normalizer: Normalizer::from_config(&config),
            config,
            current: ArcSwapOption::empty(),
            building: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            next_generation: AtomicU64::new(1),
        })
    }

    /// Builds the first generation. A no-op when one is already published or building.
    pub async fn initialize(&self) -> Result<()> {
        if self.current.load().is_some() {
            return Ok(());
        }
        self.rebuild("initialize", false).await.map(|_| ())
    }

    /// Rebuilds from a fresh store snapshot and publishes the result.
    pub async fn reload(&self) -> Result<ReloadOutcome> {
        self.rebuild("reload", false).await
    }

    /// Runs a reload on the runtime without waiting for it.
    ///
    /// If a rebuild is already running the request is not dropped: the
    /// running rebuild picks it up as a follow-up pass once it has published.
    pub fn spawn_reload(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            match manager.rebuild("background reload", true).await {
                Ok(ReloadOutcome::Rebuilt(stats)) => {
                    tracing::debug!(generation = stats.generation_id, "background reload finished");
                }
                Ok(ReloadOutcome::AlreadyInProgress) => {}
                Err(e) => tracing::error!("Background reload failed: {}", e),
            }
        })
    }

    /// Reloads every `every` until the manager is dropped. The first reload
    /// happens one full period after the call.
    pub fn spawn_periodic_reload(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if let Err(e) = manager.rebuild("periodic reload", false).await {
                    tracing::error!("Periodic reload failed: {}", e);
                }
            }
            tracing::debug!("periodic reload stopped");
        })
    }

    async fn rebuild(&self, reason: &str, defer_if_busy: bool) -> Result<ReloadOutcome> {
        if defer_if_busy {
            self.pending.store(true, Ordering::SeqCst);
        }
        if !self.try_begin_build() {
            if defer_if_busy {
                tracing::debug!("{} deferred to the running rebuild", reason);
            } else {
                tracing::warn!("{} skipped: rebuild already in progress", reason);
            }
            return Ok(ReloadOutcome::AlreadyInProgress);
        }

        let mut stats = self.build_and_publish(reason).await?;

        while self.pending.load(Ordering::SeqCst) {
            // Lost the flag to a newer rebuild, which snapshots after the change.
            if !self.try_begin_build() {
                break;
            }
            match self.build_and_publish("follow-up reload").await {
                Ok(next) => stats = next,
                Err(e) => {
                    tracing::error!("Follow-up reload failed: {}", e);
                    break;
                }
            }
        }
        Ok(ReloadOutcome::Rebuilt(stats))
    }

    fn try_begin_build(&self) -> bool {
        self.building
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Expects the build flag to be held; releases it on return.
    async fn build_and_publish(&self, reason: &str) -> Result<GenerationStats> {
        let _guard = BuildGuard(&self.building);
        self.pending.store(false, Ordering::SeqCst);

        let records = self.store.snapshot().await.map_err(|e| {
            tracing::error!("{} aborted, keeping current generation: {}", reason, e);
            e
        })?;

        let generation_id = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let config = self.config.clone();
        let generation = tokio::task::spawn_blocking(move || {
            DictionaryGeneration::build(generation_id, &records, &config)
        })
        .await
        .map_err(|e| SpellError::RebuildAborted(e.to_string()))??;

        let generation = Arc::new(generation);
        let stats = generation.stats();
        let previous = self.current.swap(Some(generation));

        tracing::info!(
            generation = stats.generation_id,
            words = stats.word_count,
            capacity = stats.capacity,
            replaced = previous.as_ref().map(|g| g.generation_id()),
            "{} published dictionary generation",
            reason
        );
        Ok(stats)
    }

    /// The currently published generation, if any.
    pub fn current(&self) -> Option<Arc<DictionaryGeneration>> {
        self.current.load_full()
    }

    fn require_current(&self) -> Result<Arc<DictionaryGeneration>> {
        self.current.load_full().ok_or(SpellError::NotInitialized)
    }

    pub fn state(&self) -> ManagerState {
        if self.building.load(Ordering::SeqCst) {
            ManagerState::Building
        } else if self.current.load().is_some() {
            ManagerState::Ready
        } else {
            ManagerState::Empty
        }
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// `Ok(false)` means the word is definitely not in the dictionary.
    pub fn contains(&self, word: &str) -> Result<bool> {
        let generation = self.current.load();
        match &*generation {
            Some(generation) => Ok(generation.contains(word)),
            None => Err(SpellError::NotInitialized),
        }
    }

    /// Ranked corrections for `word`. The distance comes from outside and may be negative.
    pub fn suggest(
        &self,
        word: &str,
        max_edit_distance: i64,
        verbosity: Verbosity,
    ) -> Result<Vec<Suggestion>> {
        let max_edit_distance = usize::try_from(max_edit_distance).map_err(|_| {
            SpellError::InvalidConfiguration(format!(
                "max edit distance must be non-negative, got {}",
                max_edit_distance
            ))
        })?;
        self.require_current()?.suggest(word, max_edit_distance, verbosity)
    }

    /// Returns the words the dictionary definitely does not contain,
    /// normalized, deduplicated, in first-seen order.
    pub fn filter_unknown<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<String>> {
        let generation = self.require_current()?;
        let mut seen = AHashSet::new();
        Ok(self
            .normalizer
            .normalize(words)
            .into_iter()
            .filter(|word| !generation.contains(word) && seen.insert(word.clone()))
            .collect())
    }

    pub fn stats(&self) -> Result<GenerationStats> {
        Ok(self.require_current()?.stats())
    }

    pub fn config(&self) -> &SpellConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}
