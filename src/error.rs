// File: src/error.rs
use crate::core::types::{FailedWord, MergeSummary};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpellError>;

/// Every failure the spell-checking core can surface to its caller.
///
/// A reload that loses the race for the build flag is not represented here;
/// see [`crate::core::engine::ReloadOutcome`].
#[derive(Debug, Error)]
pub enum SpellError {
    /// Bad error-rate, edit-distance or prefix parameters. The caller must fix its input.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A lookup arrived before the first generation was published.
    #[error("dictionary not initialized")]
    NotInitialized,

    /// The word store could not produce a snapshot or accept a write.
    #[error("word store unavailable: {0}")]
    StoreUnavailable(String),

    /// Some words of an ingestion batch failed to persist. The rest committed.
    #[error("{} words failed to persist", .failed.len())]
    PartialIngestionFailure {
        failed: Vec<FailedWord>,
        summary: MergeSummary,
    },

    /// The background build task died before producing a generation.
    #[error("rebuild aborted: {0}")]
    RebuildAborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}
