// src/lib.rs
//! Dictionary-backed spell-checking core.
//!
//! - **`filter`**: Bloom-filter membership ("definitely absent" / "possibly present").
//! - **`fuzzy`**: Symmetric-delete suggestion index and Damerau-Levenshtein distance.
//! - **`core`**: Normalization, immutable dictionary generations, and the
//!   `GenerationManager` that swaps them under concurrent readers.
//! - **`learning`**: The ingestion pipeline that merges word frequencies into the store.
//! - **`store`** / **`persistence`**: The word store contract, an in-memory
//!   store, and a bincode snapshot-file store.

pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod fuzzy;
pub mod learning;
pub mod persistence;
pub mod store;

pub use crate::config::SpellConfig;
pub use crate::core::engine::{GenerationManager, ManagerState, ReloadOutcome};
pub use crate::core::types::{
    GenerationStats, MergeSummary, RemovalSummary, Suggestion, Verbosity, WordRecord,
};
pub use crate::error::{Result, SpellError};
pub use crate::learning::IngestionPipeline;
pub use crate::store::{MemoryWordStore, WordStore};
