//! Checkpoint persistence for resumable runs.
//!
//! One checkpoint holds everything a run needs to resume: enriched records,
//! the strategy's search context, performance metrics, and progress
//! counters. Saved once per cycle, not per record.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── records.json        # (author, domain) → EnrichedRecord
//! ├── records.csv         # Human-readable mirror of records.json
//! ├── search_state.json   # SearchContext + PerformanceMetrics
//! └── progress.json       # Run counters
//! ```

pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{EnrichedRecord, PerformanceMetrics, Progress, SearchContext};

// Re-export for convenience
pub use local::LocalStore;

/// Complete persisted state of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckpointState {
    /// Enriched records keyed by (author, domain)
    pub records: BTreeMap<String, EnrichedRecord>,

    /// Strategy context restored at startup
    pub context: SearchContext,

    /// Query and domain counters
    pub metrics: PerformanceMetrics,

    /// Run counters
    pub progress: Progress,
}

/// Trait for checkpoint storage backends.
///
/// `save` is atomic from the caller's point of view: a concurrent `load`
/// sees either the old or the new complete state, never a partial one.
/// `load` on an empty store returns a zero-valued state, not an error.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<CheckpointState>;
    async fn save(&self, state: &CheckpointState) -> Result<()>;
}
