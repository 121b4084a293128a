//! Pipeline stages and the cycle runner.
//!
//! One cycle is: strategy selection → search → extraction → dedup →
//! enrichment → checkpoint. [`CycleRunner`] wires the stages to the
//! collaborators and owns the in-memory state between checkpoints.

pub mod dedup;
pub mod discovery;
pub mod enrich;
pub mod extract;
pub mod rate_limit;
pub mod scheduler;
pub mod strategy;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, Timelike, Utc};

use crate::error::Result;
use crate::models::{Config, CycleReport};
use crate::services::{
    RegisteredDomain, SearchClient, SentimentClassifier, UserLookup,
};
use crate::storage::{CheckpointState, CheckpointStore};

pub use dedup::dedupe;
pub use discovery::run_discovery;
pub use enrich::{EnrichOptions, EnrichmentReport, enrich};
pub use extract::{extract_domains, extract_mentions};
pub use rate_limit::RateLimiter;
pub use scheduler::{CycleSource, Scheduler, StopSignal};
pub use strategy::{QueryBatch, Strategy, StrategyEngine};

/// Owns collaborators and run state; executes cycles.
pub struct CycleRunner {
    config: Config,
    engine: StrategyEngine,
    search: Arc<dyn SearchClient>,
    lookup: Arc<dyn UserLookup>,
    sentiment: Option<Arc<dyn SentimentClassifier>>,
    store: Arc<dyn CheckpointStore>,
    limiter: RateLimiter,
    state: CheckpointState,
    stop: StopSignal,
    force_refresh: bool,
}

impl CycleRunner {
    /// Build a runner, restoring state from the checkpoint store.
    pub async fn new(
        config: Config,
        search: Arc<dyn SearchClient>,
        lookup: Arc<dyn UserLookup>,
        sentiment: Option<Arc<dyn SentimentClassifier>>,
        store: Arc<dyn CheckpointStore>,
        stop: StopSignal,
    ) -> Result<Self> {
        let state = store.load().await?;
        if !state.context.previous_queries.is_empty() {
            log::info!(
                "Resumed checkpoint: {} records, {} queries issued, {} cycles",
                state.records.len(),
                state.context.previous_queries.len(),
                state.progress.cycles_run
            );
        }

        let engine = StrategyEngine::new(config.strategy.clone(), config.namespace.suffix.clone());
        let limiter = RateLimiter::per_minute(config.search.requests_per_window);

        Ok(Self {
            config,
            engine,
            search,
            lookup,
            sentiment,
            store,
            limiter,
            state,
            stop,
            force_refresh: false,
        })
    }

    /// Re-resolve authors even when current records exist.
    pub fn set_force_refresh(&mut self, force: bool) {
        self.force_refresh = force;
    }

    /// Current in-memory state (records, context, metrics, progress).
    pub fn state(&self) -> &CheckpointState {
        &self.state
    }

    /// Run one automatic cycle: the strategy engine picks the batch.
    pub async fn run_auto_cycle(&mut self) -> Result<CycleReport> {
        let batch = self.engine.plan(
            &self.state.context,
            &self.state.metrics,
            Utc::now(),
            Local::now().hour(),
        );
        log::info!(
            "Strategy [{}]: {} queries ({})",
            batch.strategy.name(),
            batch.queries.len(),
            batch.rationale
        );
        self.run_batch(batch).await
    }

    /// Run one operator-directed cycle against explicit targets.
    pub async fn run_target_cycle(
        &mut self,
        domains: &[String],
        users: &[String],
        registry: &[RegisteredDomain],
    ) -> Result<CycleReport> {
        let batch = self
            .engine
            .target_batch(domains, users, registry, &self.state.context);
        log::info!(
            "Strategy [{}]: {} queries ({})",
            batch.strategy.name(),
            batch.queries.len(),
            batch.rationale
        );
        self.run_batch(batch).await
    }

    /// Execute a prepared batch: discovery, enrichment, checkpoint.
    ///
    /// A checkpoint failure is returned to the caller; the cycle's results
    /// stay in memory so a later save can retry them.
    async fn run_batch(&mut self, batch: QueryBatch) -> Result<CycleReport> {
        if batch.queries.is_empty() {
            log::info!("No fresh queries this cycle");
        }

        let outcome = run_discovery(
            self.search.as_ref(),
            &batch,
            &self.config.search,
            &self.config.namespace.suffix,
            &mut self.state.context,
            &mut self.state.metrics,
            &mut self.limiter,
            self.stop.flag(),
        )
        .await;

        let enrichment = enrich(
            &outcome.mentions,
            self.lookup.as_ref(),
            self.sentiment.as_deref(),
            &mut self.state.records,
            self.config.search.lookup_delay_ms,
            &mut self.limiter,
            EnrichOptions {
                force_refresh: self.force_refresh,
            },
        )
        .await;

        self.state.progress.cycles_run += 1;
        self.state.progress.total_mentions += outcome.mentions.len() as u64;
        self.state.progress.total_enriched += enrichment.enriched as u64;
        self.state.progress.last_cycle_at = Some(Utc::now());

        let report = CycleReport {
            strategy: batch.strategy.name().to_string(),
            queries_issued: outcome.queries_issued,
            mentions_found: outcome.mentions.len(),
            records_enriched: enrichment.enriched,
            records_reused: enrichment.reused,
        };

        self.store.save(&self.state).await?;
        Ok(report)
    }
}

#[async_trait]
impl CycleSource for CycleRunner {
    async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.run_auto_cycle().await
    }
}
