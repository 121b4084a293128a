//! Discovery loop: drive a query batch through the search collaborator.
//!
//! Each query is paginated up to the configured cap, items are fed through
//! the extractor, and the per-query mention count is reported back to the
//! strategy state. A failing query is logged and recorded as zero results;
//! it never aborts the batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;

use crate::models::{Mention, PerformanceMetrics, SearchConfig, SearchContext};
use crate::pipeline::dedup::dedupe;
use crate::pipeline::extract::extract_mentions;
use crate::pipeline::rate_limit::RateLimiter;
use crate::pipeline::strategy::{QueryBatch, StrategyEngine};
use crate::services::SearchClient;

/// Raw yield of one discovery pass, before enrichment.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Deduplicated mentions accumulated across the batch
    pub mentions: Vec<Mention>,
    /// Queries actually executed (a stop signal can cut the batch short)
    pub queries_issued: usize,
}

/// Run one query batch against the search collaborator.
pub async fn run_discovery(
    search: &dyn SearchClient,
    batch: &QueryBatch,
    config: &SearchConfig,
    suffix: &str,
    ctx: &mut SearchContext,
    metrics: &mut PerformanceMetrics,
    limiter: &mut RateLimiter,
    stop: &Arc<AtomicBool>,
) -> DiscoveryOutcome {
    let delay = Duration::from_millis(config.query_delay_ms);
    let mut accumulated: Vec<Mention> = Vec::new();
    let mut queries_issued = 0;

    for (i, query) in batch.queries.iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            log::info!("Stop signal observed, ending batch after {queries_issued} queries");
            break;
        }
        if i > 0 && delay.as_millis() > 0 {
            tokio::time::sleep(delay).await;
        }

        let found = run_query(search, query, config, suffix, limiter).await;
        let count = found.len() as u64;
        for mention in &found {
            metrics.bump_domain(&mention.domain);
        }
        accumulated.extend(found);

        StrategyEngine::record_result(ctx, metrics, query, count, Utc::now());
        queries_issued += 1;
        log::info!("Query '{query}' yielded {count} mentions");
    }

    DiscoveryOutcome {
        mentions: dedupe(accumulated),
        queries_issued,
    }
}

/// Paginate one query up to the per-query result cap.
///
/// A transport failure mid-pagination keeps the mentions found so far.
async fn run_query(
    search: &dyn SearchClient,
    query: &str,
    config: &SearchConfig,
    suffix: &str,
    limiter: &mut RateLimiter,
) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut fetched = 0usize;
    let mut next_token: Option<String> = None;

    loop {
        limiter.acquire().await;

        let page = match search
            .search(query, config.page_size, next_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(error) => {
                log::warn!("Search failed for '{query}': {error}");
                break;
            }
        };

        let page_len = page.items.len();
        fetched += page_len;
        for item in &page.items {
            mentions.extend(extract_mentions(item, suffix));
        }

        // A short page means the result stream is exhausted
        if page_len < config.page_size as usize || fetched >= config.max_results_per_query {
            break;
        }
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    mentions
}
