//! Search context, performance metrics, and cycle reporting.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process-lifetime state the strategy engine adapts on.
///
/// Initialized empty or restored from the checkpoint store at startup,
/// serialized back at each checkpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchContext {
    /// Every query ever issued, in order (append-only)
    #[serde(default)]
    pub previous_queries: Vec<String>,

    /// Queries that returned at least one mention
    #[serde(default)]
    pub successful_queries: BTreeSet<String>,

    /// Queries that returned zero mentions
    #[serde(default)]
    pub failed_queries: BTreeSet<String>,

    /// Cumulative mention count across all queries
    #[serde(default)]
    pub total_results: u64,

    /// When a query last returned results
    #[serde(default)]
    pub last_successful_search: Option<DateTime<Utc>>,
}

impl SearchContext {
    /// Success rate over the last `window` issued queries.
    ///
    /// Returns 0.0 when no queries have been issued yet.
    pub fn recent_success_rate(&self, window: usize) -> f64 {
        let recent: Vec<&String> = self
            .previous_queries
            .iter()
            .rev()
            .take(window.max(1))
            .collect();
        if recent.is_empty() {
            return 0.0;
        }
        let hits = recent
            .iter()
            .filter(|q| self.successful_queries.contains(q.as_str()))
            .count();
        hits as f64 / recent.len() as f64
    }

    /// Hours elapsed since the last successful search, if any.
    pub fn hours_since_success(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_successful_search
            .map(|t| (now - t).num_hours())
    }

    /// Whether this exact query has been issued before.
    pub fn already_issued(&self, query: &str) -> bool {
        self.previous_queries.iter().any(|q| q == query)
    }
}

/// Per-query and per-domain counters, kept for reporting and for the
/// exploitation strategy's pattern analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    /// Mention count observed per query string
    #[serde(default)]
    pub query_results: BTreeMap<String, u64>,

    /// Times each domain has been seen across cycles
    #[serde(default)]
    pub domain_popularity: BTreeMap<String, u64>,
}

impl PerformanceMetrics {
    /// Record a domain sighting.
    pub fn bump_domain(&mut self, domain: &str) {
        *self.domain_popularity.entry(domain.to_string()).or_insert(0) += 1;
    }

    /// Top domains by popularity, most seen first.
    pub fn top_domains(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .domain_popularity
            .iter()
            .map(|(d, c)| (d.as_str(), *c))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }
}

/// Persisted run counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    /// Completed cycles across all runs
    #[serde(default)]
    pub cycles_run: u64,

    /// Mentions found across all cycles (before dedup against the store)
    #[serde(default)]
    pub total_mentions: u64,

    /// Records enriched via the user-lookup collaborator
    #[serde(default)]
    pub total_enriched: u64,

    /// When the last cycle finished
    #[serde(default)]
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Summary of one discovery/enrichment cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    /// Strategy the cycle ran with
    pub strategy: String,

    /// Queries actually issued this cycle
    pub queries_issued: usize,

    /// Deduplicated mentions found this cycle
    pub mentions_found: usize,

    /// Records enriched via collaborator calls
    pub records_enriched: usize,

    /// Mentions served from already-current records
    pub records_reused: usize,
}
