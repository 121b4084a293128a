//! Adaptive query strategy engine.
//!
//! Picks one of six named strategies from the running [`SearchContext`],
//! generates a bounded batch of fresh queries for it, and folds per-query
//! results back into the context and metrics.
//!
//! Selection precedence:
//! 1. recent success rate > `exploit_min_rate` and cumulative results
//!    > `exploit_min_results` → Exploit
//! 2. stale for > `stale_hours`, or recent rate < `diversify_max_rate`
//!    → Diversify
//! 3. local hour in the morning window → TrendSurf
//! 4. local hour in the evening window → TimeOptimize
//! 5. otherwise → Balanced
//!
//! UserTarget is never auto-selected; it is built from explicit targeting
//! input (CLI domains/users or a registry snapshot).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PerformanceMetrics, SearchContext, StrategyConfig};
use crate::services::RegisteredDomain;
use crate::utils::normalize_handle;

/// Named query-generation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Exploit,
    Diversify,
    TrendSurf,
    TimeOptimize,
    UserTarget,
    Balanced,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Exploit => "exploit",
            Strategy::Diversify => "diversify",
            Strategy::TrendSurf => "trend-surf",
            Strategy::TimeOptimize => "time-optimize",
            Strategy::UserTarget => "user-target",
            Strategy::Balanced => "balanced",
        }
    }
}

/// A generated batch of queries, tagged with the strategy that produced it.
///
/// An empty `queries` list means "no work this cycle", not an error.
#[derive(Debug, Clone)]
pub struct QueryBatch {
    pub strategy: Strategy,
    pub queries: Vec<String>,
    pub rationale: String,
}

/// Strategy selection and query generation.
pub struct StrategyEngine {
    config: StrategyConfig,
    suffix: String,
}

impl StrategyEngine {
    /// Create an engine for the given namespace suffix.
    pub fn new(config: StrategyConfig, suffix: impl Into<String>) -> Self {
        Self {
            config,
            suffix: suffix.into(),
        }
    }

    /// Pick a strategy from the context. `local_hour` is the caller's
    /// wall-clock hour of day (0-23); passing it in keeps selection
    /// deterministic under test.
    pub fn select(&self, ctx: &SearchContext, now: DateTime<Utc>, local_hour: u32) -> Strategy {
        let has_history = !ctx.previous_queries.is_empty();
        let rate = ctx.recent_success_rate(self.config.recent_window);

        if has_history
            && rate > self.config.exploit_min_rate
            && ctx.total_results > self.config.exploit_min_results
        {
            return Strategy::Exploit;
        }

        let stale = ctx
            .hours_since_success(now)
            .is_some_and(|h| h > self.config.stale_hours);
        if stale || (has_history && rate < self.config.diversify_max_rate) {
            return Strategy::Diversify;
        }

        let (m0, m1) = self.config.morning_hours;
        if (m0..m1).contains(&local_hour) {
            return Strategy::TrendSurf;
        }
        let (e0, e1) = self.config.evening_hours;
        if (e0..e1).contains(&local_hour) {
            return Strategy::TimeOptimize;
        }

        Strategy::Balanced
    }

    /// Generate a query batch for `strategy`.
    ///
    /// Candidates are filtered against the issued-query history (exact
    /// match) and truncated to the configured batch size. A strategy whose
    /// candidates are all spent falls back to the balanced templates; when
    /// those are spent too, the batch is empty.
    pub fn generate(
        &self,
        strategy: Strategy,
        ctx: &SearchContext,
        metrics: &PerformanceMetrics,
    ) -> QueryBatch {
        let (candidates, rationale) = match strategy {
            Strategy::Exploit => (
                self.exploit_candidates(ctx, metrics),
                "doubling down on historically productive query patterns".to_string(),
            ),
            Strategy::Diversify => (
                self.config.diversify_templates.clone(),
                "recent yield is poor, probing fresh phrasings".to_string(),
            ),
            Strategy::TrendSurf => (
                self.config.trend_surf_templates.clone(),
                "morning peak window, riding announcement chatter".to_string(),
            ),
            Strategy::TimeOptimize => (
                self.config.time_optimize_templates.clone(),
                "evening peak window, community activity is highest".to_string(),
            ),
            Strategy::Balanced | Strategy::UserTarget => (
                self.config.balanced_templates.clone(),
                "steady state, rotating the standard templates".to_string(),
            ),
        };

        let mut queries = self.filter_fresh(candidates, ctx);
        let mut rationale = rationale;

        if queries.is_empty() && strategy != Strategy::Balanced {
            queries = self.filter_fresh(self.config.balanced_templates.clone(), ctx);
            if !queries.is_empty() {
                rationale = format!("{rationale}; candidates spent, using balanced fallback");
            }
        }
        if queries.is_empty() {
            rationale = "query space exhausted, no work this cycle".to_string();
        }

        QueryBatch {
            strategy,
            queries,
            rationale,
        }
    }

    /// Select and generate in one step.
    pub fn plan(
        &self,
        ctx: &SearchContext,
        metrics: &PerformanceMetrics,
        now: DateTime<Utc>,
        local_hour: u32,
    ) -> QueryBatch {
        let strategy = self.select(ctx, now, local_hour);
        self.generate(strategy, ctx, metrics)
    }

    /// Build a UserTarget batch from explicit domains, users, and an
    /// optional registry listing.
    pub fn target_batch(
        &self,
        domains: &[String],
        users: &[String],
        registry: &[RegisteredDomain],
        ctx: &SearchContext,
    ) -> QueryBatch {
        let mut candidates = Vec::new();
        for domain in domains.iter().chain(registry.iter().map(|r| &r.domain)) {
            candidates.push(format!("\"{domain}\""));
        }
        for user in users {
            let handle = normalize_handle(user);
            candidates.push(format!("from:{handle} {}", self.suffix));
        }

        let queries = self.filter_fresh(candidates, ctx);
        QueryBatch {
            strategy: Strategy::UserTarget,
            queries,
            rationale: "operator-directed targeting of specific domains/users".to_string(),
        }
    }

    /// Fold one executed query's yield back into context and metrics.
    /// Set membership is idempotent; counts accumulate.
    pub fn record_result(
        ctx: &mut SearchContext,
        metrics: &mut PerformanceMetrics,
        query: &str,
        result_count: u64,
        now: DateTime<Utc>,
    ) {
        ctx.previous_queries.push(query.to_string());
        *metrics.query_results.entry(query.to_string()).or_insert(0) += result_count;

        if result_count > 0 {
            ctx.successful_queries.insert(query.to_string());
            ctx.failed_queries.remove(query);
            ctx.total_results += result_count;
            ctx.last_successful_search = Some(now);
        } else if !ctx.successful_queries.contains(query) {
            ctx.failed_queries.insert(query.to_string());
        }
    }

    /// Exploit: append qualifier suffixes to the top historically
    /// successful queries that mention the namespace suffix.
    fn exploit_candidates(
        &self,
        ctx: &SearchContext,
        metrics: &PerformanceMetrics,
    ) -> Vec<String> {
        let mut ranked: Vec<(&String, u64)> = ctx
            .successful_queries
            .iter()
            .filter(|q| q.to_lowercase().contains(&self.suffix))
            .map(|q| (q, metrics.query_results.get(q).copied().unwrap_or(0)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked.truncate(self.config.top_successful);

        let mut candidates = Vec::new();
        for (query, _) in ranked {
            for qualifier in &self.config.exploit_qualifiers {
                candidates.push(format!("{query}{qualifier}"));
            }
        }
        candidates
    }

    /// Drop already-issued queries and in-batch duplicates, cap the batch.
    fn filter_fresh(&self, candidates: Vec<String>, ctx: &SearchContext) -> Vec<String> {
        let mut fresh = Vec::new();
        for candidate in candidates {
            if ctx.already_issued(&candidate) || fresh.contains(&candidate) {
                continue;
            }
            fresh.push(candidate);
            if fresh.len() == self.config.batch_size {
                break;
            }
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine() -> StrategyEngine {
        StrategyEngine::new(StrategyConfig::default(), ".skr")
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn context_with(successes: &[&str], failures: &[&str]) -> SearchContext {
        let mut ctx = SearchContext::default();
        for q in successes {
            ctx.previous_queries.push(q.to_string());
            ctx.successful_queries.insert(q.to_string());
        }
        for q in failures {
            ctx.previous_queries.push(q.to_string());
            ctx.failed_queries.insert(q.to_string());
        }
        ctx
    }

    #[test]
    fn test_select_exploit_when_hot() {
        let engine = engine();
        let mut ctx = context_with(
            &["a.skr drop", "b.skr mint", "c.skr news", ".skr wallet"],
            &["dud"],
        );
        ctx.total_results = 25;
        ctx.last_successful_search = Some(noon());

        // 4/5 success rate > 0.6 and 25 > 10 results
        assert_eq!(engine.select(&ctx, noon(), 14), Strategy::Exploit);
        // Deterministic given the same context
        assert_eq!(engine.select(&ctx, noon(), 14), Strategy::Exploit);
    }

    #[test]
    fn test_select_diversify_on_low_rate() {
        // Scenario from the dedup/search history: two issued queries, none
        // successful, zero results → rate 0 < 0.2
        let engine = engine();
        let ctx = context_with(&[], &["a", ".skr wallet setup"]);
        assert_eq!(ctx.total_results, 0);
        assert_eq!(engine.select(&ctx, noon(), 14), Strategy::Diversify);
    }

    #[test]
    fn test_select_diversify_when_stale() {
        let engine = engine();
        let mut ctx = context_with(
            &["a.skr", "b.skr", "c.skr", "d.skr"],
            &[],
        );
        ctx.total_results = 50;
        // Last success 6 hours ago, beyond the 4 hour staleness threshold;
        // rate alone (1.0) would have picked Exploit
        ctx.last_successful_search = Some(noon() - chrono::Duration::hours(6));
        ctx.total_results = 5; // below exploit threshold

        assert_eq!(engine.select(&ctx, noon(), 14), Strategy::Diversify);
    }

    #[test]
    fn test_select_peak_windows() {
        let engine = engine();
        // Moderate history: rate 0.5 between both thresholds
        let mut ctx = context_with(&["a.skr"], &["b"]);
        ctx.total_results = 3;
        ctx.last_successful_search = Some(noon());

        assert_eq!(engine.select(&ctx, noon(), 10), Strategy::TrendSurf);
        assert_eq!(engine.select(&ctx, noon(), 19), Strategy::TimeOptimize);
        assert_eq!(engine.select(&ctx, noon(), 14), Strategy::Balanced);
        assert_eq!(engine.select(&ctx, noon(), 2), Strategy::Balanced);
    }

    #[test]
    fn test_select_fresh_start_is_not_diversify() {
        // No queries issued yet: the rate rules do not apply
        let engine = engine();
        let ctx = SearchContext::default();
        assert_eq!(engine.select(&ctx, noon(), 14), Strategy::Balanced);
    }

    #[test]
    fn test_generate_filters_issued_queries() {
        let engine = engine();
        let metrics = PerformanceMetrics::default();
        let mut ctx = SearchContext::default();

        let first = engine.generate(Strategy::Balanced, &ctx, &metrics);
        assert_eq!(first.queries.len(), 6);

        // Mark the whole first batch as issued
        for q in &first.queries {
            StrategyEngine::record_result(&mut ctx, &mut PerformanceMetrics::default(), q, 0, noon());
        }

        let second = engine.generate(Strategy::Balanced, &ctx, &metrics);
        for q in &second.queries {
            assert!(!first.queries.contains(q), "reissued query {q:?}");
        }
    }

    #[test]
    fn test_generate_falls_back_to_balanced() {
        let engine = engine();
        let metrics = PerformanceMetrics::default();
        let mut ctx = SearchContext::default();

        // Exhaust the diversify templates
        for q in StrategyConfig::default().diversify_templates {
            ctx.previous_queries.push(q);
        }

        let batch = engine.generate(Strategy::Diversify, &ctx, &metrics);
        assert_eq!(batch.strategy, Strategy::Diversify);
        assert!(!batch.queries.is_empty());
        let balanced = StrategyConfig::default().balanced_templates;
        assert!(batch.queries.iter().all(|q| balanced.contains(q)));
    }

    #[test]
    fn test_generate_empty_when_everything_spent() {
        let engine = engine();
        let metrics = PerformanceMetrics::default();
        let mut ctx = SearchContext::default();

        let defaults = StrategyConfig::default();
        for q in defaults
            .diversify_templates
            .into_iter()
            .chain(defaults.balanced_templates)
        {
            ctx.previous_queries.push(q);
        }

        let batch = engine.generate(Strategy::Diversify, &ctx, &metrics);
        assert!(batch.queries.is_empty());
    }

    #[test]
    fn test_exploit_derives_from_top_successes() {
        let engine = engine();
        let mut ctx = context_with(
            &["seeker .skr mint", "gm .skr", "unrelated query"],
            &[],
        );
        ctx.total_results = 40;
        let mut metrics = PerformanceMetrics::default();
        metrics.query_results.insert("seeker .skr mint".into(), 30);
        metrics.query_results.insert("gm .skr".into(), 10);

        let batch = engine.generate(Strategy::Exploit, &ctx, &metrics);
        assert!(batch.queries.contains(&"seeker .skr mint wallet".to_string()));
        assert!(batch.queries.contains(&"gm .skr domain".to_string()));
        // Successful query without the suffix contributes nothing
        assert!(!batch.queries.iter().any(|q| q.starts_with("unrelated")));
    }

    #[test]
    fn test_exploit_without_suffix_successes_uses_balanced() {
        let engine = engine();
        let mut ctx = context_with(&["solana phones", "mobile dapps"], &[]);
        ctx.total_results = 40;
        let metrics = PerformanceMetrics::default();

        let batch = engine.generate(Strategy::Exploit, &ctx, &metrics);
        let balanced = StrategyConfig::default().balanced_templates;
        assert!(!batch.queries.is_empty());
        assert!(batch.queries.iter().all(|q| balanced.contains(q)));
    }

    #[test]
    fn test_record_result_is_idempotent_on_sets() {
        let mut ctx = SearchContext::default();
        let mut metrics = PerformanceMetrics::default();

        StrategyEngine::record_result(&mut ctx, &mut metrics, "q", 3, noon());
        StrategyEngine::record_result(&mut ctx, &mut metrics, "q", 2, noon());

        assert_eq!(ctx.successful_queries.len(), 1);
        assert_eq!(ctx.total_results, 5);
        assert_eq!(metrics.query_results["q"], 5);
        assert_eq!(ctx.previous_queries, vec!["q", "q"]);
    }

    #[test]
    fn test_record_result_moves_failed_to_successful() {
        let mut ctx = SearchContext::default();
        let mut metrics = PerformanceMetrics::default();

        StrategyEngine::record_result(&mut ctx, &mut metrics, "q", 0, noon());
        assert!(ctx.failed_queries.contains("q"));

        StrategyEngine::record_result(&mut ctx, &mut metrics, "q", 4, noon());
        assert!(ctx.successful_queries.contains("q"));
        assert!(!ctx.failed_queries.contains("q"));
        assert_eq!(ctx.last_successful_search, Some(noon()));
    }

    #[test]
    fn test_target_batch_quotes_domains_and_scopes_users() {
        let engine = engine();
        let ctx = SearchContext::default();
        let registry = vec![RegisteredDomain {
            domain: "gamma.skr".to_string(),
            owner: "carol".to_string(),
            address: "addr".to_string(),
            expires_at: None,
        }];

        let batch = engine.target_batch(
            &["alpha.skr".to_string()],
            &["@bob".to_string()],
            &registry,
            &ctx,
        );

        assert_eq!(batch.strategy, Strategy::UserTarget);
        assert!(batch.queries.contains(&"\"alpha.skr\"".to_string()));
        assert!(batch.queries.contains(&"\"gamma.skr\"".to_string()));
        assert!(batch.queries.contains(&"from:bob .skr".to_string()));
    }

    #[test]
    fn test_batch_never_exceeds_batch_size() {
        let engine = engine();
        let ctx = SearchContext::default();
        let many: Vec<String> = (0..20).map(|i| format!("d{i}.skr")).collect();

        let batch = engine.target_batch(&many, &[], &[], &ctx);
        assert_eq!(batch.queries.len(), StrategyConfig::default().batch_size);
    }
}
