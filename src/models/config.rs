//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Domain namespace settings
    #[serde(default)]
    pub namespace: NamespaceConfig,

    /// Search API and pacing settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Strategy engine thresholds and templates
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Domain registry collaborator settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Sentiment classification extension settings
    #[serde(default)]
    pub sentiment: SentimentConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    ///
    /// A failure here is fatal at startup, before any cycle runs.
    pub fn validate(&self) -> Result<()> {
        if !self.namespace.suffix.starts_with('.') || self.namespace.suffix.len() < 2 {
            return Err(AppError::validation(
                "namespace.suffix must start with '.' and name a label",
            ));
        }
        if self.search.bearer_token.trim().is_empty() {
            return Err(AppError::config("search.bearer_token is required"));
        }
        if self.search.base_url.trim().is_empty() {
            return Err(AppError::config("search.base_url is required"));
        }
        if self.search.user_agent.trim().is_empty() {
            return Err(AppError::validation("search.user_agent is empty"));
        }
        if self.search.timeout_secs == 0 {
            return Err(AppError::validation("search.timeout_secs must be > 0"));
        }
        if self.search.page_size == 0 || self.search.page_size > 100 {
            return Err(AppError::validation("search.page_size must be 1..=100"));
        }
        if self.search.requests_per_window == 0 {
            return Err(AppError::validation(
                "search.requests_per_window must be > 0",
            ));
        }
        if self.strategy.batch_size == 0 {
            return Err(AppError::validation("strategy.batch_size must be > 0"));
        }
        if self.strategy.recent_window == 0 {
            return Err(AppError::validation("strategy.recent_window must be > 0"));
        }
        if self.strategy.balanced_templates.is_empty() {
            return Err(AppError::validation(
                "strategy.balanced_templates must not be empty",
            ));
        }
        if self.sentiment.enabled && self.sentiment.api_key.trim().is_empty() {
            return Err(AppError::config(
                "sentiment.api_key is required when sentiment.enabled",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: NamespaceConfig::default(),
            search: SearchConfig::default(),
            strategy: StrategyConfig::default(),
            registry: RegistryConfig::default(),
            sentiment: SentimentConfig::default(),
        }
    }
}

/// Domain namespace settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Trailing label that qualifies a token as a candidate domain
    #[serde(default = "defaults::suffix")]
    pub suffix: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            suffix: defaults::suffix(),
        }
    }
}

/// Search API client and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the social platform API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Bearer token for API authentication
    #[serde(default)]
    pub bearer_token: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Results requested per search page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Cap on results fetched per query across pages
    #[serde(default = "defaults::max_results_per_query")]
    pub max_results_per_query: usize,

    /// Delay between consecutive queries in milliseconds
    #[serde(default = "defaults::query_delay")]
    pub query_delay_ms: u64,

    /// Delay between consecutive user lookups in milliseconds
    #[serde(default = "defaults::lookup_delay")]
    pub lookup_delay_ms: u64,

    /// Maximum collaborator requests per rolling 60-second window
    #[serde(default = "defaults::requests_per_window")]
    pub requests_per_window: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            bearer_token: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            max_results_per_query: defaults::max_results_per_query(),
            query_delay_ms: defaults::query_delay(),
            lookup_delay_ms: defaults::lookup_delay(),
            requests_per_window: defaults::requests_per_window(),
        }
    }
}

/// Strategy engine thresholds, time windows, and query templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Number of recently issued queries used for the success rate
    #[serde(default = "defaults::recent_window")]
    pub recent_window: usize,

    /// Success rate above which exploitation kicks in
    #[serde(default = "defaults::exploit_min_rate")]
    pub exploit_min_rate: f64,

    /// Cumulative result count required for exploitation
    #[serde(default = "defaults::exploit_min_results")]
    pub exploit_min_results: u64,

    /// Hours without a successful search before diversifying
    #[serde(default = "defaults::stale_hours")]
    pub stale_hours: i64,

    /// Success rate below which diversification kicks in
    #[serde(default = "defaults::diversify_max_rate")]
    pub diversify_max_rate: f64,

    /// Morning peak window as [start, end) hours
    #[serde(default = "defaults::morning_hours")]
    pub morning_hours: (u32, u32),

    /// Evening peak window as [start, end) hours
    #[serde(default = "defaults::evening_hours")]
    pub evening_hours: (u32, u32),

    /// Maximum queries emitted per batch
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// How many historically successful queries exploitation derives from
    #[serde(default = "defaults::top_successful")]
    pub top_successful: usize,

    /// Qualifier suffixes appended to successful queries by exploitation
    #[serde(default = "defaults::exploit_qualifiers")]
    pub exploit_qualifiers: Vec<String>,

    /// Template queries for the balanced strategy (also the fallback list)
    #[serde(default = "defaults::balanced_templates")]
    pub balanced_templates: Vec<String>,

    /// Template queries for the diversify strategy
    #[serde(default = "defaults::diversify_templates")]
    pub diversify_templates: Vec<String>,

    /// Template queries for the morning trend-surf strategy
    #[serde(default = "defaults::trend_surf_templates")]
    pub trend_surf_templates: Vec<String>,

    /// Template queries for the evening time-optimize strategy
    #[serde(default = "defaults::time_optimize_templates")]
    pub time_optimize_templates: Vec<String>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            recent_window: defaults::recent_window(),
            exploit_min_rate: defaults::exploit_min_rate(),
            exploit_min_results: defaults::exploit_min_results(),
            stale_hours: defaults::stale_hours(),
            diversify_max_rate: defaults::diversify_max_rate(),
            morning_hours: defaults::morning_hours(),
            evening_hours: defaults::evening_hours(),
            batch_size: defaults::batch_size(),
            top_successful: defaults::top_successful(),
            exploit_qualifiers: defaults::exploit_qualifiers(),
            balanced_templates: defaults::balanced_templates(),
            diversify_templates: defaults::diversify_templates(),
            trend_surf_templates: defaults::trend_surf_templates(),
            time_optimize_templates: defaults::time_optimize_templates(),
        }
    }
}

/// Domain registry collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry endpoint listing registered domains
    #[serde(default = "defaults::registry_url")]
    pub base_url: String,

    /// Maximum age in minutes before the cached list is considered stale
    #[serde(default = "defaults::registry_max_age")]
    pub max_age_minutes: i64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::registry_url(),
            max_age_minutes: defaults::registry_max_age(),
        }
    }
}

/// Sentiment classification extension settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Whether to classify mention text during enrichment
    #[serde(default)]
    pub enabled: bool,

    /// Chat-completion endpoint
    #[serde(default = "defaults::sentiment_url")]
    pub base_url: String,

    /// API key for the classifier
    #[serde(default)]
    pub api_key: String,

    /// Model identifier
    #[serde(default = "defaults::sentiment_model")]
    pub model: String,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: defaults::sentiment_url(),
            api_key: String::new(),
            model: defaults::sentiment_model(),
        }
    }
}

mod defaults {
    // Namespace defaults
    pub fn suffix() -> String {
        ".skr".into()
    }

    // Search defaults
    pub fn base_url() -> String {
        "https://api.x.com/2".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; skr-radar/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> u32 {
        50
    }
    pub fn max_results_per_query() -> usize {
        100
    }
    pub fn query_delay() -> u64 {
        2000
    }
    pub fn lookup_delay() -> u64 {
        1000
    }
    pub fn requests_per_window() -> usize {
        30
    }

    // Strategy defaults
    pub fn recent_window() -> usize {
        10
    }
    pub fn exploit_min_rate() -> f64 {
        0.6
    }
    pub fn exploit_min_results() -> u64 {
        10
    }
    pub fn stale_hours() -> i64 {
        4
    }
    pub fn diversify_max_rate() -> f64 {
        0.2
    }
    pub fn morning_hours() -> (u32, u32) {
        (9, 12)
    }
    pub fn evening_hours() -> (u32, u32) {
        (18, 22)
    }
    pub fn batch_size() -> usize {
        6
    }
    pub fn top_successful() -> usize {
        3
    }
    pub fn exploit_qualifiers() -> Vec<String> {
        vec![" wallet".into(), " domain".into()]
    }
    pub fn balanced_templates() -> Vec<String> {
        vec![
            ".skr domain".into(),
            "skr domain solana".into(),
            "seeker genesis token".into(),
            ".skr wallet setup".into(),
            "solana mobile seeker".into(),
            "registered .skr".into(),
        ]
    }
    pub fn diversify_templates() -> Vec<String> {
        vec![
            "skr naming service".into(),
            "seeker device domain".into(),
            "minted .skr".into(),
            "skr identity onchain".into(),
            "solana seeker phone".into(),
            "skr domain airdrop".into(),
        ]
    }
    pub fn trend_surf_templates() -> Vec<String> {
        vec![
            "gm .skr".into(),
            "just registered .skr".into(),
            "new .skr domain".into(),
            "skr domain drop".into(),
            "claiming my .skr".into(),
            "seeker .skr mint".into(),
        ]
    }
    pub fn time_optimize_templates() -> Vec<String> {
        vec![
            "claimed my .skr".into(),
            "skr community".into(),
            ".skr giveaway".into(),
            "my new .skr name".into(),
            "skr domain flex".into(),
            "seeker domain live".into(),
        ]
    }

    // Registry defaults
    pub fn registry_url() -> String {
        "https://registry.skr.domains/v1".into()
    }
    pub fn registry_max_age() -> i64 {
        60
    }

    // Sentiment defaults
    pub fn sentiment_url() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn sentiment_model() -> String {
        "gpt-4o-mini".into()
    }
}
