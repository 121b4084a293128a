//! skr-radar CLI
//!
//! Local entry point: run discovery cycles once or on an interval, target
//! specific domains/users, and inspect checkpointed state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use skr_radar::{
    error::{AppError, Result},
    models::Config,
    pipeline::{CycleRunner, Scheduler, StopSignal},
    services::{
        HttpRegistry, HttpSearchClient, HttpSentimentClassifier, HttpUserLookup, RegistrySnapshot,
        SentimentClassifier,
    },
    storage::{CheckpointStore, LocalStore},
};

/// skr-radar - adaptive .skr mention discovery
#[derive(Parser, Debug)]
#[command(
    name = "skr-radar",
    version,
    about = "Discovers and enriches .skr domain mentions on the social platform"
)]
struct Cli {
    /// Path to storage directory containing config and checkpoints
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single discovery/enrichment cycle
    Cycle {
        /// Re-resolve authors even when current records exist
        #[arg(long)]
        force_refresh: bool,
    },

    /// Run cycles continuously on a fixed interval (ctrl-c to stop)
    Watch {
        /// Seconds between cycle triggers
        #[arg(long, default_value_t = 900)]
        interval_secs: u64,
    },

    /// Run one targeted cycle against specific domains and/or users
    Target {
        /// Domain to search for (repeatable)
        #[arg(long)]
        domain: Vec<String>,

        /// User handle to scan (repeatable)
        #[arg(long)]
        user: Vec<String>,

        /// Also target every domain listed by the registry
        #[arg(long)]
        from_registry: bool,
    },

    /// Print statistics from the checkpointed state
    Stats,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build a cycle runner wired to the HTTP collaborators.
async fn build_runner(config: &Config, storage_dir: &Path, stop: StopSignal) -> Result<CycleRunner> {
    let search = Arc::new(HttpSearchClient::new(&config.search)?);
    let lookup = Arc::new(HttpUserLookup::new(&config.search)?);
    let sentiment: Option<Arc<dyn SentimentClassifier>> = if config.sentiment.enabled {
        Some(Arc::new(HttpSentimentClassifier::new(&config.sentiment)?))
    } else {
        None
    };
    let store = Arc::new(LocalStore::new(storage_dir));

    CycleRunner::new(config.clone(), search, lookup, sentiment, store, stop).await
}

/// Load the registry snapshot, refetching when the cached one is stale.
async fn registry_snapshot(config: &Config, storage_dir: &Path) -> Result<RegistrySnapshot> {
    let cache_path = storage_dir.join("registry.json");

    if let Ok(content) = std::fs::read_to_string(&cache_path) {
        if let Ok(snapshot) = serde_json::from_str::<RegistrySnapshot>(&content) {
            if snapshot.is_fresh(config.registry.max_age_minutes, chrono::Utc::now()) {
                log::info!(
                    "Using cached registry list ({} domains, fetched {})",
                    snapshot.domains.len(),
                    snapshot.fetched_at
                );
                return Ok(snapshot);
            }
            log::info!("Cached registry list is stale, refetching");
        }
    }

    let registry = HttpRegistry::new(&config.registry)?;
    let snapshot = RegistrySnapshot::capture(&registry).await?;
    std::fs::create_dir_all(storage_dir)?;
    std::fs::write(&cache_path, serde_json::to_string_pretty(&snapshot)?)?;
    log::info!("Registry list fetched: {} domains", snapshot.domains.len());
    Ok(snapshot)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("skr-radar starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);

    // Configuration problems are fatal before any cycle runs
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {e}");
        return Err(e);
    }

    match cli.command {
        Command::Cycle { force_refresh } => {
            let stop = StopSignal::new();
            let mut runner = build_runner(&config, &cli.storage_dir, stop).await?;
            runner.set_force_refresh(force_refresh);

            let report = runner.run_auto_cycle().await?;
            log::info!(
                "Cycle complete [{}]: {} queries, {} mentions, {} enriched, {} reused",
                report.strategy,
                report.queries_issued,
                report.mentions_found,
                report.records_enriched,
                report.records_reused
            );
        }

        Command::Watch { interval_secs } => {
            if interval_secs == 0 {
                return Err(AppError::config("interval_secs must be > 0"));
            }

            let stop = StopSignal::new();
            let mut runner = build_runner(&config, &cli.storage_dir, stop.clone()).await?;

            let ctrlc_stop = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Ctrl-C received, finishing the current cycle...");
                    ctrlc_stop.trigger();
                }
            });

            log::info!("Watching: one cycle every {interval_secs}s");
            let scheduler = Scheduler::new(Duration::from_secs(interval_secs), stop);
            scheduler.run(&mut runner).await;
            log::info!("Watch stopped");
        }

        Command::Target {
            domain,
            user,
            from_registry,
        } => {
            if domain.is_empty() && user.is_empty() && !from_registry {
                return Err(AppError::config(
                    "target needs --domain, --user, or --from-registry",
                ));
            }

            let registry_domains = if from_registry {
                registry_snapshot(&config, &cli.storage_dir).await?.domains
            } else {
                Vec::new()
            };

            let stop = StopSignal::new();
            let mut runner = build_runner(&config, &cli.storage_dir, stop).await?;
            let report = runner
                .run_target_cycle(&domain, &user, &registry_domains)
                .await?;
            log::info!(
                "Target cycle complete: {} queries, {} mentions, {} enriched",
                report.queries_issued,
                report.mentions_found,
                report.records_enriched
            );
        }

        Command::Stats => {
            let store = LocalStore::new(&cli.storage_dir);
            let state = store.load().await?;

            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!("Cycles run: {}", state.progress.cycles_run);
            log::info!("Records held: {}", state.records.len());
            log::info!("Total mentions: {}", state.progress.total_mentions);
            log::info!("Total enriched: {}", state.progress.total_enriched);
            log::info!(
                "Queries issued: {} ({} successful, {} failed)",
                state.context.previous_queries.len(),
                state.context.successful_queries.len(),
                state.context.failed_queries.len()
            );
            match state.context.last_successful_search {
                Some(t) => log::info!("Last successful search: {t}"),
                None => log::info!("Last successful search: never"),
            }
            for (domain, count) in state.metrics.top_domains(10) {
                log::info!("  {domain}: seen {count}x");
            }
        }

        Command::Validate => {
            // validate() already ran above; report the effective settings
            log::info!("Configuration OK");
            log::info!("  namespace suffix: {}", config.namespace.suffix);
            log::info!("  search base url: {}", config.search.base_url);
            log::info!("  batch size: {}", config.strategy.batch_size);
            log::info!("  sentiment enabled: {}", config.sentiment.enabled);
        }
    }

    log::info!("Done!");

    Ok(())
}
