// src/models/mod.rs

//! Domain models for the radar application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod context;
mod mention;

// Re-export all public types
pub use config::{
    Config, NamespaceConfig, RegistryConfig, SearchConfig, SentimentConfig, StrategyConfig,
};
pub use context::{CycleReport, PerformanceMetrics, Progress, SearchContext};
pub use mention::{EnrichedRecord, Mention, record_key};
