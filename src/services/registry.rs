//! Domain registry client.
//!
//! Enumerates registered namespace domains from the registry indexer. The
//! client paginates internally; callers only see the flat list, optionally
//! wrapped in a [`RegistrySnapshot`] carrying a freshness check.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::RegistryConfig;

/// A registered domain as reported by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisteredDomain {
    pub domain: String,
    pub owner: String,
    pub address: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Registry collaborator seam.
#[async_trait]
pub trait DomainRegistry: Send + Sync {
    /// Fetch the full list of registered domains.
    async fn list_registered(&self) -> Result<Vec<RegisteredDomain>>;
}

/// A fetched list with its fetch time, for age-threshold checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub fetched_at: DateTime<Utc>,
    pub domains: Vec<RegisteredDomain>,
}

impl RegistrySnapshot {
    /// Capture a snapshot of the registry now.
    pub async fn capture(registry: &dyn DomainRegistry) -> Result<Self> {
        Ok(Self {
            fetched_at: Utc::now(),
            domains: registry.list_registered().await?,
        })
    }

    /// Whether the snapshot is younger than `max_age_minutes`.
    pub fn is_fresh(&self, max_age_minutes: i64, now: DateTime<Utc>) -> bool {
        now - self.fetched_at <= Duration::minutes(max_age_minutes)
    }
}

/// HTTP implementation against the registry indexer.
pub struct HttpRegistry {
    client: Client,
    base_url: String,
    page_limit: usize,
}

impl HttpRegistry {
    /// Create a registry client from the registry configuration.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            // Hard ceiling on pages so a misbehaving cursor cannot loop forever
            page_limit: 100,
        })
    }
}

#[async_trait]
impl DomainRegistry for HttpRegistry {
    async fn list_registered(&self) -> Result<Vec<RegisteredDomain>> {
        let mut domains = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..self.page_limit {
            let mut url = url::Url::parse(&format!("{}/domains", self.base_url))?;
            if let Some(c) = &cursor {
                url.query_pairs_mut().append_pair("cursor", c);
            }

            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::api(status.as_u16(), body));
            }

            let page: RegistryPage = response.json().await?;
            domains.extend(page.domains);

            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }

        Ok(domains)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryPage {
    #[serde(default)]
    domains: Vec<RegisteredDomain>,
    #[serde(default)]
    next_cursor: Option<String>,
}
