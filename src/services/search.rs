//! Social platform search client.
//!
//! Wraps the platform's recent-search endpoint. One call returns one page;
//! the discovery loop drives pagination through `next_token`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::SearchConfig;
use crate::utils::http;

/// A single post returned by search.
#[derive(Debug, Clone)]
pub struct RawItem {
    /// Platform identifier of the post
    pub id: String,

    /// Author handle (resolved from the inline user summary when present,
    /// falling back to the raw author identifier)
    pub author: String,

    /// Free text of the post
    pub text: String,

    /// Post timestamp, when the platform provided one
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<RawItem>,
    pub next_token: Option<String>,
}

/// Search collaborator seam.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetch one page of recent posts matching `query`.
    async fn search(
        &self,
        query: &str,
        count: u32,
        next_token: Option<&str>,
    ) -> Result<SearchPage>;
}

/// HTTP implementation against the platform API.
pub struct HttpSearchClient {
    client: Client,
    base_url: String,
    bearer_token: String,
}

impl HttpSearchClient {
    /// Create a search client from the search configuration.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(
        &self,
        query: &str,
        count: u32,
        next_token: Option<&str>,
    ) -> Result<SearchPage> {
        let mut url = url::Url::parse(&format!("{}/tweets/search/recent", self.base_url))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            pairs.append_pair("max_results", &count.to_string());
            pairs.append_pair("tweet.fields", "created_at,author_id");
            pairs.append_pair("expansions", "author_id");
            pairs.append_pair("user.fields", "username");
            if let Some(token) = next_token {
                pairs.append_pair("next_token", token);
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| AppError::search(query, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::api(status.as_u16(), body));
        }

        let payload: SearchResponse = response.json().await?;
        Ok(payload.into_page())
    }
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<WireItem>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct WireItem {
    id: String,
    text: String,
    author_id: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    next_token: Option<String>,
}

impl SearchResponse {
    /// Join the inline user summaries so items carry handles, not opaque ids.
    fn into_page(self) -> SearchPage {
        let handles: std::collections::HashMap<&str, &str> = self
            .includes
            .users
            .iter()
            .map(|u| (u.id.as_str(), u.username.as_str()))
            .collect();

        let items = self
            .data
            .into_iter()
            .map(|item| {
                let author = handles
                    .get(item.author_id.as_str())
                    .map(|h| h.to_string())
                    .unwrap_or(item.author_id);
                RawItem {
                    id: item.id,
                    author,
                    text: item.text,
                    created_at: item.created_at,
                }
            })
            .collect();

        SearchPage {
            items,
            next_token: self.meta.next_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_join_handles() {
        let json = r#"{
            "data": [
                {"id": "1", "text": "got wallet.skr", "author_id": "u1",
                 "created_at": "2026-03-01T10:00:00Z"},
                {"id": "2", "text": "no user entry", "author_id": "u9"}
            ],
            "includes": {"users": [{"id": "u1", "username": "alice"}]},
            "meta": {"next_token": "abc"}
        }"#;

        let page = serde_json::from_str::<SearchResponse>(json)
            .unwrap()
            .into_page();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].author, "alice");
        assert!(page.items[0].created_at.is_some());
        // Missing inline summary falls back to the raw author id
        assert_eq!(page.items[1].author, "u9");
        assert_eq!(page.next_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_empty_response() {
        let page = serde_json::from_str::<SearchResponse>("{}").unwrap().into_page();
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }
}
