//! Author lookup client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::SearchConfig;
use crate::utils::{http, normalize_handle};

/// Author metadata returned by the platform.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub follower_count: u64,
    pub verified: bool,
}

/// User-lookup collaborator seam.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Resolve a handle to a profile. `None` means the account does not exist.
    async fn lookup(&self, handle: &str) -> Result<Option<UserProfile>>;
}

/// HTTP implementation against the platform API.
pub struct HttpUserLookup {
    client: Client,
    base_url: String,
    bearer_token: String,
}

impl HttpUserLookup {
    /// Create a lookup client from the search configuration.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }
}

#[async_trait]
impl UserLookup for HttpUserLookup {
    async fn lookup(&self, handle: &str) -> Result<Option<UserProfile>> {
        let handle = normalize_handle(handle);
        let url = format!(
            "{}/users/by/username/{}?user.fields=public_metrics,verified",
            self.base_url, handle
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::api(status.as_u16(), body));
        }

        let payload: LookupResponse = response.json().await?;
        Ok(payload.data.map(WireUser::into_profile))
    }
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct LookupResponse {
    // The platform reports unknown handles as an errors array with no data
    #[serde(default)]
    data: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    followers_count: u64,
}

impl WireUser {
    fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            handle: self.username,
            display_name: self.name,
            follower_count: self.public_metrics.followers_count,
            verified: self.verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile() {
        let json = r#"{
            "data": {
                "id": "u1",
                "username": "alice",
                "name": "Alice",
                "verified": true,
                "public_metrics": {"followers_count": 1200}
            }
        }"#;

        let profile = serde_json::from_str::<LookupResponse>(json)
            .unwrap()
            .data
            .map(WireUser::into_profile)
            .unwrap();

        assert_eq!(profile.handle, "alice");
        assert_eq!(profile.follower_count, 1200);
        assert!(profile.verified);
    }

    #[test]
    fn test_parse_missing_user() {
        let json = r#"{"errors": [{"title": "Not Found Error"}]}"#;
        let payload = serde_json::from_str::<LookupResponse>(json).unwrap();
        assert!(payload.data.is_none());
    }
}
