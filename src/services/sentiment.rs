//! LLM sentiment classifier.
//!
//! Used only by the enrichment analytics extension, never by the core loop.
//! The classifier is asked for a strict-JSON verdict; a malformed reply is a
//! validation error the caller downgrades to a skipped classification.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::SentimentConfig;

/// Whether the author claims to own the mentioned domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipClaim {
    Yes,
    No,
    Unknown,
}

/// Classification verdict for one mention text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentVerdict {
    /// e.g. "positive", "neutral", "negative"
    pub label: String,

    /// Intensity score from 1 to 10
    pub score: u8,

    /// Whether the text reads as an ownership claim
    pub ownership_claim: OwnershipClaim,

    /// One-sentence justification from the model
    pub rationale: String,
}

/// Sentiment collaborator seam.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentVerdict>;
}

/// Chat-completion implementation.
pub struct HttpSentimentClassifier {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpSentimentClassifier {
    /// Create a classifier from the sentiment configuration.
    pub fn new(config: &SentimentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    const PROMPT: &'static str = "You score social posts that mention a \
blockchain domain name. Reply with strict JSON only: {\"label\": \
\"positive\"|\"neutral\"|\"negative\", \"score\": 1-10, \"ownership_claim\": \
\"yes\"|\"no\"|\"unknown\", \"rationale\": \"one sentence\"}";
}

#[async_trait]
impl SentimentClassifier for HttpSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<SentimentVerdict> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": Self::PROMPT},
                {"role": "user", "content": text},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::api(status.as_u16(), body));
        }

        let payload: ChatResponse = response.json().await?;
        let content = payload
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AppError::validation("classifier returned no choices"))?;

        parse_verdict(content)
    }
}

/// Parse the model's JSON reply into a verdict.
fn parse_verdict(content: &str) -> Result<SentimentVerdict> {
    let verdict: SentimentVerdict = serde_json::from_str(content.trim())
        .map_err(|e| AppError::validation(format!("malformed classifier reply: {e}")))?;
    if !(1..=10).contains(&verdict.score) {
        return Err(AppError::validation(format!(
            "classifier score {} out of range",
            verdict.score
        )));
    }
    Ok(verdict)
}

// --- Wire format ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_ok() {
        let verdict = parse_verdict(
            r#"{"label": "positive", "score": 8, "ownership_claim": "yes",
                "rationale": "Author announces registering the domain."}"#,
        )
        .unwrap();

        assert_eq!(verdict.label, "positive");
        assert_eq!(verdict.score, 8);
        assert_eq!(verdict.ownership_claim, OwnershipClaim::Yes);
    }

    #[test]
    fn test_parse_verdict_rejects_prose() {
        assert!(parse_verdict("The sentiment is positive.").is_err());
    }

    #[test]
    fn test_parse_verdict_rejects_bad_score() {
        let result = parse_verdict(
            r#"{"label": "neutral", "score": 0, "ownership_claim": "unknown",
                "rationale": "n/a"}"#,
        );
        assert!(result.is_err());
    }
}
