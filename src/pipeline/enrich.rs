//! Enrichment stage: turn deduplicated mentions into analytics records.
//!
//! Each mention is resolved against the user-lookup collaborator unless a
//! current record already exists for its (author, domain) pair. A failed or
//! not-found lookup drops the mention for this cycle; it is never fatal.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;

use crate::models::{EnrichedRecord, Mention, record_key};
use crate::pipeline::rate_limit::RateLimiter;
use crate::services::{SentimentClassifier, UserLookup};

/// Counters from one enrichment pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichmentReport {
    /// Records built via collaborator calls
    pub enriched: usize,
    /// Mentions served from already-current records
    pub reused: usize,
    /// Mentions dropped this cycle (lookup failed or author unknown)
    pub skipped: usize,
}

/// Options for one enrichment pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichOptions {
    /// Re-resolve authors even when a current record exists
    pub force_refresh: bool,
}

/// Enrich mentions in place against the record map.
#[allow(clippy::too_many_arguments)]
pub async fn enrich(
    mentions: &[Mention],
    lookup: &dyn UserLookup,
    sentiment: Option<&dyn SentimentClassifier>,
    records: &mut BTreeMap<String, EnrichedRecord>,
    lookup_delay_ms: u64,
    limiter: &mut RateLimiter,
    options: EnrichOptions,
) -> EnrichmentReport {
    let delay = Duration::from_millis(lookup_delay_ms);
    let mut report = EnrichmentReport::default();
    let mut lookups_made = 0usize;

    for mention in mentions {
        let key = record_key(&mention.author, &mention.domain);
        if !options.force_refresh && records.contains_key(&key) {
            report.reused += 1;
            continue;
        }

        if lookups_made > 0 && delay.as_millis() > 0 {
            tokio::time::sleep(delay).await;
        }
        limiter.acquire().await;
        lookups_made += 1;

        let profile = match lookup.lookup(&mention.author).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                log::warn!("Author '{}' not found, skipping mention", mention.author);
                report.skipped += 1;
                continue;
            }
            Err(error) => {
                log::warn!("Lookup failed for '{}': {error}", mention.author);
                report.skipped += 1;
                continue;
            }
        };

        let verdict = match sentiment {
            Some(classifier) => match classifier.classify(&mention.text).await {
                Ok(verdict) => Some(verdict),
                Err(error) => {
                    log::warn!("Sentiment classification failed: {error}");
                    None
                }
            },
            None => None,
        };

        let record = EnrichedRecord {
            mention: mention.clone(),
            follower_count: profile.follower_count,
            verified: profile.verified,
            enriched_at: Utc::now(),
            sentiment: verdict,
        };
        records.insert(key, record);
        report.enriched += 1;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::services::{OwnershipClaim, SentimentVerdict, UserProfile};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Lookup fake that counts calls and can fail for specific handles.
    struct FakeLookup {
        known: Vec<String>,
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn knowing(handles: &[&str]) -> Self {
            Self {
                known: handles.iter().map(|h| h.to_string()).collect(),
                failing: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserLookup for FakeLookup {
        async fn lookup(&self, handle: &str) -> Result<Option<UserProfile>> {
            self.calls.lock().unwrap().push(handle.to_string());
            if self.failing.iter().any(|h| h == handle) {
                return Err(AppError::api(500, "boom"));
            }
            if !self.known.iter().any(|h| h == handle) {
                return Ok(None);
            }
            Ok(Some(UserProfile {
                id: format!("id-{handle}"),
                handle: handle.to_string(),
                display_name: handle.to_uppercase(),
                follower_count: 321,
                verified: handle == "alice",
            }))
        }
    }

    struct FixedSentiment;

    #[async_trait]
    impl SentimentClassifier for FixedSentiment {
        async fn classify(&self, _text: &str) -> Result<SentimentVerdict> {
            Ok(SentimentVerdict {
                label: "positive".to_string(),
                score: 8,
                ownership_claim: OwnershipClaim::Yes,
                rationale: "announces ownership".to_string(),
            })
        }
    }

    struct BrokenSentiment;

    #[async_trait]
    impl SentimentClassifier for BrokenSentiment {
        async fn classify(&self, _text: &str) -> Result<SentimentVerdict> {
            Err(AppError::validation("malformed classifier reply"))
        }
    }

    fn mention(author: &str, domain: &str) -> Mention {
        Mention {
            domain: domain.to_string(),
            author: author.to_string(),
            source_id: "1".to_string(),
            text: format!("got {domain}"),
            created_at: None,
        }
    }

    async fn run(
        mentions: &[Mention],
        lookup: &FakeLookup,
        sentiment: Option<&dyn SentimentClassifier>,
        records: &mut BTreeMap<String, EnrichedRecord>,
        options: EnrichOptions,
    ) -> EnrichmentReport {
        let mut limiter = RateLimiter::per_minute(1000);
        enrich(mentions, lookup, sentiment, records, 0, &mut limiter, options).await
    }

    #[tokio::test]
    async fn test_enriches_new_mentions() {
        let lookup = FakeLookup::knowing(&["alice", "bob"]);
        let mut records = BTreeMap::new();
        let mentions = vec![mention("alice", "a.skr"), mention("bob", "b.skr")];

        let report = run(&mentions, &lookup, None, &mut records, EnrichOptions::default()).await;

        assert_eq!(report.enriched, 2);
        assert_eq!(records.len(), 2);
        let alice = &records[&record_key("alice", "a.skr")];
        assert_eq!(alice.follower_count, 321);
        assert!(alice.verified);
    }

    #[tokio::test]
    async fn test_cached_record_skips_lookup() {
        let lookup = FakeLookup::knowing(&["alice"]);
        let mut records = BTreeMap::new();
        let mentions = vec![mention("alice", "a.skr")];

        run(&mentions, &lookup, None, &mut records, EnrichOptions::default()).await;
        assert_eq!(lookup.call_count(), 1);

        // Same (author, domain) again: no second collaborator call
        let report =
            run(&mentions, &lookup, None, &mut records, EnrichOptions::default()).await;
        assert_eq!(lookup.call_count(), 1);
        assert_eq!(report.reused, 1);
        assert_eq!(report.enriched, 0);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let lookup = FakeLookup::knowing(&["alice"]);
        let mut records = BTreeMap::new();
        let mentions = vec![mention("alice", "a.skr")];

        run(&mentions, &lookup, None, &mut records, EnrichOptions::default()).await;
        let report = run(
            &mentions,
            &lookup,
            None,
            &mut records,
            EnrichOptions {
                force_refresh: true,
            },
        )
        .await;

        assert_eq!(lookup.call_count(), 2);
        assert_eq!(report.enriched, 1);
    }

    #[tokio::test]
    async fn test_failures_skip_without_aborting() {
        let mut lookup = FakeLookup::knowing(&["alice"]);
        lookup.failing.push("evil".to_string());
        let mut records = BTreeMap::new();
        let mentions = vec![
            mention("evil", "x.skr"),
            mention("ghost", "y.skr"), // unknown author
            mention("alice", "a.skr"),
        ];

        let report = run(&mentions, &lookup, None, &mut records, EnrichOptions::default()).await;

        assert_eq!(report.skipped, 2);
        assert_eq!(report.enriched, 1);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_sentiment_attached_when_enabled() {
        let lookup = FakeLookup::knowing(&["alice"]);
        let mut records = BTreeMap::new();
        let mentions = vec![mention("alice", "a.skr")];

        run(
            &mentions,
            &lookup,
            Some(&FixedSentiment),
            &mut records,
            EnrichOptions::default(),
        )
        .await;

        let record = &records[&record_key("alice", "a.skr")];
        let verdict = record.sentiment.as_ref().unwrap();
        assert_eq!(verdict.ownership_claim, OwnershipClaim::Yes);
    }

    #[tokio::test]
    async fn test_sentiment_failure_leaves_none() {
        let lookup = FakeLookup::knowing(&["alice"]);
        let mut records = BTreeMap::new();
        let mentions = vec![mention("alice", "a.skr")];

        let report = run(
            &mentions,
            &lookup,
            Some(&BrokenSentiment),
            &mut records,
            EnrichOptions::default(),
        )
        .await;

        // Record still lands, just without a verdict
        assert_eq!(report.enriched, 1);
        assert!(records[&record_key("alice", "a.skr")].sentiment.is_none());
    }
}
