//! Mention deduplication.
//!
//! Merges mention lists keyed by (author, domain). When two mentions share
//! a key, the one with the later timestamp survives; mentions without
//! timestamps keep the first seen. Output order is unspecified.

use std::collections::HashMap;

use crate::models::Mention;

/// Deduplicate mentions on (author, domain).
pub fn dedupe(mentions: Vec<Mention>) -> Vec<Mention> {
    let mut by_key: HashMap<(String, String), Mention> = HashMap::new();

    for mention in mentions {
        match by_key.entry(mention.dedup_key()) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(mention);
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                if is_later(&mention, slot.get()) {
                    slot.insert(mention);
                }
            }
        }
    }

    by_key.into_values().collect()
}

/// Whether `candidate` should replace `held`: strictly later timestamp wins,
/// anything else keeps the held mention.
fn is_later(candidate: &Mention, held: &Mention) -> bool {
    match (candidate.created_at, held.created_at) {
        (Some(c), Some(h)) => c > h,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn mention(author: &str, domain: &str, hour: Option<u32>) -> Mention {
        Mention {
            domain: domain.to_string(),
            author: author.to_string(),
            source_id: format!("{author}-{domain}-{hour:?}"),
            text: format!("{domain} mentioned"),
            created_at: hour.map(|h| Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_distinct_keys_all_kept() {
        let out = dedupe(vec![
            mention("alice", "a.skr", Some(1)),
            mention("alice", "b.skr", Some(1)),
            mention("bob", "a.skr", Some(1)),
        ]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_later_timestamp_wins() {
        let out = dedupe(vec![
            mention("alice", "a.skr", Some(9)),
            mention("alice", "a.skr", Some(15)),
            mention("alice", "a.skr", Some(12)),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].created_at,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_timestamps_keep_first() {
        let mut first = mention("alice", "a.skr", None);
        first.source_id = "first".to_string();
        let mut second = mention("alice", "a.skr", None);
        second.source_id = "second".to_string();

        let out = dedupe(vec![first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_id, "first");
    }

    #[test]
    fn test_author_is_case_sensitive() {
        let out = dedupe(vec![
            mention("Alice", "a.skr", Some(1)),
            mention("alice", "a.skr", Some(1)),
        ]);
        assert_eq!(out.len(), 2);
    }
}
