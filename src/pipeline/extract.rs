//! Mention extraction.
//!
//! Pure text scanning: tokenize on a delimiter class, match tokens against
//! the namespace suffix, validate the candidate's label grammar. No I/O.

use std::collections::BTreeSet;

use crate::models::Mention;
use crate::services::RawItem;

/// Characters that split free text into tokens, alongside whitespace.
/// Colons are delimiters, so `http://a.skr` tokenizes into `http` and
/// `//a.skr`; the `//` marker is then stripped before validation.
const DELIMITERS: &[char] = &[
    '(', ')', '[', ']', '{', '}', '<', '>', '"', '\'', '`', ',', ';', ':', '!', '?', '|', '~',
    '^', '*', '&', '%', '$', '#', '+', '=', '“', '”', '‘', '’', '«', '»', '「', '」', '『', '』',
    '《', '》', '〈', '〉', '（', '）', '【', '】', '、', '。', '，', '；', '：', '！', '？', '…',
];

/// Leading markers stripped from a matched token before validation.
const PREFIX_MARKERS: &[&str] = &["https://", "http://", "//", "@"];

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || DELIMITERS.contains(&c)
}

/// Extract the set of valid namespace domains mentioned in `text`.
///
/// Output is lowercased and deduplicated per input text. Extraction does
/// not deduplicate across texts; that is the deduplicator's job.
pub fn extract_domains(text: &str, suffix: &str) -> BTreeSet<String> {
    let suffix = suffix.to_lowercase();
    let mut found = BTreeSet::new();

    for token in text.split(is_delimiter) {
        if token.is_empty() {
            continue;
        }
        let mut candidate = token.to_lowercase();
        if !candidate.ends_with(&suffix) {
            continue;
        }
        for marker in PREFIX_MARKERS {
            if let Some(rest) = candidate.strip_prefix(marker) {
                candidate = rest.to_string();
                break;
            }
        }
        if is_valid_domain(&candidate, &suffix) {
            found.insert(candidate);
        }
    }

    found
}

/// Validate a lowercased candidate against the namespace grammar.
///
/// The candidate must end with the suffix, split into at least two
/// non-empty dot-separated labels, and no label other than the suffix may
/// contain whitespace or delimiter-class characters.
pub fn is_valid_domain(candidate: &str, suffix: &str) -> bool {
    if !candidate.ends_with(suffix) {
        return false;
    }

    let labels: Vec<&str> = candidate.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return false;
    }

    // All labels except the trailing suffix label
    labels[..labels.len() - 1]
        .iter()
        .all(|label| !label.chars().any(is_delimiter))
}

/// Build one [`Mention`] per unique domain found in a search item.
pub fn extract_mentions(item: &RawItem, suffix: &str) -> Vec<Mention> {
    extract_domains(&item.text, suffix)
        .into_iter()
        .map(|domain| Mention {
            domain,
            author: item.author.clone(),
            source_id: item.id.clone(),
            text: item.text.clone(),
            created_at: item.created_at,
        })
        .collect()
}
