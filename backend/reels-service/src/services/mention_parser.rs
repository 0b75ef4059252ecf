//! Mention and hashtag parsing
//!
//! Mentions are never stored; they are re-derived from comment text both
//! when a comment is written (notification fan-out) and when it is read.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::MAX_HASHTAGS;

static MENTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([a-zA-Z0-9_]+)").expect("Invalid mention regex"));

/// Extract @mentions from text
///
/// Returns lowercase usernames without the `@`, first occurrence order.
///
/// ```
/// use reels_service::services::extract_mentions;
///
/// let mentions = extract_mentions("@Alice meet @bob, cc @alice");
/// assert_eq!(mentions, vec!["alice", "bob"]);
/// ```
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MENTION_REGEX
        .captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_lowercase()))
        .filter(|username| seen.insert(username.clone()))
        .collect()
}

/// Normalise client supplied hashtags: strip `#`, lowercase, drop blanks and
/// duplicates, keep at most `MAX_HASHTAGS`
pub fn normalize_hashtags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.trim().trim_start_matches('#').to_lowercase())
        .filter(|tag| !tag.is_empty() && tag.len() <= 64)
        .filter(|tag| seen.insert(tag.clone()))
        .take(MAX_HASHTAGS)
        .collect()
}
