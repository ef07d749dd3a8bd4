//! Query normalization and cache-key derivation
//!
//! Both the search cache and the topic cache key on normalized text so that
//! queries differing only in case or whitespace collapse to the same entry.

use crate::types::SearchParams;
use sha2::{Digest, Sha256};

/// Normalize query text: lowercase, trim, collapse internal whitespace.
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic cache key over normalized query text and execution
/// parameters.
pub fn cache_key(query: &str, params: &SearchParams) -> String {
    let raw = format!(
        "{}|{}|{}",
        normalize_query(query),
        params.depth,
        params.max_results
    );
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(digest)
}
