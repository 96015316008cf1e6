//! Deterministic entry identity.
//!
//! An entry's storage ID is its key when it carries no tags. Tagged entries
//! append a 64-bit FNV-1a hash of the canonical tag string, so the same key
//! can hold several independent variants:
//!
//! ```text
//! id("user", {})                         == "user"
//! id("user", {"lang": "en"})             == "user_<fnv1a64("&lang=en")>"
//! id("user", {"b": "2", "a": "1"})       == id("user", {"a": "1", "b": "2"})
//! ```
//!
//! Tag keys are sorted before hashing, so the ID never depends on map
//! iteration order.

use std::collections::HashMap;

const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// 64-bit FNV-1a hash of a string's bytes.
pub fn fnv1a_64(input: &str) -> u64 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Canonical form of a tag map: keys ascending, each pair rendered as `&k=v`.
pub fn canonical_tags(tags: &HashMap<String, String>) -> String {
    let mut pairs: Vec<(&String, &String)> = tags.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut canonical = String::new();
    for (k, v) in pairs {
        canonical.push('&');
        canonical.push_str(k);
        canonical.push('=');
        canonical.push_str(v);
    }
    canonical
}

/// Compute the storage ID for a key and its tags.
///
/// Untagged entries use the key verbatim, so callers that never tag can
/// read by key directly.
pub fn entry_id(key: &str, tags: &HashMap<String, String>) -> String {
    if tags.is_empty() {
        return key.to_string();
    }
    format!("{}_{}", key, fnv1a_64(&canonical_tags(tags)))
}
