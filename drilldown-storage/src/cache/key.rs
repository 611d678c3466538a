//! Cache keys derived from canonical requests.
//!
//! A `CacheKey` can only be built from a [`NavigationRequest`], so every
//! call site keys on path ids; labels never influence the key.

use drilldown_core::NavigationRequest;
use sha2::{Digest, Sha256};
use std::fmt;

/// Bumped whenever the key layout or the cached result shape changes.
const KEY_VERSION: &str = "v1";

/// Deterministic key: `v1:{domain}:{max_options}:{sha256(path ids)}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &NavigationRequest) -> Self {
        // Serializing a Vec<&str> cannot fail.
        let ids = serde_json::to_string(&request.path_ids()).unwrap_or_default();
        let digest = hex::encode(Sha256::digest(ids.as_bytes()));
        Self(format!(
            "{}:{}:{}:{}",
            KEY_VERSION,
            request.domain().as_str(),
            request.max_options(),
            digest
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
