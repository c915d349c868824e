// SPDX-License-Identifier: MIT

//! Matching policy for collapsing INIT requests into a shared schema
//! instance.

use serde_json::Value;

/// The tuple that determines whether two INITs collapse into the same
/// [`SchemaInstance`](crate::SchemaInstance). Instances are keyed by
/// this full tuple, never by `cache_id` alone: two INITs with the same
/// `cache_id` but different `complex_patchset` (or, under
/// `complex_patchset`, different `repo_state`) land in distinct
/// instances rather than widening an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    schema_id: String,
    total_steps: u32,
    cache_id: String,
    complex_patchset: bool,
    /// Canonical JSON of `repo_state`, present only when
    /// `complex_patchset` is true — otherwise `repo_state` is ignored
    /// for matching.
    repo_state_fingerprint: Option<String>,
}

impl CacheKey {
    pub fn derive(
        schema_id: &str,
        total_steps: u32,
        cache_id: &str,
        complex_patchset: bool,
        repo_state: &Value,
    ) -> Self {
        Self {
            schema_id: schema_id.to_string(),
            total_steps,
            cache_id: cache_id.to_string(),
            complex_patchset,
            repo_state_fingerprint: complex_patchset.then(|| canonical_fingerprint(repo_state)),
        }
    }
}

/// `serde_json::Value`'s default map representation is a `BTreeMap`
/// (we don't enable the `preserve_order` feature anywhere in this
/// workspace), so two semantically-equal objects serialize to the same
/// string regardless of the field order the client sent them in.
fn canonical_fingerprint(repo_state: &Value) -> String {
    serde_json::to_string(repo_state).unwrap_or_default()
}

#[cfg(test)]
#[path = "cache_key_tests.rs"]
mod tests;
