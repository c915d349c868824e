// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

fn simple(cache_id: &str) -> CacheKey {
    CacheKey::derive("build", 2, cache_id, false, &json!({}))
}

#[test]
fn same_cache_id_and_schema_match() {
    assert_eq!(simple("alice"), simple("alice"));
}

#[test]
fn different_cache_id_does_not_match() {
    assert_ne!(simple("alice"), simple("bob"));
}

#[yare::parameterized(
    schema_id   = { CacheKey::derive("other", 2, "c", false, &json!({})) },
    total_steps = { CacheKey::derive("build", 3, "c", false, &json!({})) },
)]
fn mismatched_required_fields_never_match(other: CacheKey) {
    let base = CacheKey::derive("build", 2, "c", false, &json!({}));
    assert_ne!(base, other);
}

#[test]
fn repo_state_is_ignored_when_not_complex() {
    let a = CacheKey::derive("build", 1, "c", false, &json!({"sha": "aaa"}));
    let b = CacheKey::derive("build", 1, "c", false, &json!({"sha": "bbb"}));
    assert_eq!(a, b);
}

#[test]
fn repo_state_must_match_when_complex() {
    let a = CacheKey::derive("build", 1, "c", true, &json!({"sha": "aaa"}));
    let b = CacheKey::derive("build", 1, "c", true, &json!({"sha": "bbb"}));
    assert_ne!(a, b);
}

#[test]
fn complex_patchset_with_matching_repo_state_matches() {
    let a = CacheKey::derive("build", 1, "c", true, &json!({"sha": "aaa", "branch": "main"}));
    let b = CacheKey::derive("build", 1, "c", true, &json!({"branch": "main", "sha": "aaa"}));
    assert_eq!(a, b, "field order in repo_state must not affect matching");
}

#[test]
fn differing_complex_patchset_never_matches_even_with_same_repo_state() {
    let state = json!({"sha": "aaa"});
    let a = CacheKey::derive("build", 1, "c", true, &state);
    let b = CacheKey::derive("build", 1, "c", false, &state);
    assert_ne!(
        a, b,
        "a widening join must fall to a new instance, not merge into the existing one"
    );
}
