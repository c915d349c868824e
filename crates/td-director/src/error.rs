// SPDX-License-Identifier: MIT

use td_core::{AssignmentMismatch, CacheKey, EndpointId};
use thiserror::Error;

/// Conditions raised while mutating the registry. None of these are
/// fatal to the process; [`Director`](crate::Director) decides how
/// each one turns into an [`crate::Outbound`] action (or nothing at
/// all, just a log line).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectorError {
    /// A second INIT arrived on a connection that is already a
    /// subscriber of some instance. A worker has exactly one active
    /// build at a time, so this is a protocol violation.
    #[error("endpoint {0} sent INIT while already subscribed to an instance")]
    DuplicateInit(EndpointId),

    /// A `STEP_COMPLETE` or failure referenced a step the endpoint
    /// does not hold, or arrived from an endpoint with no tracked
    /// instance at all. Most commonly a completion for a step that
    /// was already reassigned after the endpoint was treated as
    /// abandoned.
    #[error("stale assignment from {endpoint}: {source}")]
    StaleAssignment { endpoint: EndpointId, #[source] source: AssignmentMismatch },

    /// A `STEP_COMPLETE` named a `schema_id` other than the one the
    /// endpoint's instance is running. Dropped the same way a stale
    /// assignment is: the endpoint is almost certainly replaying a
    /// message for an instance it has since left.
    #[error("endpoint {endpoint} reported step_complete for schema {actual}, but is subscribed to {expected}")]
    SchemaMismatch { endpoint: EndpointId, expected: String, actual: String },

    /// The endpoint is not a subscriber of any instance.
    #[error("endpoint {0} is not subscribed to any schema instance")]
    NotSubscribed(EndpointId),

    /// Internal bookkeeping points at an instance that the registry no
    /// longer has. This should never happen; surviving it as an error
    /// rather than a panic lets the caller log with full context
    /// before deciding whether to treat it as fatal.
    #[error("endpoint {endpoint} indexed under missing instance {key:?}")]
    DanglingIndex { endpoint: EndpointId, key: CacheKey },
}
