// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A `STEP_COMPLETE` (or failure) referred to a step the endpoint does
/// not currently hold. Not fatal: the caller logs and drops the message.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("endpoint has no assignment for step {step}")]
pub struct AssignmentMismatch {
    pub step: usize,
}
