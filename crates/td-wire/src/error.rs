// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Anything that can go wrong turning bytes into a [`crate::Message`]
/// or back.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("missing or non-numeric message_type field")]
    MissingMessageType,

    #[error("unknown message_type {0}")]
    UnknownMessageType(u64),

    #[error("message_type {message_type} is missing required field `{field}`")]
    MissingField { message_type: u64, field: &'static str },

    #[error("message_type {message_type} field `{field}` has the wrong shape")]
    MalformedField { message_type: u64, field: &'static str },
}
