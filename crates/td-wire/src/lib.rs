// SPDX-License-Identifier: MIT

//! Wire protocol for director/worker communication.
//!
//! Messages are JSON objects tagged by a numeric `message_type` field
//! rather than the string tag serde's derive macro produces, so the
//! [`Message`] enum carries its own hand-written `Serialize`/
//! `Deserialize` implementations.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod message;

pub use error::ProtocolError;
pub use message::{decode, encode, Message, MessageType};
