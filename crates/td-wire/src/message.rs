// SPDX-License-Identifier: MIT

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// The numeric discriminant carried in every frame's `message_type`
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum MessageType {
    Init = 1,
    BuildInstruction = 2,
    StepComplete = 3,
    SchemaComplete = 4,
}

impl MessageType {
    fn as_u64(self) -> u64 {
        self as u64
    }

    fn from_u64(raw: u64) -> Option<Self> {
        match raw {
            1 => Some(Self::Init),
            2 => Some(Self::BuildInstruction),
            3 => Some(Self::StepComplete),
            4 => Some(Self::SchemaComplete),
            _ => None,
        }
    }
}

/// One frame of the director/worker protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Worker -> director. Joins (or creates) the schema instance
    /// matching these fields.
    Init {
        schema_id: String,
        total_steps: u32,
        cache_id: String,
        complex_patchset: bool,
        repo_state: Value,
    },
    /// Director -> worker. Assigns a single step to build.
    BuildInstruction { schema_id: String, step: u32 },
    /// Worker -> director. Reports the outcome of a previously
    /// assigned step.
    StepComplete { schema_id: String, step: u32, success: bool },
    /// Director -> worker, broadcast to every subscriber once every
    /// step in the instance is complete.
    SchemaComplete { schema_id: String },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Init { .. } => MessageType::Init,
            Message::BuildInstruction { .. } => MessageType::BuildInstruction,
            Message::StepComplete { .. } => MessageType::StepComplete,
            Message::SchemaComplete { .. } => MessageType::SchemaComplete,
        }
    }
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = Map::new();
        map.insert("message_type".into(), Value::from(self.message_type().as_u64()));
        match self {
            Message::Init { schema_id, total_steps, cache_id, complex_patchset, repo_state } => {
                map.insert("schema_id".into(), Value::from(schema_id.clone()));
                map.insert("total_steps".into(), Value::from(*total_steps));
                map.insert("cache_id".into(), Value::from(cache_id.clone()));
                map.insert("complex_patchset".into(), Value::from(*complex_patchset));
                map.insert("repo_state".into(), repo_state.clone());
            }
            Message::BuildInstruction { schema_id, step } => {
                map.insert("schema_id".into(), Value::from(schema_id.clone()));
                map.insert("step_id".into(), Value::from(step.to_string()));
            }
            Message::StepComplete { schema_id, step, success } => {
                map.insert("schema_id".into(), Value::from(schema_id.clone()));
                map.insert("step_id".into(), Value::from(step.to_string()));
                map.insert("step_success".into(), Value::from(*success));
            }
            Message::SchemaComplete { schema_id } => {
                map.insert("schema_id".into(), Value::from(schema_id.clone()));
            }
        }
        Value::Object(map).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Message::from_value(value).map_err(DeError::custom)
    }
}

impl Message {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;
        let raw_type = object
            .get("message_type")
            .and_then(Value::as_u64)
            .ok_or(ProtocolError::MissingMessageType)?;
        let message_type = MessageType::from_u64(raw_type).ok_or(ProtocolError::UnknownMessageType(raw_type))?;

        let field = |name: &'static str| -> Result<&Value, ProtocolError> {
            object.get(name).ok_or(ProtocolError::MissingField { message_type: raw_type, field: name })
        };
        let string_field = |name: &'static str| -> Result<String, ProtocolError> {
            field(name)?
                .as_str()
                .map(str::to_owned)
                .ok_or(ProtocolError::MalformedField { message_type: raw_type, field: name })
        };
        let u32_field = |name: &'static str| -> Result<u32, ProtocolError> {
            field(name)?
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or(ProtocolError::MalformedField { message_type: raw_type, field: name })
        };
        // `total_steps` is a count of build steps, not an index: zero
        // would produce an instance that is vacuously complete on join
        // and never dispatches or broadcasts anything.
        let positive_u32_field = |name: &'static str| -> Result<u32, ProtocolError> {
            match u32_field(name)? {
                0 => Err(ProtocolError::MalformedField { message_type: raw_type, field: name }),
                n => Ok(n),
            }
        };
        // step_id travels as a decimal string on the wire; the
        // internal state keeps it as an integer from here on.
        let step_id_field = |name: &'static str| -> Result<u32, ProtocolError> {
            field(name)?
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or(ProtocolError::MalformedField { message_type: raw_type, field: name })
        };
        let bool_field = |name: &'static str| -> Result<bool, ProtocolError> {
            field(name)?.as_bool().ok_or(ProtocolError::MalformedField { message_type: raw_type, field: name })
        };

        match message_type {
            MessageType::Init => Ok(Message::Init {
                schema_id: string_field("schema_id")?,
                total_steps: positive_u32_field("total_steps")?,
                cache_id: string_field("cache_id")?,
                complex_patchset: bool_field("complex_patchset")?,
                repo_state: field("repo_state")?.clone(),
            }),
            MessageType::BuildInstruction => Ok(Message::BuildInstruction {
                schema_id: string_field("schema_id")?,
                step: step_id_field("step_id")?,
            }),
            MessageType::StepComplete => Ok(Message::StepComplete {
                schema_id: string_field("schema_id")?,
                step: step_id_field("step_id")?,
                success: bool_field("step_success")?,
            }),
            MessageType::SchemaComplete => Ok(Message::SchemaComplete { schema_id: string_field("schema_id")? }),
        }
    }
}

/// Encode a message to its wire representation: a single JSON object,
/// no framing. The transport (WebSocket text frames, in `td-server`)
/// supplies message boundaries.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode one wire frame into a [`Message`].
pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let value: Value = serde_json::from_slice(bytes)?;
    Message::from_value(value)
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
