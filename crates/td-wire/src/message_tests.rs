// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

#[test]
fn init_encodes_with_numeric_message_type() {
    let msg = Message::Init {
        schema_id: "build".into(),
        total_steps: 4,
        cache_id: "cache-1".into(),
        complex_patchset: false,
        repo_state: json!({}),
    };
    let encoded = encode(&msg).expect("encode failed");
    let value: Value = serde_json::from_slice(&encoded).expect("valid JSON");
    assert_eq!(value["message_type"], json!(1));
    assert_eq!(value["schema_id"], json!("build"));
}

#[yare::parameterized(
    init = { Message::Init {
        schema_id: "build".into(),
        total_steps: 3,
        cache_id: "abc".into(),
        complex_patchset: true,
        repo_state: json!({"sha": "deadbeef"}),
    } },
    build_instruction = { Message::BuildInstruction { schema_id: "build".into(), step: 2 } },
    step_complete_success = { Message::StepComplete { schema_id: "build".into(), step: 1, success: true } },
    step_complete_failure = { Message::StepComplete { schema_id: "build".into(), step: 1, success: false } },
    schema_complete = { Message::SchemaComplete { schema_id: "build".into() } },
)]
fn round_trips_through_encode_decode(message: Message) {
    let encoded = encode(&message).expect("encode failed");
    let decoded = decode(&encoded).expect("decode failed");
    assert_eq!(message, decoded);
}

#[test]
fn decode_rejects_unknown_message_type() {
    let frame = json!({"message_type": 99});
    let bytes = serde_json::to_vec(&frame).unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownMessageType(99)));
}

#[test]
fn decode_rejects_missing_message_type() {
    let frame = json!({"schema_id": "build"});
    let bytes = serde_json::to_vec(&frame).unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingMessageType));
}

#[test]
fn decode_rejects_non_object_frame() {
    let bytes = serde_json::to_vec(&json!([1, 2, 3])).unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::NotAnObject));
}

#[test]
fn decode_rejects_init_missing_required_field() {
    let frame = json!({"message_type": 1, "schema_id": "build"});
    let bytes = serde_json::to_vec(&frame).unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingField { message_type: 1, field: "total_steps" }));
}

#[test]
fn decode_rejects_zero_total_steps() {
    let frame = json!({
        "message_type": 1,
        "schema_id": "build",
        "total_steps": 0,
        "cache_id": "abc",
        "complex_patchset": false,
        "repo_state": {},
    });
    let bytes = serde_json::to_vec(&frame).unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedField { message_type: 1, field: "total_steps" }));
}

#[test]
fn decode_rejects_wrong_shaped_field() {
    let frame = json!({"message_type": 2, "schema_id": "build", "step_id": 2});
    let bytes = serde_json::to_vec(&frame).unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedField { message_type: 2, field: "step_id" }));
}

#[test]
fn decode_rejects_non_decimal_step_id() {
    let frame = json!({"message_type": 2, "schema_id": "build", "step_id": "not-a-number"});
    let bytes = serde_json::to_vec(&frame).unwrap();
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedField { message_type: 2, field: "step_id" }));
}

#[test]
fn decode_rejects_malformed_json() {
    let err = decode(b"not json").unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
}

#[test]
fn schema_complete_encodes_with_schema_id_and_message_type_only() {
    let encoded = encode(&Message::SchemaComplete { schema_id: "build".into() }).unwrap();
    let value: Value = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(value, json!({"message_type": 4, "schema_id": "build"}));
}

#[test]
fn build_instruction_encodes_step_id_as_a_decimal_string() {
    let encoded = encode(&Message::BuildInstruction { schema_id: "build".into(), step: 7 }).unwrap();
    let value: Value = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(value, json!({"message_type": 2, "schema_id": "build", "step_id": "7"}));
}

#[test]
fn step_complete_encodes_step_id_as_a_decimal_string_and_uses_step_success() {
    let encoded =
        encode(&Message::StepComplete { schema_id: "build".into(), step: 3, success: false }).unwrap();
    let value: Value = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(value, json!({"message_type": 3, "schema_id": "build", "step_id": "3", "step_success": false}));
}
