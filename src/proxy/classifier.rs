// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-expiry detection for resource API error bodies.
//!
//! The resource API reports an expired or invalid session in several
//! structurally different envelopes depending on the call path. Each known
//! shape is one predicate in [`SESSION_CHECKS`]; they are evaluated in order
//! and the first match wins. New shapes get a new entry.

use serde_json::Value;

/// Error code the resource API uses for an invalid session.
pub const INVALID_SESSION_CODE: &str = "INVALID_SESSION_ID";

/// Human-readable message used as the textual fallback.
pub const SESSION_EXPIRED_TEXT: &str = "Session expired or invalid";

type SessionCheck = fn(&Value) -> bool;

/// Ordered, independent checks: `(name, predicate)`.
pub const SESSION_CHECKS: &[(&str, SessionCheck)] = &[
    ("error_array", array_has_session_code),
    ("nested_data_array", nested_data_has_session_code),
    ("error_field", error_field_is_session_code),
    ("first_element", first_element_has_session_code),
    ("message_text", serialized_body_mentions_expiry),
];

/// Positive classification plus the payload that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionErrorSignal {
    /// Name of the check that matched.
    pub check: &'static str,
    /// The upstream body, unchanged.
    pub original_error: Value,
}

/// Classify an upstream body; `Some` means the session is expired or invalid.
pub fn classify(body: &Value) -> Option<SessionErrorSignal> {
    SESSION_CHECKS
        .iter()
        .find(|(_, check)| check(body))
        .map(|(name, _)| SessionErrorSignal {
            check: *name,
            original_error: body.clone(),
        })
}

fn has_session_code(entry: &Value) -> bool {
    entry.get("errorCode").and_then(Value::as_str) == Some(INVALID_SESSION_CODE)
}

/// `[{"errorCode": "INVALID_SESSION_ID", ...}, ...]`
fn array_has_session_code(body: &Value) -> bool {
    body.as_array()
        .is_some_and(|entries| entries.iter().any(has_session_code))
}

/// `{"data": [{"errorCode": "INVALID_SESSION_ID", ...}]}`
fn nested_data_has_session_code(body: &Value) -> bool {
    body.get("data").is_some_and(array_has_session_code)
}

/// `{"error": "INVALID_SESSION_ID"}`
fn error_field_is_session_code(body: &Value) -> bool {
    body.get("error").and_then(Value::as_str) == Some(INVALID_SESSION_CODE)
}

/// First element, either array index 0 or an object keyed `"0"`.
fn first_element_has_session_code(body: &Value) -> bool {
    let first = match body {
        Value::Array(entries) => entries.first(),
        Value::Object(fields) => fields.get("0"),
        _ => None,
    };
    first.is_some_and(has_session_code)
}

fn serialized_body_mentions_expiry(body: &Value) -> bool {
    body.to_string().contains(SESSION_EXPIRED_TEXT)
}
