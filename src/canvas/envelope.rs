// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope decoding.
//!
//! The payload segment is base64 encoded UTF-8 JSON. The decoded object is
//! kept as-is so it can be embedded into the host page without losing fields
//! this service does not know about; typed accessors cover the parts the
//! service itself reads.

use base64ct::{Base64, Base64Unpadded, Encoding};
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::CanvasError;

/// Reserved envelope field holding the federated access token (or `null`).
pub const FEDERATED_TOKEN_FIELD: &str = "token_azure";

/// Decoded signed request context.
///
/// Typical shape sent by the host platform:
///
/// ```text
/// {
///   "algorithm": "HMACSHA256",
///   "client": { "instanceUrl": "...", "oauthToken": "..." },
///   "context": {
///     "user": { "userId": "...", ... },
///     "organization": { "organizationId": "...", ... },
///     "application": { "name": "...", ... }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CanvasEnvelope(Value);

impl CanvasEnvelope {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn user_id(&self) -> Option<&str> {
        self.str_at("/context/user/userId")
            .or_else(|| self.str_at("/userId"))
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.str_at("/context/organization/organizationId")
    }

    pub fn instance_url(&self) -> Option<&str> {
        self.str_at("/client/instanceUrl")
    }

    pub fn oauth_token(&self) -> Option<&str> {
        self.str_at("/client/oauthToken")
    }

    pub fn application_name(&self) -> Option<&str> {
        self.str_at("/context/application/name")
    }

    pub fn federated_token(&self) -> Option<&str> {
        self.0.get(FEDERATED_TOKEN_FIELD).and_then(Value::as_str)
    }

    /// Store the federated token under the reserved field. `None` is written
    /// as an explicit `null`.
    ///
    /// Returns `false` when the envelope is not a JSON object and has no room
    /// for the field.
    pub fn attach_federated_token(&mut self, token: Option<String>) -> bool {
        match self.0.as_object_mut() {
            Some(fields) => {
                fields.insert(
                    FEDERATED_TOKEN_FIELD.to_string(),
                    token.map(Value::String).unwrap_or(Value::Null),
                );
                true
            }
            None => false,
        }
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.0.pointer(pointer).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for CanvasEnvelope {
    fn from(fields: Map<String, Value>) -> Self {
        Self(Value::Object(fields))
    }
}

pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Decode a payload segment into an envelope.
    ///
    /// Padded base64 is expected; unpadded input is accepted as well. Any
    /// decoding or JSON failure is a format error carrying the cause.
    pub fn decode(payload: &str) -> Result<CanvasEnvelope, CanvasError> {
        let bytes = Base64::decode_vec(payload)
            .or_else(|_| Base64Unpadded::decode_vec(payload))
            .map_err(|e| CanvasError::EnvelopeDecode(format!("invalid base64: {e}")))?;

        let json = String::from_utf8(bytes)
            .map_err(|e| CanvasError::EnvelopeDecode(format!("invalid UTF-8: {e}")))?;

        let value: Value = serde_json::from_str(&json)
            .map_err(|e| CanvasError::EnvelopeDecode(format!("invalid JSON: {e}")))?;

        Ok(CanvasEnvelope(value))
    }
}
