// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed request extraction and HMAC verification.
//!
//! ## Accepted Inputs
//!
//! - Raw dotted string, optionally prefixed with `signed_request=`
//! - Structured body (JSON object or form fields) with a `signed_request` field
//! - Either form may be percent-encoded (`%2F`, `%3D`)
//!
//! ## Security
//!
//! - HMAC-SHA256 over the payload segment exactly as received
//! - Digest comparison is constant time (`Mac::verify_slice`)
//! - Neither the secret nor the computed digest is logged or returned

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::{debug, warn};

use super::error::CanvasError;
use crate::config::Secret;

type HmacSha256 = Hmac<Sha256>;

/// Field name carrying the signed request in structured bodies.
pub const SIGNED_REQUEST_FIELD: &str = "signed_request";

const SIGNED_REQUEST_PREFIX: &str = "signed_request=";

/// Request body as seen by the authentication entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundBody {
    /// Raw text body.
    Text(String),
    /// Structured body: a JSON object or parsed form fields.
    Fields(Map<String, Value>),
}

impl InboundBody {
    /// Interpret raw bytes according to the request `Content-Type`.
    ///
    /// JSON objects and url-encoded forms become [`InboundBody::Fields`];
    /// a JSON string and anything else is treated as text.
    pub fn from_bytes(content_type: Option<&str>, body: &[u8]) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().to_ascii_lowercase());

        match mime.as_deref() {
            Some("application/json") => match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(fields)) => InboundBody::Fields(fields),
                Ok(Value::String(text)) => InboundBody::Text(text),
                _ => InboundBody::Text(String::from_utf8_lossy(body).into_owned()),
            },
            Some("application/x-www-form-urlencoded") => InboundBody::Fields(
                url::form_urlencoded::parse(body)
                    .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
                    .collect(),
            ),
            _ => InboundBody::Text(String::from_utf8_lossy(body).into_owned()),
        }
    }
}

/// A normalized two-segment signed request: `signature.payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    signature: String,
    payload: String,
}

impl SignedRequest {
    /// Split a normalized signed request into its two segments.
    pub fn parse(raw: &str) -> Result<Self, CanvasError> {
        let segments: Vec<&str> = raw.split('.').collect();
        let [signature, payload] = segments.as_slice() else {
            return Err(CanvasError::MalformedSignedRequest {
                segments: segments.len(),
            });
        };

        if signature.is_empty() || payload.is_empty() {
            return Err(CanvasError::EmptySegment);
        }

        Ok(Self {
            signature: signature.to_string(),
            payload: payload.to_string(),
        })
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The base64 JSON payload segment, as received.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Pull the signed request string out of a body and undo percent-encoding.
pub fn extract_signed_request(body: &InboundBody) -> Result<String, CanvasError> {
    let raw = match body {
        InboundBody::Text(text) if text.contains('.') => {
            let text = text.trim();
            text.strip_prefix(SIGNED_REQUEST_PREFIX).unwrap_or(text)
        }
        InboundBody::Fields(fields) => match fields.get(SIGNED_REQUEST_FIELD) {
            Some(Value::String(value)) if !value.is_empty() => value.as_str(),
            _ => return Err(CanvasError::MissingSignedRequest),
        },
        InboundBody::Text(_) => return Err(CanvasError::MissingSignedRequest),
    };

    decode_if_percent_encoded(raw)
}

fn decode_if_percent_encoded(raw: &str) -> Result<String, CanvasError> {
    let upper = raw.to_ascii_uppercase();
    if !upper.contains("%2F") && !upper.contains("%3D") {
        return Ok(raw.to_string());
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| CanvasError::InvalidEncoding(e.to_string()))
}

/// Verifies signed requests against the shared consumer secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Secret,
}

impl SignatureVerifier {
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// Extract, normalize and authenticate the signed request in `body`.
    ///
    /// Shape problems fail with a format error before any HMAC work; a digest
    /// mismatch fails with [`CanvasError::InvalidSignature`].
    pub fn verify(&self, body: &InboundBody) -> Result<SignedRequest, CanvasError> {
        let raw = extract_signed_request(body)?;
        let request = SignedRequest::parse(&raw)?;

        debug!(
            signature_len = request.signature().len(),
            payload_len = request.payload().len(),
            "Verifying signed request"
        );

        if !self.signature_matches(&request) {
            warn!("Signed request signature mismatch");
            return Err(CanvasError::InvalidSignature);
        }

        Ok(request)
    }

    fn signature_matches(&self, request: &SignedRequest) -> bool {
        // Canonical base64 only, so decoded equality is textual equality.
        let Ok(received) = Base64::decode_vec(request.signature()) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.expose().as_bytes()) else {
            return false;
        };

        mac.update(request.payload().as_bytes());
        mac.verify_slice(&received).is_ok()
    }
}
