// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed request errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Error taxonomy bucket for a [`CanvasError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input. Client caused, not retryable.
    Format,
    /// Signature mismatch. Not retryable.
    Auth,
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// No signed request could be found in the body
    #[error("Missing signed_request in body")]
    MissingSignedRequest,

    /// Wrong number of dot-separated segments
    #[error("Invalid signed_request format (expected 2 parts, got {segments})")]
    MalformedSignedRequest { segments: usize },

    /// Two segments, but one of them is empty
    #[error("Invalid signed_request format (empty signature or payload)")]
    EmptySegment,

    /// Percent-encoding could not be reversed
    #[error("Invalid signed_request encoding: {0}")]
    InvalidEncoding(String),

    /// HMAC did not match
    #[error("Invalid signature - authentication failed")]
    InvalidSignature,

    /// Payload was not base64 encoded UTF-8 JSON
    #[error("Failed to decode envelope: {0}")]
    EnvelopeDecode(String),
}

impl CanvasError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CanvasError::InvalidSignature => ErrorKind::Auth,
            CanvasError::MissingSignedRequest
            | CanvasError::MalformedSignedRequest { .. }
            | CanvasError::EmptySegment
            | CanvasError::InvalidEncoding(_)
            | CanvasError::EnvelopeDecode(_) => ErrorKind::Format,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CanvasError::MissingSignedRequest => "missing_signed_request",
            CanvasError::MalformedSignedRequest { .. } => "malformed_signed_request",
            CanvasError::EmptySegment => "empty_segment",
            CanvasError::InvalidEncoding(_) => "invalid_encoding",
            CanvasError::InvalidSignature => "invalid_signature",
            CanvasError::EnvelopeDecode(_) => "envelope_decode",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Format => StatusCode::BAD_REQUEST,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Plain-text rejection. Signature failures never echo received or computed
/// digests back to the caller.
impl IntoResponse for CanvasError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self.kind() {
            ErrorKind::Format => format!("Error processing signed_request: {self}"),
            ErrorKind::Auth => self.to_string(),
        };
        (status, body).into_response()
    }
}
