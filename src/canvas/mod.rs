// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signed Request Authentication
//!
//! The host platform posts a signed request of the form
//! `base64(HMAC-SHA256(secret, payload)).base64(json)` whenever it loads the
//! application. This module turns that string into a trusted envelope.
//!
//! ## Flow
//!
//! 1. [`InboundBody`] captures the raw body (text or structured fields)
//! 2. [`SignatureVerifier`] extracts the signed request, normalizes it and
//!    checks the HMAC in constant time
//! 3. [`EnvelopeCodec`] decodes the payload segment into a [`CanvasEnvelope`]
//!
//! Nothing here is persisted; every envelope lives for one request.

pub mod envelope;
pub mod error;
pub mod signature;

pub use envelope::{CanvasEnvelope, EnvelopeCodec, FEDERATED_TOKEN_FIELD};
pub use error::{CanvasError, ErrorKind};
pub use signature::{InboundBody, SignatureVerifier, SignedRequest};
