// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canvas Gateway - signed request authentication and API forwarding
//!
//! This crate authenticates host-platform signed requests, optionally enriches
//! the decoded context with a federated access token, and forwards client
//! calls to upstream APIs with response normalization.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `canvas` - Signed request verification and envelope decoding
//! - `federation` - Client-credential token acquisition
//! - `proxy` - Upstream forwarding and session-error classification
//! - `page` - Host page rendering

pub mod api;
pub mod canvas;
pub mod config;
pub mod error;
pub mod federation;
pub mod page;
pub mod proxy;
pub mod state;
