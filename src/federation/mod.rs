// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Federated Token Brokering
//!
//! Mints an access token from a second identity provider using the OAuth 2.0
//! client-credential grant, scoped to the client's own resource
//! (`api://{client_id}/.default`).
//!
//! Enrichment is best-effort: the broker never fails the request it serves.
//! Missing credentials disable it without any network I/O, and every
//! endpoint failure collapses to `None` after a warning.

pub mod broker;
pub mod endpoint;

pub use broker::{ClientCredentialsGrant, TokenBroker};
pub use endpoint::{FederationError, HttpTokenEndpoint, TokenEndpoint};
