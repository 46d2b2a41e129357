// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use tracing::{info, warn};

use super::endpoint::{FederationError, HttpTokenEndpoint, TokenEndpoint};
use crate::config::{IdentityProviderConfig, Secret};

/// Everything needed for one client-credential exchange.
#[derive(Debug, Clone)]
pub struct ClientCredentialsGrant {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Secret,
    pub scope: String,
}

impl ClientCredentialsGrant {
    /// Build the grant when client id, tenant and secret are all present.
    pub fn from_config(config: &IdentityProviderConfig) -> Option<Self> {
        let client_id = config.client_id.as_deref()?;
        let tenant_id = config.tenant_id.as_deref()?;
        let client_secret = config.client_secret.clone()?;

        Some(Self {
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                config.authority_host.trim_end_matches('/'),
                tenant_id
            ),
            client_id: client_id.to_string(),
            client_secret,
            scope: format!("api://{client_id}/.default"),
        })
    }
}

/// Best-effort federated token source.
pub struct TokenBroker<E = HttpTokenEndpoint> {
    grant: Option<ClientCredentialsGrant>,
    endpoint: E,
}

impl TokenBroker<HttpTokenEndpoint> {
    pub fn from_config(config: &IdentityProviderConfig) -> Result<Self, FederationError> {
        Ok(Self::with_endpoint(
            config,
            HttpTokenEndpoint::new(config.timeout)?,
        ))
    }
}

impl<E: TokenEndpoint> TokenBroker<E> {
    pub fn with_endpoint(config: &IdentityProviderConfig, endpoint: E) -> Self {
        Self {
            grant: ClientCredentialsGrant::from_config(config),
            endpoint,
        }
    }

    /// True only when client id, tenant and client secret are all set.
    pub fn is_configured(&self) -> bool {
        self.grant.is_some()
    }

    /// Acquire a token, or `None` when unconfigured or on any failure.
    pub async fn acquire_token(&self) -> Option<String> {
        let Some(grant) = &self.grant else {
            warn!("Federated token broker not configured; skipping token acquisition");
            return None;
        };

        match self.endpoint.request_token(grant).await {
            Ok(token) => {
                info!(token_len = token.len(), "Federated token acquired");
                Some(token)
            }
            Err(FederationError::Timeout) => {
                warn!("Federated token request timed out");
                None
            }
            Err(e) => {
                warn!(error = %e, "Error acquiring federated token");
                None
            }
        }
    }
}
