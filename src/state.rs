// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::canvas::SignatureVerifier;
use crate::config::AppConfig;
use crate::federation::{FederationError, TokenBroker};
use crate::page::HostPage;
use crate::proxy::{ManagementProxy, ProxyError, ResourceProxy, UpstreamClient};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build token broker: {0}")]
    Federation(#[from] FederationError),

    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] ProxyError),
}

/// Immutable per-process components shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub broker: Arc<TokenBroker>,
    pub management: Arc<ManagementProxy>,
    pub resource: Arc<ResourceProxy>,
    pub page: Arc<HostPage>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let upstream = UpstreamClient::new(config.upstream_timeout)?;

        Ok(Self {
            verifier: Arc::new(SignatureVerifier::new(config.consumer_secret.clone())),
            broker: Arc::new(TokenBroker::from_config(&config.identity)?),
            management: Arc::new(ManagementProxy::new(upstream.clone())),
            resource: Arc::new(ResourceProxy::new(upstream)),
            page: Arc::new(HostPage::new(config.frontend_dist_dir.clone())),
        })
    }
}
