// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Management gateway proxy. Subscription-key authenticated, no response
//! post-processing.

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;
use utoipa::ToSchema;

use super::{
    insert_header, normalize_token, parse_method, require_fields, OutboundRequest,
    ProxyDispatcher, ProxyError, ProxyResponse, UpstreamClient,
};

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Body of `POST /api/proxy`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagementProxyRequest {
    /// Gateway host name, e.g. `contoso.azure-api.net`.
    #[serde(alias = "apimHost")]
    pub host: Option<String>,
    /// Path including any query string, e.g. `/orders/v1/list`.
    #[serde(alias = "apimEndpoint")]
    pub path: Option<String>,
    pub method: Option<String>,
    pub subscription_key: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManagementProxy {
    client: UpstreamClient,
    scheme: String,
}

impl ManagementProxy {
    pub fn new(client: UpstreamClient) -> Self {
        Self {
            client,
            scheme: "https".to_string(),
        }
    }

    /// Override the URL scheme (plain-HTTP test gateways).
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    fn target_url(&self, host: &str, path: &str) -> Result<Url, ProxyError> {
        let raw = format!("{}://{}{}", self.scheme, host.trim(), path.trim());
        Url::parse(&raw).map_err(|e| ProxyError::InvalidUrl(format!("{raw}: {e}")))
    }
}

pub fn build_headers(subscription_key: &str, token: &str) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, SUBSCRIPTION_KEY_HEADER, subscription_key)?;
    insert_header(&mut headers, AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
    insert_header(&mut headers, ACCEPT.as_str(), "*/*")?;
    insert_header(&mut headers, CONTENT_TYPE.as_str(), "application/json")?;
    Ok(headers)
}

impl ProxyDispatcher for ManagementProxy {
    type Request = ManagementProxyRequest;

    async fn forward(&self, request: ManagementProxyRequest) -> Result<ProxyResponse, ProxyError> {
        require_fields(&[
            ("host", request.host.as_deref()),
            ("path", request.path.as_deref()),
            ("method", request.method.as_deref()),
            ("subscriptionKey", request.subscription_key.as_deref()),
            ("token", request.token.as_deref()),
        ])?;

        let host = request.host.as_deref().unwrap_or_default();
        let path = request.path.as_deref().unwrap_or_default();
        let url = self.target_url(host, path)?;
        let method = parse_method(request.method.as_deref().unwrap_or_default())?;
        let token = normalize_token(request.token.as_deref().unwrap_or_default());
        let subscription_key = request.subscription_key.as_deref().unwrap_or_default().trim();

        info!(method = %method, host, path, "Proxying request to management gateway");

        let headers = build_headers(subscription_key, token)?;
        let response = self
            .client
            .execute(OutboundRequest {
                method,
                url,
                headers,
                body: None,
            })
            .await
            .inspect_err(|e| {
                warn!(error = %e, retryable = e.is_retryable(), "Management proxy request failed")
            })?;

        info!(status = response.status, "Management gateway response received");
        Ok(response)
    }
}
