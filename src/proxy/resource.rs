// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource API proxy.
//!
//! Bearer-only headers, caller headers merged on top, and response
//! interpretation:
//!
//! | Upstream status | Returned |
//! |-----------------|----------|
//! | 2xx | status normalized to 200, everything else passed through |
//! | 401 + session error | soft remap to 200 with `message` and `originalError` |
//! | anything else | passed through unchanged |

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;
use utoipa::ToSchema;

use super::classifier::classify;
use super::{
    header_value_text, insert_header, normalize_token, parse_method, require_fields,
    OutboundRequest, ProxyDispatcher, ProxyError, ProxyResponse, UpstreamClient,
};

/// Status text used when a session error is soft-remapped.
pub const SOFT_REMAP_STATUS_TEXT: &str = "Unauthorized - But Response Forwarded";

/// Explanation attached to a soft-remapped session error.
pub const SOFT_REMAP_MESSAGE: &str =
    "Resource API reports 'Session expired or invalid'; returning 200 to allow client-side handling";

/// Org-scoped OAuth tokens start with the org id key prefix.
const ORG_TOKEN_PREFIX: &str = "00D";
const ORG_TOKEN_MIN_LEN: usize = 15;

/// Body of `POST /api/salesforce-proxy`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ResourceProxyRequest {
    /// Absolute upstream URL.
    pub url: Option<String>,
    pub method: Option<String>,
    /// Bearer token; surrounding whitespace is ignored.
    pub token: Option<String>,
    /// Extra headers; `null` values are dropped.
    #[schema(value_type = Option<Object>)]
    pub headers: Option<BTreeMap<String, Value>>,
    /// Request body forwarded as JSON (strings are sent verbatim).
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ResourceProxy {
    client: UpstreamClient,
}

impl ResourceProxy {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Post-process an upstream reply.
    pub fn interpret(response: ProxyResponse) -> ProxyResponse {
        match response.status {
            200..=299 => ProxyResponse {
                status: 200,
                ..response
            },
            401 => match classify(&response.data) {
                Some(signal) => {
                    info!(check = signal.check, "Invalid session detected, soft-remapping 401");
                    ProxyResponse {
                        status: 200,
                        status_text: SOFT_REMAP_STATUS_TEXT.to_string(),
                        message: Some(SOFT_REMAP_MESSAGE.to_string()),
                        original_error: Some(signal.original_error),
                        ..response
                    }
                }
                None => {
                    warn!("401 Unauthorized from resource API (not a session error)");
                    response
                }
            },
            _ => response,
        }
    }
}

/// Build the outgoing header set.
///
/// `Authorization` and `Accept` go first, caller headers may overwrite them,
/// and `Content-Type: application/json` is forced for every method but GET.
pub fn build_headers(
    token: &str,
    method: &Method,
    extra: Option<&BTreeMap<String, Value>>,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
    insert_header(&mut headers, ACCEPT.as_str(), "application/json")?;

    for (name, value) in extra.into_iter().flatten() {
        if let Some(value) = header_value_text(value) {
            insert_header(&mut headers, name, &value)?;
        }
    }

    if *method != Method::GET {
        insert_header(&mut headers, CONTENT_TYPE.as_str(), "application/json")?;
    }

    Ok(headers)
}

fn looks_like_org_token(token: &str) -> bool {
    token.starts_with(ORG_TOKEN_PREFIX) && token.len() >= ORG_TOKEN_MIN_LEN
}

fn encode_body(data: Option<Value>) -> Result<Option<Vec<u8>>, ProxyError> {
    match data {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.into_bytes())),
        Some(other) => serde_json::to_vec(&other)
            .map(Some)
            .map_err(|e| ProxyError::InvalidBody(e.to_string())),
    }
}

impl ProxyDispatcher for ResourceProxy {
    type Request = ResourceProxyRequest;

    async fn forward(&self, request: ResourceProxyRequest) -> Result<ProxyResponse, ProxyError> {
        require_fields(&[
            ("url", request.url.as_deref()),
            ("method", request.method.as_deref()),
            ("token", request.token.as_deref()),
        ])?;

        let raw_url = request.url.as_deref().unwrap_or_default().trim();
        let url = Url::parse(raw_url).map_err(|e| ProxyError::InvalidUrl(format!("{raw_url}: {e}")))?;
        let method = parse_method(request.method.as_deref().unwrap_or_default())?;
        let token = normalize_token(request.token.as_deref().unwrap_or_default());

        if !looks_like_org_token(token) {
            warn!("Token does not appear to be an org-scoped OAuth token");
        }

        info!(
            method = %method,
            host = url.host_str().unwrap_or_default(),
            path = url.path(),
            token_len = token.len(),
            "Proxying request to resource API"
        );

        let headers = build_headers(token, &method, request.headers.as_ref())?;
        let body = encode_body(request.data)?;

        let response = self
            .client
            .execute(OutboundRequest {
                method,
                url,
                headers,
                body,
            })
            .await
            .inspect_err(|e| {
                warn!(error = %e, retryable = e.is_retryable(), "Resource proxy request failed")
            })?;

        info!(status = response.status, "Resource API response received");
        Ok(Self::interpret(response))
    }
}
