// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Upstream Proxy
//!
//! Forwards caller-described HTTP requests to upstream APIs and wraps the
//! reply in a [`ProxyResponse`].
//!
//! ## Contract
//!
//! - Any status the upstream sends back is returned, never raised
//! - Only local validation ([`ProxyError`] format variants) and transport
//!   failures (refused, DNS, timeout) are errors
//! - Bearer tokens are trimmed before use
//!
//! Each specialization ([`ManagementProxy`], [`ResourceProxy`]) implements
//! [`ProxyDispatcher`] and only decides headers and response interpretation;
//! the shared plumbing lives in [`UpstreamClient`] and the helpers below.

pub mod classifier;
pub mod error;
pub mod management;
pub mod resource;

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use url::Url;
use utoipa::ToSchema;

pub use classifier::{classify, SessionErrorSignal};
pub use error::ProxyError;
pub use management::{ManagementProxy, ManagementProxyRequest};
pub use resource::{ResourceProxy, ResourceProxyRequest};

/// Normalized upstream reply as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    /// Status code (possibly normalized, see the resource proxy).
    pub status: u16,
    /// Reason phrase for the status.
    pub status_text: String,
    /// Upstream response headers, lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Upstream body: parsed JSON, or the raw text as a string.
    #[schema(value_type = Object)]
    pub data: Value,
    /// Explanation attached when an upstream error was soft-remapped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Upstream error payload preserved by a soft remap.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub original_error: Option<Value>,
}

/// Shared interface of the proxy specializations.
pub trait ProxyDispatcher {
    type Request: Send;

    fn forward(
        &self,
        request: Self::Request,
    ) -> impl Future<Output = Result<ProxyResponse, ProxyError>> + Send;
}

/// Fully assembled request, ready to send.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// HTTP client shared by the proxy specializations.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Result<Self, ProxyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Send the request and wrap whatever comes back.
    pub async fn execute(&self, request: OutboundRequest) -> Result<ProxyResponse, ProxyError> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        let headers = flatten_headers(response.headers());
        let bytes = response.bytes().await.map_err(transport_error)?;

        Ok(ProxyResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            data: parse_body(&bytes),
            message: None,
            original_error: None,
        })
    }
}

fn transport_error(e: reqwest::Error) -> ProxyError {
    if e.is_timeout() {
        ProxyError::Timeout
    } else {
        ProxyError::Transport(e.to_string())
    }
}

/// Fail with the names of every missing (absent or blank) field.
pub fn require_fields(fields: &[(&'static str, Option<&str>)]) -> Result<(), ProxyError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProxyError::MissingParameters(missing.join(", ")))
    }
}

pub fn normalize_token(token: &str) -> &str {
    token.trim()
}

pub fn parse_method(method: &str) -> Result<Method, ProxyError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ProxyError::InvalidMethod(method.to_string()))
}

pub fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ProxyError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ProxyError::InvalidHeader(name.to_string()))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| ProxyError::InvalidHeader(name.to_string()))?;
    headers.insert(header_name, header_value);
    Ok(())
}

/// JSON header value as sent upstream; `null` means "drop this header".
pub fn header_value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
