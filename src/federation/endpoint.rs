// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token endpoint transport.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::broker::ClientCredentialsGrant;

#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error("token request failed: {0}")]
    Request(String),

    #[error("token request timed out")]
    Timeout,

    #[error("token request returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// Network seam for the client-credential exchange.
pub trait TokenEndpoint: Send + Sync {
    fn request_token(
        &self,
        grant: &ClientCredentialsGrant,
    ) -> impl Future<Output = Result<String, FederationError>> + Send;
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

/// Client-credential exchange over HTTPS with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    http: Client,
}

impl HttpTokenEndpoint {
    pub fn new(timeout: Duration) -> Result<Self, FederationError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FederationError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    async fn request_token(&self, grant: &ClientCredentialsGrant) -> Result<String, FederationError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", grant.client_id.as_str()),
            ("client_secret", grant.client_secret.expose()),
            ("scope", grant.scope.as_str()),
        ];

        let response = self
            .http
            .post(&grant.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FederationError::Timeout
                } else {
                    FederationError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FederationError::Rejected { status, body });
        }

        let token_response: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| FederationError::InvalidResponse(e.to_string()))?;

        if token_response.access_token.trim().is_empty() {
            return Err(FederationError::InvalidResponse(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(token_response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    fn grant(server: &httpmock::MockServer) -> ClientCredentialsGrant {
        ClientCredentialsGrant {
            token_url: server.url("/tenant-1/oauth2/v2.0/token"),
            client_id: "client-1".to_string(),
            client_secret: Secret::new("shh"),
            scope: "api://client-1/.default".to_string(),
        }
    }

    #[tokio::test]
    async fn posts_client_credentials_form() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/tenant-1/oauth2/v2.0/token")
                    .x_www_form_urlencoded_tuple("grant_type", "client_credentials")
                    .x_www_form_urlencoded_tuple("client_id", "client-1")
                    .x_www_form_urlencoded_tuple("client_secret", "shh")
                    .x_www_form_urlencoded_tuple("scope", "api://client-1/.default");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"access_token":"eyJ0eXAi","token_type":"Bearer","expires_in":3599}"#);
            })
            .await;

        let endpoint = HttpTokenEndpoint::new(Duration::from_secs(5)).unwrap();
        let token = endpoint.request_token(&grant(&server)).await.unwrap();

        assert_eq!(token, "eyJ0eXAi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_surface_status() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.any_request();
                then.status(401).body(r#"{"error":"invalid_client"}"#);
            })
            .await;

        let endpoint = HttpTokenEndpoint::new(Duration::from_secs(5)).unwrap();
        let err = endpoint.request_token(&grant(&server)).await.unwrap_err();

        assert!(matches!(err, FederationError::Rejected { status: 401, ref body } if body.contains("invalid_client")));
    }

    #[tokio::test]
    async fn slow_identity_provider_is_timeout_error() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"access_token":"late"}"#)
                    .delay(Duration::from_secs(3));
            })
            .await;

        let endpoint = HttpTokenEndpoint::new(Duration::from_millis(200)).unwrap();
        let err = endpoint.request_token(&grant(&server)).await.unwrap_err();

        assert!(matches!(err, FederationError::Timeout));
    }

    #[tokio::test]
    async fn missing_access_token_is_invalid_response() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"access_token":"  "}"#);
            })
            .await;

        let endpoint = HttpTokenEndpoint::new(Duration::from_secs(5)).unwrap();
        let err = endpoint.request_token(&grant(&server)).await.unwrap_err();

        assert!(matches!(err, FederationError::InvalidResponse(_)));
    }
}
