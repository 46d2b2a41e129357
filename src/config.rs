// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! immutable [`AppConfig`] loaded once at startup. Nothing here is mutated
//! after `main` builds the application state.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CANVAS_CONSUMER_SECRET` | Shared secret for signed request HMAC | Required |
//! | `AZURE_CLIENT_ID` | Identity provider client id | Optional |
//! | `AZURE_TENANT_ID` | Identity provider tenant | Optional |
//! | `AZURE_CLIENT_SECRET` | Identity provider client secret | Optional |
//! | `AZURE_AUTHORITY_HOST` | Identity provider base URL | `https://login.microsoftonline.com` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `FRONTEND_DIST_DIR` | Directory holding the frontend build | `front/dist/front/browser` |
//! | `UPSTREAM_TIMEOUT_SECS` | Timeout for proxied upstream calls | `30` |
//! | `TOKEN_TIMEOUT_SECS` | Timeout for token acquisition | `10` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const CONSUMER_SECRET_ENV: &str = "CANVAS_CONSUMER_SECRET";
pub const AZURE_CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
pub const AZURE_TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
pub const AZURE_CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";
pub const AZURE_AUTHORITY_HOST_ENV: &str = "AZURE_AUTHORITY_HOST";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const FRONTEND_DIST_DIR_ENV: &str = "FRONTEND_DIST_DIR";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const TOKEN_TIMEOUT_ENV: &str = "TOKEN_TIMEOUT_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_FRONTEND_DIST_DIR: &str = "front/dist/front/browser";
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Wrapper for secret material that never prints its value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Client-credential settings for the second identity provider.
///
/// Every credential is optional; the token broker stays disabled unless all
/// three are present.
#[derive(Debug, Clone)]
pub struct IdentityProviderConfig {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_secret: Option<Secret>,
    pub authority_host: String,
    pub timeout: Duration,
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            tenant_id: None,
            client_secret: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub consumer_secret: Secret,
    pub identity: IdentityProviderConfig,
    pub frontend_dist_dir: PathBuf,
    pub upstream_timeout: Duration,
    pub tls: Option<TlsPaths>,
}

impl AppConfig {
    /// Config with defaults and the given consumer secret.
    pub fn new(consumer_secret: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            consumer_secret: Secret::new(consumer_secret),
            identity: IdentityProviderConfig::default(),
            frontend_dist_dir: PathBuf::from(DEFAULT_FRONTEND_DIST_DIR),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            tls: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // Used verbatim as the HMAC key; only an all-blank value counts as absent.
        let consumer_secret = lookup(CONSUMER_SECRET_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(CONSUMER_SECRET_ENV))?;

        let identity = IdentityProviderConfig {
            client_id: get(AZURE_CLIENT_ID_ENV),
            tenant_id: get(AZURE_TENANT_ID_ENV),
            client_secret: get(AZURE_CLIENT_SECRET_ENV).map(Secret::new),
            authority_host: get(AZURE_AUTHORITY_HOST_ENV)
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            timeout: parse_secs(TOKEN_TIMEOUT_ENV, get(TOKEN_TIMEOUT_ENV))?
                .unwrap_or(DEFAULT_TOKEN_TIMEOUT),
        };

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                expected: "a port number",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
            (None, None) => None,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            consumer_secret: Secret::new(consumer_secret),
            identity,
            frontend_dist_dir: get(FRONTEND_DIST_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FRONTEND_DIST_DIR)),
            upstream_timeout: parse_secs(UPSTREAM_TIMEOUT_ENV, get(UPSTREAM_TIMEOUT_ENV))?
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),
            tls,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_secs(name: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a positive number of seconds",
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn consumer_secret_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(CONSUMER_SECRET_ENV)));

        let err = AppConfig::from_lookup(lookup(&[(CONSUMER_SECRET_ENV, "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(CONSUMER_SECRET_ENV)));
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = AppConfig::from_lookup(lookup(&[(CONSUMER_SECRET_ENV, "s3cr3t")])).unwrap();
        assert_eq!(config.consumer_secret.expose(), "s3cr3t");
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.identity.timeout, Duration::from_secs(10));
        assert_eq!(config.identity.authority_host, DEFAULT_AUTHORITY_HOST);
        assert!(config.identity.client_id.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn consumer_secret_keeps_surrounding_whitespace() {
        let config = AppConfig::from_lookup(lookup(&[
            (CONSUMER_SECRET_ENV, " s3cr3t\n"),
            (AZURE_CLIENT_ID_ENV, " client "),
        ]))
        .unwrap();
        assert_eq!(config.consumer_secret.expose(), " s3cr3t\n");
        assert_eq!(config.identity.client_id.as_deref(), Some("client"));
    }

    #[test]
    fn identity_credentials_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            (CONSUMER_SECRET_ENV, "s"),
            (AZURE_CLIENT_ID_ENV, "client"),
            (AZURE_TENANT_ID_ENV, "tenant"),
            (AZURE_CLIENT_SECRET_ENV, "shh"),
            (TOKEN_TIMEOUT_ENV, "3"),
        ]))
        .unwrap();
        assert_eq!(config.identity.client_id.as_deref(), Some("client"));
        assert_eq!(config.identity.tenant_id.as_deref(), Some("tenant"));
        assert_eq!(
            config.identity.client_secret.as_ref().map(Secret::expose),
            Some("shh")
        );
        assert_eq!(config.identity.timeout, Duration::from_secs(3));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(CONSUMER_SECRET_ENV, "s"), (PORT_ENV, "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PORT_ENV, .. }));

        let err = AppConfig::from_lookup(lookup(&[
            (CONSUMER_SECRET_ENV, "s"),
            (UPSTREAM_TIMEOUT_ENV, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: UPSTREAM_TIMEOUT_ENV, .. }));
    }

    #[test]
    fn tls_requires_both_paths() {
        let err = AppConfig::from_lookup(lookup(&[
            (CONSUMER_SECRET_ENV, "s"),
            (TLS_CERT_PATH_ENV, "/certs/cert.pem"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(TLS_KEY_PATH_ENV)));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config = AppConfig::new("super-secret-value");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
