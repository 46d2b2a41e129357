// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Proxy errors.
//!
//! Upstream statuses are never errors here; these cover local validation and
//! failures to reach the upstream at all.

use axum::http::StatusCode;

use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Missing required parameters: {0}")]
    MissingParameters(String),

    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream request failed: {0}")]
    Transport(String),
}

impl ProxyError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ProxyError::MissingParameters(_) => "missing_parameters",
            ProxyError::InvalidMethod(_) => "invalid_method",
            ProxyError::InvalidUrl(_) => "invalid_url",
            ProxyError::InvalidHeader(_) => "invalid_header",
            ProxyError::InvalidBody(_) => "invalid_body",
            ProxyError::Timeout => "upstream_timeout",
            ProxyError::Transport(_) => "upstream_unreachable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameters(_)
            | ProxyError::InvalidMethod(_)
            | ProxyError::InvalidUrl(_)
            | ProxyError::InvalidHeader(_)
            | ProxyError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::Timeout | ProxyError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Transport failures are safe for the caller to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProxyError::Timeout | ProxyError::Transport(_))
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        // Transport detail stays in the logs.
        let message = match &err {
            ProxyError::Timeout => "Upstream request timed out".to_string(),
            ProxyError::Transport(_) => "Upstream request failed".to_string(),
            other => other.to_string(),
        };
        ApiError::new(err.status_code(), message).with_code(err.error_code())
    }
}
