// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Host page rendering.
//!
//! The frontend build's `index.html` is read on every authentication and the
//! decoded envelope is embedded as `window.salesforceEnvelope` so the SPA can
//! pick it up without another round trip.

use std::path::{Path, PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::error;

use crate::canvas::CanvasEnvelope;

pub const INDEX_FILE: &str = "index.html";

/// Global variable the frontend reads the envelope from.
pub const ENVELOPE_GLOBAL: &str = "window.salesforceEnvelope";

const BODY_CLOSE: &str = "</body>";

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("failed to read {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!(error = %self, "Host page rendering failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Error loading application").into_response()
    }
}

#[derive(Debug, Clone)]
pub struct HostPage {
    dist_dir: PathBuf,
}

impl HostPage {
    pub fn new(dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            dist_dir: dist_dir.into(),
        }
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dist_dir.join(INDEX_FILE)
    }

    /// Whether the frontend build is present.
    pub fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    pub async fn render(&self, envelope: &CanvasEnvelope) -> Result<String, PageError> {
        let path = self.index_path();
        let html = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| PageError::Template { path, source })?;
        Ok(inject_envelope(&html, envelope.as_value())?)
    }
}

/// Insert the envelope script before the first `</body>`, or append it.
pub fn inject_envelope(html: &str, envelope: &Value) -> Result<String, serde_json::Error> {
    // `</` would let string content close the script element early.
    let json = serde_json::to_string(envelope)?.replace("</", "<\\/");
    let script = format!("<script>{ENVELOPE_GLOBAL} = {json};</script>");

    let mut page = String::with_capacity(html.len() + script.len());
    match html.find(BODY_CLOSE) {
        Some(index) => {
            page.push_str(&html[..index]);
            page.push_str(&script);
            page.push_str(&html[index..]);
        }
        None => {
            page.push_str(html);
            page.push_str(&script);
        }
    }
    Ok(page)
}
