// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    response::{Html, IntoResponse, Response},
};
use tracing::{info, warn};

use crate::canvas::{EnvelopeCodec, InboundBody};
use crate::state::AppState;

/// Authenticate a signed request and render the host page.
///
/// The body may be the raw `signature.payload` string (optionally prefixed
/// with `signed_request=` or percent-encoded), a form, or a JSON object with
/// a `signed_request` field.
#[utoipa::path(
    post,
    path = "/",
    tag = "Canvas",
    request_body(content = String, content_type = "application/x-www-form-urlencoded", description = "Signed request"),
    responses(
        (status = 200, description = "Host page with the decoded envelope embedded", content_type = "text/html", body = String),
        (status = 400, description = "Missing or malformed signed request", content_type = "text/plain", body = String),
        (status = 401, description = "Signature mismatch", content_type = "text/plain", body = String),
        (status = 500, description = "Host page could not be rendered", content_type = "text/plain", body = String)
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Html<String>, Response> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let inbound = InboundBody::from_bytes(content_type, &body);

    let request = state.verifier.verify(&inbound).map_err(|e| {
        warn!(error = %e, code = e.error_code(), "Signed request rejected");
        e.into_response()
    })?;

    let mut envelope = EnvelopeCodec::decode(request.payload()).map_err(|e| {
        warn!(error = %e, "Signed request payload could not be decoded");
        e.into_response()
    })?;

    info!(
        user_id = envelope.user_id().unwrap_or_default(),
        organization_id = envelope.organization_id().unwrap_or_default(),
        instance_url = envelope.instance_url().unwrap_or_default(),
        application = envelope.application_name().unwrap_or_default(),
        has_oauth_token = envelope.oauth_token().is_some(),
        "Signed request verified"
    );

    let token = if state.broker.is_configured() {
        state.broker.acquire_token().await
    } else {
        None
    };
    if envelope.attach_federated_token(token) {
        info!(
            federated = envelope.federated_token().is_some(),
            "Federated token field attached"
        );
    } else {
        warn!("Envelope is not an object; federated token not attached");
    }

    let html = state
        .page
        .render(&envelope)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Html(html))
}
