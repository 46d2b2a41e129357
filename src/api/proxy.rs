// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::error::ApiError;
use crate::proxy::{
    ManagementProxyRequest, ProxyDispatcher, ProxyResponse, ResourceProxyRequest,
};
use crate::state::AppState;

/// Reply with the wrapped status as the HTTP status.
fn respond(response: ProxyResponse) -> (StatusCode, Json<ProxyResponse>) {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(response))
}

/// Forward a call to the management gateway.
#[utoipa::path(
    post,
    path = "/api/proxy",
    tag = "Proxy",
    request_body = ManagementProxyRequest,
    responses(
        (status = 200, description = "Upstream response (any upstream status is mirrored)", body = ProxyResponse),
        (status = 400, description = "Missing or invalid parameters"),
        (status = 500, description = "Upstream unreachable or timed out")
    )
)]
pub async fn management_proxy(
    State(state): State<AppState>,
    payload: Result<Json<ManagementProxyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProxyResponse>), ApiError> {
    let Json(request) = payload?;
    let response = state.management.forward(request).await?;
    Ok(respond(response))
}

/// Forward a call to the resource API.
///
/// A 401 caused by an expired session is answered with 200 and the upstream
/// error under `originalError`.
#[utoipa::path(
    post,
    path = "/api/salesforce-proxy",
    tag = "Proxy",
    request_body = ResourceProxyRequest,
    responses(
        (status = 200, description = "Upstream response, 2xx normalized to 200", body = ProxyResponse),
        (status = 400, description = "Missing or invalid parameters"),
        (status = 500, description = "Upstream unreachable or timed out")
    )
)]
pub async fn resource_proxy(
    State(state): State<AppState>,
    payload: Result<Json<ResourceProxyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProxyResponse>), ApiError> {
    let Json(request) = payload?;
    let response = state.resource.forward(request).await?;
    Ok(respond(response))
}
