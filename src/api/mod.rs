// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderName, Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    proxy::{ManagementProxyRequest, ProxyResponse, ResourceProxyRequest},
    state::AppState,
};

pub mod canvas;
pub mod health;
pub mod proxy;

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

pub fn router(state: AppState) -> Router {
    let index = ServeFile::new(state.page.index_path());
    let assets = ServeDir::new(state.page.dist_dir()).fallback(index.clone());

    let routes = Router::new()
        .route("/", post(canvas::authenticate).get_service(index))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api/proxy", post(proxy::management_proxy))
        .route("/api/salesforce-proxy", post(proxy::resource_proxy))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback_service(assets)
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ORIGIN, X_REQUESTED_WITH, CONTENT_TYPE, ACCEPT, AUTHORIZATION])
}

#[derive(OpenApi)]
#[openapi(
    paths(
        canvas::authenticate,
        proxy::management_proxy,
        proxy::resource_proxy,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            ManagementProxyRequest,
            ResourceProxyRequest,
            ProxyResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Canvas", description = "Signed request authentication"),
        (name = "Proxy", description = "Upstream API forwarding"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use hmac::{Hmac, Mac};
    use serde_json::{json, Value};
    use sha2::Sha256;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const SECRET: &str = "s3cr3t";
    const INDEX: &str = "<html><body><app-root></app-root></body></html>";

    fn app() -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), INDEX).unwrap();

        let mut config = AppConfig::new(SECRET);
        config.frontend_dist_dir = dir.path().to_path_buf();
        let state = AppState::from_config(&config).unwrap();
        (router(state), dir)
    }

    fn signed_request(secret: &str, payload: &Value) -> String {
        let payload = STANDARD.encode(payload.to_string());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());
        format!("{signature}.{payload}")
    }

    fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (app, _dir) = app();
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn valid_signed_request_renders_envelope() {
        let (app, _dir) = app();
        let body = signed_request(SECRET, &json!({ "u": "1" }));

        let response = app.oneshot(post("/", "text/plain", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("window.salesforceEnvelope = "));
        assert!(html.contains(r#""u":"1""#));
        assert!(html.contains(r#""token_azure":null"#));
        assert!(html.ends_with("</script></body></html>"));
    }

    #[tokio::test]
    async fn form_encoded_signed_request_is_accepted() {
        let (app, _dir) = app();
        let signed = signed_request(SECRET, &json!({ "context": { "user": { "userId": "005" } } }));
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("signed_request", &signed)
            .finish();

        let response = app
            .oneshot(post("/", "application/x-www-form-urlencoded", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#""userId":"005""#));
    }

    #[tokio::test]
    async fn wrong_signature_is_unauthorized_without_digest_echo() {
        let (app, _dir) = app();
        let valid = signed_request(SECRET, &json!({ "u": "1" }));
        let (expected_signature, payload) = valid.split_once('.').unwrap();

        let response = app
            .oneshot(post("/", "text/plain", format!("wrongsig.{payload}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let text = body_text(response).await;
        assert_eq!(text, "Invalid signature - authentication failed");
        assert!(!text.contains(expected_signature));
    }

    #[tokio::test]
    async fn malformed_signed_request_is_bad_request() {
        let (app, _dir) = app();

        let response = app
            .oneshot(post("/", "text/plain", "a.b.c"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "Error processing signed_request: Invalid signed_request format (expected 2 parts, got 3)"
        );
    }

    #[tokio::test]
    async fn missing_template_is_server_error() {
        let (app, dir) = app();
        std::fs::remove_file(dir.path().join("index.html")).unwrap();
        let body = signed_request(SECRET, &json!({ "u": "1" }));

        let response = app.oneshot(post("/", "text/plain", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Error loading application");
    }

    #[tokio::test]
    async fn get_root_serves_index() {
        let (app, _dir) = app();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, INDEX);
    }

    #[tokio::test]
    async fn unknown_paths_fall_back_to_index() {
        let (app, _dir) = app();
        let request = Request::builder()
            .uri("/dashboard/accounts")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, INDEX);
    }

    #[tokio::test]
    async fn readiness_reports_frontend_and_federation() {
        let (app, _dir) = app();
        let request = Request::builder()
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["frontend"], "ok");
        assert_eq!(body["checks"]["federation"], "disabled");
    }

    #[tokio::test]
    async fn readiness_degrades_without_frontend() {
        let (app, dir) = app();
        std::fs::remove_file(dir.path().join("index.html")).unwrap();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn proxy_with_missing_fields_is_bad_request() {
        let (app, _dir) = app();

        let response = app
            .oneshot(post("/api/salesforce-proxy", "application/json", r#"{"url":"https://x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "Missing required parameters: method, token");
        assert_eq!(body["error_code"], "missing_parameters");
    }

    #[tokio::test]
    async fn proxy_with_invalid_json_is_bad_request() {
        let (app, _dir) = app();

        let response = app
            .oneshot(post("/api/proxy", "application/json", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error_code"], "invalid_json");
    }

    #[tokio::test]
    async fn resource_proxy_soft_remaps_session_errors() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.any_request();
                then.status(401)
                    .header("content-type", "application/json")
                    .body(r#"[{"errorCode":"INVALID_SESSION_ID"}]"#);
            })
            .await;

        let (app, _dir) = app();
        let request = json!({
            "url": server.url("/services/data/v59.0/query"),
            "method": "GET",
            "token": "00Dxx0000001gPL!AR8AQJXg"
        });

        let response = app
            .oneshot(post("/api/salesforce-proxy", "application/json", request.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], 200);
        assert_eq!(body["statusText"], "Unauthorized - But Response Forwarded");
        assert_eq!(body["originalError"], json!([{ "errorCode": "INVALID_SESSION_ID" }]));
    }

    #[tokio::test]
    async fn resource_proxy_mirrors_upstream_status() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.any_request();
                then.status(403).body("forbidden");
            })
            .await;

        let (app, _dir) = app();
        let request = json!({
            "url": server.url("/services/data"),
            "method": "GET",
            "token": "00Dxx0000001gPL!AR8AQJXg"
        });

        let response = app
            .oneshot(post("/api/salesforce-proxy", "application/json", request.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["data"], "forbidden");
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_headers() {
        let (app, _dir) = app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/proxy")
            .header(ORIGIN, "https://example.my.salesforce.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        let headers = response.headers();
        assert!(!headers.contains_key("access-control-allow-origin"));
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("DELETE"));
        let allowed = headers["access-control-allow-headers"].to_str().unwrap();
        assert!(allowed.contains("x-requested-with"));
        assert!(allowed.contains("authorization"));
    }

    #[tokio::test]
    async fn cross_origin_proxy_reply_grants_no_origin() {
        let (app, _dir) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/salesforce-proxy")
            .header(ORIGIN, "https://evil.example")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.headers().contains_key("access-control-allow-origin"));
    }

    #[test]
    fn openapi_lists_proxy_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/proxy"));
        assert!(doc.paths.paths.contains_key("/api/salesforce-proxy"));
    }
}
