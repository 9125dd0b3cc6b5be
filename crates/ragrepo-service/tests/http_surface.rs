//! Integration tests for the axum HTTP surface, exercised with
//! `tower::ServiceExt::oneshot` rather than a bound socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;

// Bring the service's CORS module in via `#[path]` so this test can drive
// it directly. The other handlers need a live `Facade` and are covered at
// the unit level in `ragrepo-core` (facade/answer/retriever tests).
#[path = "../src/cors.rs"]
mod cors;

fn app_without_cors() -> Router {
    Router::new().route("/", get(crate::root))
}

async fn root() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "message": "ragrepo: RAG question-answering over public code-forge repositories",
        "cors_enabled": true,
    }))
}

fn app_with_cors(allowed_origins: Vec<String>) -> Router {
    app_without_cors()
        .layer(axum::middleware::from_fn_with_state(Arc::new(allowed_origins), cors::cors_middleware))
}

#[tokio::test]
async fn root_returns_message_and_cors_flag() {
    let app = app_without_cors();
    let response = app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["cors_enabled"], true);
}

#[tokio::test]
async fn unrestricted_cors_allows_any_origin() {
    let app = app_with_cors(Vec::new());
    let response = app
        .oneshot(Request::builder().uri("/").header("Origin", "https://anything.example").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn restricted_cors_rejects_unknown_origin() {
    let app = app_with_cors(vec!["example.com".to_string()]);
    let response = app
        .oneshot(Request::builder().uri("/").header("Origin", "https://evil.example").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn restricted_cors_allows_matching_origin() {
    let app = app_with_cors(vec!["example.com".to_string()]);
    let response = app
        .oneshot(Request::builder().uri("/").header("Origin", "https://example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "https://example.com");
}

#[tokio::test]
async fn preflight_on_disallowed_origin_is_rejected() {
    let app = app_with_cors(vec!["example.com".to_string()]);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header("Origin", "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn preflight_on_allowed_origin_succeeds() {
    let app = app_with_cors(vec!["example.com".to_string()]);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header("Origin", "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
