//! Shared utilities for router and server integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use insights_api::config::ApiConfig;
use insights_api::http::build_router;
use tower::ServiceExt;

/// Router over `config`, no listener.
pub fn app(config: ApiConfig) -> Router {
    build_router(Arc::new(config))
}

/// Drive one request through `router`.
pub async fn send(router: Router, request: Request<Body>) -> Response {
    match router.oneshot(request).await {
        Ok(response) => response,
        Err(err) => match err {},
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap_or_else(|err| panic!("failed to read response body: {err}"))
        .to_vec()
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        panic!(
            "response body is not JSON: {err}; body={}",
            String::from_utf8_lossy(&bytes)
        )
    })
}

/// Fresh, empty export directory under the system temp dir.
#[allow(dead_code)]
pub fn temp_export_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("insights-exports-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
