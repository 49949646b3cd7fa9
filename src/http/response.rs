//! Response shaping shared by all handlers.
//!
//! # Responsibilities
//! - Add permissive CORS headers to every response
//! - Answer CORS preflight requests
//! - Give bare error responses from inner layers the JSON error shape
//! - Stream previously generated CSV/XLS exports back to the client
//!
//! # Design Decisions
//! - Header values are parsed once from config into [`CorsPolicy`]
//! - CORS headers override earlier values, so re-applying is harmless
//! - Export bytes are written verbatim; this layer never inspects them

use std::io;
use std::path::Path;

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW,
            CONTENT_TYPE,
        },
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::{stream, TryStreamExt};
use tokio::io::AsyncReadExt;

use crate::config::CorsConfig;
use crate::http::envelope::ErrorEnvelope;
use crate::http::error::ApiError;
use crate::http::format::OutputFormat;

const EXPORT_CHUNK_BYTES: usize = 64 * 1024;

/// Pre-parsed CORS header values.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_headers: HeaderValue,
    allow_methods: HeaderValue,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, axum::http::header::InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(&config.allow_origin)?,
            allow_headers: HeaderValue::from_str(&config.allow_headers)?,
            allow_methods: HeaderValue::from_str(&config.allow_methods)?,
        })
    }

    /// The three `Access-Control-Allow-*` headers, origin first.
    pub fn headers(&self) -> [(HeaderName, HeaderValue); 3] {
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone()),
            (ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone()),
            (ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone()),
        ]
    }

    /// Set the CORS headers, replacing any earlier values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in self.headers() {
            headers.insert(name, value);
        }
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static(crate::config::schema::DEFAULT_ALLOW_ORIGIN),
            allow_headers: HeaderValue::from_static(crate::config::schema::DEFAULT_ALLOW_HEADERS),
            allow_methods: HeaderValue::from_static(crate::config::schema::DEFAULT_ALLOW_METHODS),
        }
    }
}

/// Set the CORS headers on `response`.
///
/// The router applies the same headers through
/// `SetResponseHeaderLayer::overriding`; this is the per-response form.
pub fn apply_cors_headers(response: &mut Response, policy: &CorsPolicy) {
    policy.apply(response.headers_mut());
}

/// Middleware: answer preflight with 204 without reaching a handler.
///
/// The CORS headers themselves are added by the outer header layers.
pub async fn preflight_middleware(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(request).await
}

/// Middleware: wrap body-less error responses (timeouts, 405s) in an
/// [`ErrorEnvelope`]. Responses that already carry a content type pass
/// through untouched.
pub async fn error_envelope_middleware(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) || response.headers().contains_key(CONTENT_TYPE) {
        return response;
    }

    let allow = response.headers().get(ALLOW).cloned();
    let message = status.canonical_reason().unwrap_or("Request failed");
    let mut enveloped = ErrorEnvelope::new(status, message).into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(ALLOW, allow);
    }
    enveloped
}

/// Response streaming a generated export file verbatim.
///
/// JSON has no export file and is rejected with [`ApiError::NotAcceptable`].
/// Read failures after the headers are sent end the body early and are
/// logged; they cannot change the status line.
pub async fn export_response(format: OutputFormat, path: &Path) -> Result<Response, ApiError> {
    if !format.is_file_export() {
        return Err(ApiError::NotAcceptable(format));
    }

    let unavailable = |source: io::Error| {
        tracing::error!(path = %path.display(), error = %source, "Failed to open export file");
        ApiError::ExportUnavailable {
            path: path.to_path_buf(),
            source,
        }
    };

    let file = tokio::fs::File::open(path).await.map_err(unavailable)?;
    let metadata = file.metadata().await.map_err(unavailable)?;
    if !metadata.is_file() {
        return Err(unavailable(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file")));
    }

    tracing::debug!(path = %path.display(), bytes = metadata.len(), format = %format, "Streaming export");

    let display_path = path.display().to_string();
    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; EXPORT_CHUNK_BYTES];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok::<_, io::Error>(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), file)))
    })
    .inspect_err(move |e| tracing::error!(path = %display_path, error = %e, "Export stream failed"));

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(format.content_type()))],
        Body::from_stream(chunks),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_headers() {
        let mut response = Response::new(Body::empty());
        apply_cors_headers(&mut response, &CorsPolicy::default());

        let headers = response.headers();
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, PUT, POST, DELETE");
        assert_eq!(
            headers[ACCESS_CONTROL_ALLOW_HEADERS],
            "Cache-Control, Pragma, Origin, Authorization, Content-Type, X-Requested-With"
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let policy = CorsPolicy::default();
        let mut response = Response::new(Body::empty());
        apply_cors_headers(&mut response, &policy);
        let first = response.headers().clone();
        apply_cors_headers(&mut response, &policy);

        assert_eq!(response.headers(), &first);
        assert_eq!(response.headers().get_all(ACCESS_CONTROL_ALLOW_ORIGIN).iter().count(), 1);
    }

    #[test]
    fn test_policy_from_config() {
        let config = CorsConfig {
            allow_origin: "https://insights.example.org".into(),
            ..CorsConfig::default()
        };
        let policy = CorsPolicy::from_config(&config).unwrap();
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://insights.example.org");

        let bad = CorsConfig {
            allow_origin: "bad\nvalue".into(),
            ..CorsConfig::default()
        };
        assert!(CorsPolicy::from_config(&bad).is_err());
    }

    #[test]
    fn test_policy_headers_order() {
        let names: Vec<_> = CorsPolicy::default().headers().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS]
        );
    }

    #[tokio::test]
    async fn test_bare_errors_get_envelope() {
        use axum::{middleware, routing::get, Router};
        use tower::ServiceExt;

        let router = Router::new()
            .route("/slow", get(|| async { StatusCode::REQUEST_TIMEOUT }))
            .route("/shaped", get(|| async { ErrorEnvelope::new(StatusCode::CONFLICT, "taken") }))
            .route("/fine", get(|| async { StatusCode::NO_CONTENT }))
            .layer(middleware::from_fn(error_envelope_middleware));

        let call = |uri: &'static str| {
            let router = router.clone();
            async move {
                router
                    .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                    .await
                    .unwrap()
            }
        };

        let slow = call("/slow").await;
        assert_eq!(slow.status(), StatusCode::REQUEST_TIMEOUT);
        let body = axum::body::to_bytes(slow.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({ "statusCode": 408, "message": "Request Timeout" }));

        let shaped = call("/shaped").await;
        let body = axum::body::to_bytes(shaped.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "taken");

        assert_eq!(call("/fine").await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_export_rejects_directory() {
        let result = export_response(OutputFormat::Csv, &std::env::temp_dir()).await;
        assert!(matches!(result, Err(ApiError::ExportUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_export_rejects_json() {
        let result = export_response(OutputFormat::Json, Path::new("/nonexistent")).await;
        assert!(matches!(result, Err(ApiError::NotAcceptable(OutputFormat::Json))));
    }

    #[tokio::test]
    async fn test_export_missing_file() {
        let path = std::env::temp_dir().join(format!("insights-missing-{}.csv", uuid::Uuid::new_v4()));
        let result = export_response(OutputFormat::Csv, &path).await;
        assert!(matches!(result, Err(ApiError::ExportUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_export_streams_bytes() {
        let path = std::env::temp_dir().join(format!("insights-export-{}.xls", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"col_a\tcol_b\n1\t2\n").await.unwrap();

        let response = export_response(OutputFormat::Xls, &path).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/xls");

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"col_a\tcol_b\n1\t2\n");

        let _ = tokio::fs::remove_file(&path).await;
    }
}
