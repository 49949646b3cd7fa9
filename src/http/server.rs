//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, timeout, trace id, CORS)
//! - Bind server to listener and shut down gracefully

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, FromRequestParts, Path, State},
    http::{request::Parts, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::fields::RecordKind;
use crate::http::envelope::{build_plain_envelope, build_success_envelope, ErrorEnvelope, ResponseEnvelope, TOTAL_ROWS};
use crate::http::error::ApiError;
use crate::http::format::{output_format_from_headers, OutputFormat};
use crate::http::request::{
    deserialize_payload, extract_session_token, require_request_payload, trace_id_middleware, TraceId,
};
use crate::http::response::{error_envelope_middleware, export_response, preflight_middleware, CorsPolicy};
use crate::lifecycle::shutdown::shutdown_signal;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
}

/// Per-request facts every `/v1` handler needs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: Option<String>,
    pub session_token: Option<String>,
    pub format: OutputFormat,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self {
            trace_id: parts.extensions.get::<TraceId>().map(|id| id.0.clone()),
            session_token: extract_session_token(&*parts, &state.config.session, None),
            format: output_format_from_headers(&parts.headers),
        })
    }
}

/// HTTP server for the insights API.
pub struct HttpServer {
    router: Router,
    config: Arc<ApiConfig>,
}

impl HttpServer {
    /// Create a server over `config`, building its router once.
    pub fn new(config: ApiConfig) -> Self {
        let config = Arc::new(config);
        let router = build_router(config.clone());
        Self { router, config }
    }

    /// Serve on `listener` until Ctrl+C or `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Configuration the router was built from.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: Arc<ApiConfig>) -> Router {
    let cors = CorsPolicy::from_config(&config.cors).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Invalid CORS configuration, using defaults");
        CorsPolicy::default()
    });
    let [allow_origin, allow_headers, allow_methods] = cors.headers();
    let timeout = Duration::from_secs(config.timeouts.request_secs);
    let body_limit = config.listener.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/v1/fields/{kind}", get(field_table))
        .route("/v1/fields/{kind}/translate", get(translate_rows).post(translate_rows))
        .route("/v1/exports/{file_name}", get(download_export))
        .fallback(not_found)
        .with_state(AppState { config })
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(error_envelope_middleware))
        .layer(middleware::from_fn(trace_id_middleware))
        .layer(middleware::from_fn(preflight_middleware))
        .layer(SetResponseHeaderLayer::overriding(allow_origin.0, allow_origin.1))
        .layer(SetResponseHeaderLayer::overriding(allow_headers.0, allow_headers.1))
        .layer(SetResponseHeaderLayer::overriding(allow_methods.0, allow_methods.1))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> ResponseEnvelope {
    let mut content = Map::new();
    content.insert("status".to_string(), json!("ok"));
    content.insert("version".to_string(), json!(env!("CARGO_PKG_VERSION")));
    build_plain_envelope(content)
}

async fn not_found() -> ErrorEnvelope {
    ErrorEnvelope::new(StatusCode::NOT_FOUND, "No such resource")
}

fn parse_kind(kind: &str) -> Result<RecordKind, ApiError> {
    kind.parse().map_err(ApiError::UnknownRecordKind)
}

/// Full external → internal table for a record kind.
async fn field_table(Path(kind): Path<String>) -> Result<ResponseEnvelope, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(build_plain_envelope(kind.mapping().to_json()))
}

/// Buffered request body, with the size limit reported as 413.
fn read_body(body: Result<Bytes, BytesRejection>, limit: usize) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(limit)
        } else {
            ApiError::BadRequest(format!("Unreadable request body: {}", rejection.body_text()))
        }
    })
}

/// Rename the keys of a JSON array of rows supplied via `data`, a form field
/// or the body.
async fn translate_rows(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    ctx: RequestContext,
    parts: Parts,
    body: Result<Bytes, BytesRejection>,
) -> Result<ResponseEnvelope, ApiError> {
    let kind = parse_kind(&kind)?;

    let body = if parts.method == Method::GET {
        None
    } else {
        Some(read_body(body, state.config.listener.max_body_bytes)?)
    };
    let text = body.as_deref().map(std::str::from_utf8).transpose()?;

    let session_token = ctx
        .session_token
        .or_else(|| extract_session_token(&parts, &state.config.session, body.as_deref()));

    let payload = require_request_payload(&parts, text)?;
    let rows: Vec<Map<String, Value>> = deserialize_payload(&payload)?;

    tracing::debug!(
        trace_id = ctx.trace_id.as_deref().unwrap_or("-"),
        kind = %kind,
        rows = rows.len(),
        has_session = session_token.is_some(),
        "Translating rows"
    );

    let mapping = kind.mapping();
    let translated: Vec<_> = rows.iter().map(|row| mapping.translate_row(row)).collect();

    let mut message = Map::new();
    message.insert(TOTAL_ROWS.to_string(), json!(translated.len()));
    message.insert("recordKind".to_string(), json!(kind.slug()));
    Ok(build_success_envelope(translated, message))
}

/// Stream a generated export in the format named by `Accept`.
async fn download_export(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    ctx: RequestContext,
) -> Result<axum::response::Response, ApiError> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.contains("..") {
        return Err(ApiError::BadRequest(format!("Invalid export name '{file_name}'")));
    }

    tracing::debug!(
        trace_id = ctx.trace_id.as_deref().unwrap_or("-"),
        file = %file_name,
        format = %ctx.format,
        has_session = ctx.session_token.is_some(),
        "Export requested"
    );

    let path = state
        .config
        .export
        .directory
        .join(format!("{file_name}.{}", ctx.format.extension()));
    export_response(ctx.format, &path).await
}
