//! Request inspection helpers shared by all handlers.
//!
//! # Responsibilities
//! - Find the caller's session token (header first, then query or form parameter)
//! - Pull the request payload (`data` parameter, form field or body) and deserialize it
//! - Assign a trace id to every request and log a snapshot of its parameters
//!
//! # Design Decisions
//! - Helpers work on anything implementing [`RequestView`], so they serve
//!   both full requests (middleware) and split parts (extractors)
//! - Only a missing payload aborts the request; every other lookup yields `None`

use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::{header::CONTENT_TYPE, request::Parts, Extensions, HeaderMap, HeaderValue, Method, Uri},
    middleware::Next,
    response::Response,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::http::error::{ApiError, REQUEST_BODY_ERROR, REQUEST_DATA_ERROR};
use crate::observability::metrics;

/// Response header echoing the request's trace id.
pub const X_TRACE_ID: &str = "x-trace-id";

/// Query parameter (or form field) carrying the request payload.
pub const DATA_PARAM: &str = "data";

/// Media type of an HTML form body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Per-request correlation id, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

/// Read access to the parts of a request these helpers inspect.
pub trait RequestView {
    fn method(&self) -> &Method;
    fn uri(&self) -> &Uri;
    fn headers(&self) -> &HeaderMap;
    fn extensions_mut(&mut self) -> &mut Extensions;
}

impl<B> RequestView for axum::http::Request<B> {
    fn method(&self) -> &Method {
        axum::http::Request::method(self)
    }

    fn uri(&self) -> &Uri {
        axum::http::Request::uri(self)
    }

    fn headers(&self) -> &HeaderMap {
        axum::http::Request::headers(self)
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        axum::http::Request::extensions_mut(self)
    }
}

impl RequestView for Parts {
    fn method(&self) -> &Method {
        &self.method
    }

    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// First value of query parameter `name`, percent-decoded.
pub fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// True when the `Content-Type` names a form-urlencoded body.
pub fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// First value of field `name` in a form-urlencoded body.
pub fn form_param(body: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Session token from the configured header, falling back to the parameter
/// of the same purpose in the query string or, for form posts, the body.
///
/// Pass `body` only once it has been buffered; extractors that run before
/// the body is read pass `None`.
pub fn extract_session_token<R: RequestView + ?Sized>(
    request: &R,
    session: &SessionConfig,
    body: Option<&[u8]>,
) -> Option<String> {
    if let Some(value) = request.headers().get(session.header_name.as_str()) {
        if let Ok(token) = value.to_str() {
            return Some(token.to_string());
        }
    }

    query_param(request.uri(), &session.param_name).or_else(|| {
        body.filter(|_| is_form_encoded(request.headers()))
            .and_then(|body| form_param(body, &session.param_name))
    })
}

/// The request's payload: the `data` parameter for GET, the `data` field of
/// a form body, the raw body otherwise.
///
/// An empty body is treated the same as a missing one.
pub fn require_request_payload<R: RequestView + ?Sized>(request: &R, body: Option<&str>) -> Result<String, ApiError> {
    if request.method() == Method::GET {
        return query_param(request.uri(), DATA_PARAM)
            .ok_or_else(|| ApiError::BadRequest(REQUEST_DATA_ERROR.to_string()));
    }

    let payload = if is_form_encoded(request.headers()) {
        body.and_then(|body| form_param(body.as_bytes(), DATA_PARAM))
    } else {
        body.map(str::to_string)
    };

    match payload {
        Some(payload) if !payload.is_empty() => Ok(payload),
        _ => Err(ApiError::BadRequest(REQUEST_BODY_ERROR.to_string())),
    }
}

/// Parse a request payload into `T`.
pub fn deserialize_payload<T: DeserializeOwned>(data: &str) -> Result<T, ApiError> {
    Ok(serde_json::from_str(data)?)
}

/// Parameter snapshot logged with a trace id: every query parameter (values
/// as arrays, repeated keys kept) plus the request URL.
fn trace_snapshot<R: RequestView + ?Sized>(request: &R) -> Value {
    let mut params = Map::new();

    if let Some(query) = request.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = params
                .entry(key.into_owned())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = slot {
                values.push(Value::String(value.into_owned()));
            }
        }
    }

    params.insert("url".to_string(), Value::String(request_url(request)));
    Value::Object(params)
}

/// URL without the query string; host taken from the URI or `Host` header.
fn request_url<R: RequestView + ?Sized>(request: &R) -> String {
    let uri = request.uri();
    let path = uri.path();

    if let Some(authority) = uri.authority() {
        let scheme = uri.scheme_str().unwrap_or("http");
        return format!("{scheme}://{authority}{path}");
    }

    match request.headers().get("host").and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{host}{path}"),
        None => path.to_string(),
    }
}

/// Generate a trace id, log it with the request snapshot, and store it in
/// the request extensions as [`TraceId`].
pub fn assign_trace_id<R: RequestView + ?Sized>(request: &mut R) -> String {
    let trace_id = Uuid::new_v4().to_string();
    let snapshot = trace_snapshot(&*request);

    tracing::debug!(trace_id = %trace_id, params = %snapshot, "Request received");

    request.extensions_mut().insert(TraceId(trace_id.clone()));
    trace_id
}

/// Middleware: assign a trace id, echo it in `X-Trace-Id`, record metrics.
pub async fn trace_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let trace_id = assign_trace_id(&mut request);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(X_TRACE_ID, value);
    }
    metrics::record_request(&method, response.status().as_u16(), start);

    tracing::debug!(
        trace_id = %trace_id,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}
