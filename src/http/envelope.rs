//! Uniform response envelopes.
//!
//! Every JSON body this service writes is either a [`ResponseEnvelope`]
//! (content, pagination, message) or an [`ErrorEnvelope`] (status code and
//! message).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::http::error::ApiError;
use crate::observability::metrics;

/// Message key whose value moves into the pagination section.
pub const TOTAL_ROWS: &str = "totalRows";

/// Message used by a plain envelope with no content.
pub const DEFAULT_MAIL_MESSAGE: &str = "The requested report will be mailed to your registered email address.";

/// Placeholder in [`MAIL_TEXT`] replaced by the caller's address.
pub const DEFAULT_MAIL: &str = "your registered email address";

/// Notice returned when a report is generated asynchronously.
pub const MAIL_TEXT: &str =
    "The requested report is being generated and will be mailed to your registered email address once it is ready.";

/// Pagination section of a success envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(rename = "totalRows", skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<i64>,
}

/// Message section: a key/value map or a bare string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Map(Map<String, Value>),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// Wrap result rows, moving `totalRows` out of `message` into pagination.
///
/// `content` is always present, even for an empty row set. A null total
/// counts as zero; a total that is not an integer is dropped.
pub fn build_success_envelope(rows: Vec<Map<String, Value>>, mut message: Map<String, Value>) -> ResponseEnvelope {
    let mut pagination = Pagination::default();

    if let Some(total) = message.remove(TOTAL_ROWS) {
        pagination.total_rows = match &total {
            Value::Null => Some(0),
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        if pagination.total_rows.is_none() {
            tracing::warn!(total = %total, "Ignoring non-integer totalRows");
        }
    }

    metrics::record_envelope("success");
    ResponseEnvelope {
        content: Some(Value::Array(rows.into_iter().map(Value::Object).collect())),
        pagination: Some(pagination),
        message: Some(Message::Map(message)),
    }
}

/// Envelope carrying `content`, or the default message when it is empty.
pub fn build_plain_envelope(content: Map<String, Value>) -> ResponseEnvelope {
    metrics::record_envelope("plain");
    if content.is_empty() {
        ResponseEnvelope {
            message: Some(Message::Text(DEFAULT_MAIL_MESSAGE.to_string())),
            ..Default::default()
        }
    } else {
        ResponseEnvelope {
            content: Some(Value::Object(content)),
            ..Default::default()
        }
    }
}

/// Envelope telling the client where a generated report will be mailed.
pub fn build_mail_envelope(email: Option<&str>) -> ResponseEnvelope {
    metrics::record_envelope("mail");
    let text = match email.map(str::trim) {
        Some(address) if !address.is_empty() => MAIL_TEXT.replace(DEFAULT_MAIL, address),
        _ => MAIL_TEXT.to_string(),
    };
    ResponseEnvelope {
        message: Some(Message::Text(text)),
        ..Default::default()
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Error body: `{"statusCode": <code>, "message": "..."}`.
///
/// Written with `status_code` as the HTTP status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "statusCode", serialize_with = "serialize_status")]
    pub status_code: StatusCode,
    pub message: String,
}

fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

impl ErrorEnvelope {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        metrics::record_envelope("error");
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// Build from a status → message mapping holding exactly one entry.
    ///
    /// Zero or several entries cannot produce one unambiguous status line and
    /// are rejected.
    pub fn from_entries<I>(entries: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (StatusCode, String)>,
    {
        let mut entries: Vec<_> = entries.into_iter().collect();
        if entries.len() != 1 {
            return Err(ApiError::AmbiguousErrorEnvelope(entries.len()));
        }
        let (status, message) = entries.remove(0);
        Ok(Self::new(status, message))
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}
