//! Request-aborting errors and their HTTP mapping.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::envelope::ErrorEnvelope;
use crate::http::format::OutputFormat;

/// Fixed message for a read request without a `data` parameter.
pub const REQUEST_DATA_ERROR: &str = "Include data parameter!!!";

/// Fixed message for a mutating request without a body.
pub const REQUEST_BODY_ERROR: &str = "Include JSON Body data!!!";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Malformed JSON payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Request body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Request body exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("No record kind named '{0}'")]
    UnknownRecordKind(String),

    #[error("No {0} export is available for this resource")]
    NotAcceptable(OutputFormat),

    #[error("Error response must carry exactly one status, got {0}")]
    AmbiguousErrorEnvelope(usize),

    #[error("Export file {} could not be read: {source}", .path.display())]
    ExportUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::MalformedPayload(_) | ApiError::InvalidUtf8(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnknownRecordKind(_) => StatusCode::NOT_FOUND,
            ApiError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            ApiError::AmbiguousErrorEnvelope(_) | ApiError::ExportUnavailable { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for errors caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::debug!(error = %self, "Request rejected");
        } else {
            tracing::error!(error = %self, "Request failed");
        }
        ErrorEnvelope::new(self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest(REQUEST_DATA_ERROR.into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotAcceptable(OutputFormat::Json).status_code(),
            StatusCode::NOT_ACCEPTABLE
        );
        assert_eq!(
            ApiError::AmbiguousErrorEnvelope(2).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::PayloadTooLarge(8).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(ApiError::UnknownRecordKind("x".into()).is_client_error());
    }

    #[test]
    fn test_bad_request_message_is_verbatim() {
        let err = ApiError::BadRequest(REQUEST_BODY_ERROR.into());
        assert_eq!(err.to_string(), "Include JSON Body data!!!");
    }
}
