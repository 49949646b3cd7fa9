//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_HEADER: &str = "Gooru-Session-Token";
pub const DEFAULT_SESSION_PARAM: &str = "sessionToken";

pub const DEFAULT_ALLOW_ORIGIN: &str = "*";
pub const DEFAULT_ALLOW_HEADERS: &str =
    "Cache-Control, Pragma, Origin, Authorization, Content-Type, X-Requested-With";
pub const DEFAULT_ALLOW_METHODS: &str = "GET, PUT, POST, DELETE";

/// Root configuration for the insights API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Where the session token is looked up.
    pub session: SessionConfig,

    /// CORS response headers.
    pub cors: CorsConfig,

    /// Generated report files.
    pub export: ExportConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body read into memory, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Session token lookup names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Header checked first.
    pub header_name: String,

    /// Query or form parameter checked when the header is absent.
    pub param_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_SESSION_HEADER.to_string(),
            param_name: DEFAULT_SESSION_PARAM.to_string(),
        }
    }
}

/// CORS header values, written verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_headers: String,
    pub allow_methods: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: DEFAULT_ALLOW_ORIGIN.to_string(),
            allow_headers: DEFAULT_ALLOW_HEADERS.to_string(),
            allow_methods: DEFAULT_ALLOW_METHODS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory the report generator writes CSV/XLS files into.
    pub directory: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./exports"),
        }
    }
}
