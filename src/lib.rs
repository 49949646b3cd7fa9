//! Learning-analytics REST API: field name translation and response shaping.

pub mod config;
pub mod fields;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ApiConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
