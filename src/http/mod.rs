//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (trace id, session token, payload)
//!     → handler (fields::mapping renames row keys)
//!     → envelope.rs (content / pagination / message)
//!     → response.rs (CORS headers, export streaming)
//!     → Send to client
//! ```

pub mod envelope;
pub mod error;
pub mod format;
pub mod request;
pub mod response;
pub mod server;

pub use envelope::{ErrorEnvelope, Message, Pagination, ResponseEnvelope};
pub use error::ApiError;
pub use format::{determine_output_format, OutputFormat};
pub use request::{RequestView, TraceId, X_TRACE_ID};
pub use response::CorsPolicy;
pub use server::{build_router, AppState, HttpServer, RequestContext};
