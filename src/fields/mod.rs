//! Field name translation subsystem.
//!
//! # Data Flow
//! ```text
//! storage/export row (snake_case keys)
//!     → mapping.rs (exact-key lookup per record kind)
//!     → row with API attribute names (camelCase), unknown keys dropped
//!     → http::envelope
//! ```
//!
//! # Design Decisions
//! - Tables are built once from the key enums in keys.rs and never mutated
//! - A missing key is `None`, not an error; callers skip the field
//! - Lookups are exact and case-sensitive

pub mod keys;
pub mod mapping;

pub use keys::{AssessmentAnswerKey, SessionMetricKey};
pub use mapping::{
    all_session_metric_mappings, translate_assessment_answer_key, translate_session_metric_key,
    FieldMapping, RecordKind,
};
