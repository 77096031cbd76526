//! Error types for segment streaming

use thiserror::Error;

use crate::streaming::segment::Namespace;

/// Main error type for the crate
///
/// Only configuration-time operations fail. Runtime streaming calls degrade
/// to "segment keeps its current state" instead of returning errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid streaming config: {0}")]
    InvalidConfig(String),

    #[error("Duplicate segment id '{id}' in {namespace} namespace")]
    DuplicateSegment { namespace: Namespace, id: String },

    #[error("Streaming error: {0}")]
    Streaming(String),
}
