//! Typed errors for the extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

use crate::types::state::Stage;

/// Errors that can occur during pipeline execution.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Taxonomy configuration missing or structurally invalid (fatal, pre-run)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A stage ran without a required upstream output
    #[error("{stage} requires {needs} from an earlier stage")]
    MissingDependency { stage: Stage, needs: &'static str },

    /// Completion result outside the closed taxonomy
    #[error("invalid classification: {reason}")]
    InvalidClassification { reason: String },

    /// Completion call failed during dimension extraction
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// Completion response could not be parsed as the expected JSON
    #[error("malformed extraction response: {0}")]
    MalformedExtraction(String),

    /// Content collaborator failed
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// Completion service unavailable or failed
    #[error("completion service error: {0}")]
    Completion(String),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Upsert could not reconcile the incoming record with the stored one
    #[error("storage conflict for job {id}: {reason}")]
    StorageConflict { id: String, reason: String },

    /// Job not found in the catalog
    #[error("job not found: {id}")]
    JobNotFound { id: String },
}

/// Errors raised while loading or validating taxonomy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No taxonomy defined for the requested domain
    #[error("no taxonomy for domain: {domain}")]
    NotFound { domain: String },

    /// Taxonomy file exists but fails structural validation
    #[error("invalid taxonomy for {domain}: {reason}")]
    Invalid { domain: String, reason: String },

    /// Taxonomy file could not be read
    #[error("failed to read taxonomy from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Taxonomy file is not valid JSON
    #[error("failed to parse taxonomy from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by the content extraction collaborator.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Navigation failed after exhausting the bounded retry budget
    #[error("navigation failed for {url} after {attempts} attempts")]
    Navigation { url: String, attempts: u32 },

    /// A single navigation attempt timed out
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// HTTP-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The content session was used before `open` or after `close`
    #[error("content session is not open")]
    SessionClosed,
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for taxonomy configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for content operations.
pub type ContentResult<T> = std::result::Result<T, ContentError>;
