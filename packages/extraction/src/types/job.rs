//! Job identity and lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a discovered job.
///
/// A job starts as `Discovered` and advances to `Extracted` only after a
/// successful storage upsert. `Failed` is reserved for callers that have
/// exhausted their own retry budget; a single failed pipeline run leaves
/// the job `Discovered` so it can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Discovered,
    Extracted,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Discovered => write!(f, "discovered"),
            JobStatus::Extracted => write!(f, "extracted"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A discovered job posting, before or after extraction.
///
/// The `id` is externally assigned at discovery time and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Stable, externally assigned identifier
    pub id: String,

    /// Posting URL
    pub url: String,

    /// Lifecycle status
    pub status: JobStatus,

    /// When the job was first discovered
    pub created_at: DateTime<Utc>,

    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a freshly discovered job.
    pub fn discovered(id: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            url: url.into(),
            status: JobStatus::Discovered,
            created_at: now,
            updated_at: now,
        }
    }
}
