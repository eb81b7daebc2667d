//! The persisted document shape, keyed by job id.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::job::JobStatus;
use crate::types::state::QualityMetrics;

/// One persisted dimension value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDimension {
    pub value: serde_json::Value,
    pub confidence: f32,

    /// Which collaborator produced the value
    pub source: String,

    #[serde(default)]
    pub metadata: IndexMap<String, serde_json::Value>,
}

/// The persisted extraction document.
///
/// Absent until the first successful pipeline run for the job id, then
/// updated by merge on every subsequent run. Scalar classification fields
/// are `Option` so a merge can tell "this run produced nothing" apart from
/// an explicit value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub url: String,
    pub status: JobStatus,

    pub domain: Option<String>,
    pub sub_domain: Option<String>,
    pub role: Option<String>,
    pub experience_level: Option<String>,

    #[serde(default)]
    pub extracted_dimensions: IndexMap<String, StoredDimension>,

    pub quality_metrics: Option<QualityMetrics>,

    /// Owned by the discovery flow; preserved verbatim across extraction runs
    #[serde(default)]
    pub entities: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Open key set merged key-by-key on upsert. The pipeline writes
    /// `extraction_time`, `total_dimensions`, `quality_score`,
    /// `confidence_score`, `completeness_score`, `validation_passed` and
    /// `content_hash`; other keys pass through untouched.
    #[serde(default)]
    pub extraction_metadata: IndexMap<String, serde_json::Value>,
}

impl StoredRecord {
    /// Serialized top-level field names, used to audit the merge policy table.
    pub const FIELDS: &'static [&'static str] = &[
        "id",
        "url",
        "status",
        "domain",
        "sub_domain",
        "role",
        "experience_level",
        "extracted_dimensions",
        "quality_metrics",
        "entities",
        "created_at",
        "updated_at",
        "extraction_metadata",
    ];
}
