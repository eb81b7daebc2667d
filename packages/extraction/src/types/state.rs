//! The accumulator threaded through all pipeline stages.
//!
//! `PipelineState` has one slot per stage. Slots are stage-owned and
//! append-only: no stage writes a slot owned by an earlier stage, so a
//! populated slot is immutable for the rest of the run.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};
use crate::types::job::JobRecord;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Content,
    Classification,
    ExperienceDetection,
    DimensionMapping,
    QualityValidation,
    Persistence,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Content => "content",
            Stage::Classification => "classification",
            Stage::ExperienceDetection => "experience_detection",
            Stage::DimensionMapping => "dimension_mapping",
            Stage::QualityValidation => "quality_validation",
            Stage::Persistence => "persistence",
        };
        write!(f, "{name}")
    }
}

/// A recorded stage failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Raw page content produced by the content stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Plain text of the posting
    pub raw_text: String,

    /// Page title, when the source exposed one
    pub page_title: Option<String>,

    /// SHA-256 of `raw_text`, hex encoded
    pub content_hash: String,
}

impl ExtractedContent {
    /// Build from raw text, computing the content hash.
    pub fn new(raw_text: impl Into<String>, page_title: Option<String>) -> Self {
        use sha2::{Digest, Sha256};

        let raw_text = raw_text.into();
        let mut hasher = Sha256::new();
        hasher.update(raw_text.as_bytes());
        let content_hash = format!("{:x}", hasher.finalize());

        Self {
            raw_text,
            page_title,
            content_hash,
        }
    }
}

/// Output of the domain classification stage.
///
/// The triple is guaranteed to be a path in the loaded taxonomy; anything
/// the completion service returned outside it fails the stage instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainClassification {
    pub domain: String,
    pub sub_domain: String,
    pub role: String,
    pub confidence: f32,
}

/// How the experience level was resolved.
///
/// The detector degrades through three tiers rather than failing: a strict
/// parse of the completion response, a containment scan over the response
/// text, and finally the role's first declared level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelResolution {
    Parsed,
    Recovered,
    Defaulted,
}

/// Output of the experience level detection stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceDetection {
    /// One of the resolved role's declared levels
    pub level: String,
    pub confidence: f32,
    pub resolution: LevelResolution,
}

/// One extracted dimension with its scoring inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedDimension {
    /// Extracted value; `None` when the posting did not contain the field
    pub value: Option<serde_json::Value>,

    /// Confidence reported by the completion service; 0.0 when value absent
    pub confidence: f32,

    /// Whether the taxonomy marks this dimension required
    pub required: bool,

    /// Confidence threshold this dimension must meet to count as valid
    pub threshold: f32,
}

impl MappedDimension {
    /// A dimension counts as extracted when a value is present and its
    /// confidence meets the threshold.
    pub fn is_extracted(&self) -> bool {
        self.value.is_some() && self.confidence >= self.threshold
    }
}

/// Output of the dimension mapping stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionMapping {
    /// Per-dimension results, in taxonomy declaration order
    pub dimensions: IndexMap<String, MappedDimension>,

    /// Total dimensions declared for the resolved level
    pub total: usize,

    /// Dimensions marked required
    pub required_count: usize,

    /// Required dimensions extracted above threshold
    pub extracted_required_count: usize,

    /// `extracted_required_count / required_count`, 1.0 when no required dimensions
    pub completeness_score: f32,
}

/// Output of the quality validation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub quality_score: f32,
    pub completeness_score: f32,
    pub confidence_score: f32,
    pub required_dimensions_score: f32,
    pub passed: bool,

    /// Human-readable reasons; explain the score, never affect it
    pub issues: Vec<String>,
}

/// The accumulator threaded through all stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Identity and lifecycle anchor
    pub job: JobRecord,

    pub content: Option<ExtractedContent>,
    pub classification: Option<DomainClassification>,
    pub experience: Option<ExperienceDetection>,
    pub dimensions: Option<DimensionMapping>,
    pub quality: Option<QualityMetrics>,

    /// Ordered stage failures; empty on a fully successful run
    pub errors: Vec<StageError>,

    /// Free-form stage timestamps and flags
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl PipelineState {
    /// Start a run for a job.
    pub fn new(job: JobRecord) -> Self {
        Self {
            job,
            content: None,
            classification: None,
            experience: None,
            dimensions: None,
            quality: None,
            errors: Vec::new(),
            metadata: IndexMap::new(),
        }
    }

    /// Record a stage failure without aborting the run.
    pub fn record_error(&mut self, stage: Stage, message: impl Into<String>) {
        self.errors.push(StageError {
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Stamp a metadata entry.
    pub fn stamp(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Content produced by the content stage, or `MissingDependency`.
    pub fn require_content(&self, stage: Stage) -> Result<&ExtractedContent> {
        self.content
            .as_ref()
            .ok_or(ExtractionError::MissingDependency {
                stage,
                needs: "extracted_content",
            })
    }

    /// Classification triple, or `MissingDependency`.
    pub fn require_classification(&self, stage: Stage) -> Result<&DomainClassification> {
        self.classification
            .as_ref()
            .ok_or(ExtractionError::MissingDependency {
                stage,
                needs: "domain_classification",
            })
    }

    /// Detected experience level, or `MissingDependency`.
    pub fn require_experience(&self, stage: Stage) -> Result<&ExperienceDetection> {
        self.experience
            .as_ref()
            .ok_or(ExtractionError::MissingDependency {
                stage,
                needs: "experience_detection",
            })
    }

    /// Dimension mapping, or `MissingDependency`.
    pub fn require_dimensions(&self, stage: Stage) -> Result<&DimensionMapping> {
        self.dimensions
            .as_ref()
            .ok_or(ExtractionError::MissingDependency {
                stage,
                needs: "dimension_mapping",
            })
    }

    /// Quality metrics, or `MissingDependency`.
    pub fn require_quality(&self, stage: Stage) -> Result<&QualityMetrics> {
        self.quality
            .as_ref()
            .ok_or(ExtractionError::MissingDependency {
                stage,
                needs: "quality_metrics",
            })
    }
}
