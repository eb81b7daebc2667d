//! Persistence stage: build the document for a finished run and merge-upsert
//! it into the store.

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::traits::store::RecordStore;
use crate::types::job::JobStatus;
use crate::types::record::{StoredDimension, StoredRecord};
use crate::types::state::{PipelineState, Stage};

/// `source` recorded on dimensions produced by the completion service.
const DIMENSION_SOURCE: &str = "completion";

/// Build the persisted document from a run's accumulated state.
///
/// Requires the dimension mapping and quality metrics; classification and
/// experience fields map through as optional. Dimensions without a value
/// this run are omitted so the upsert merge preserves any value a prior run
/// extracted for them.
pub fn build_record(state: &PipelineState) -> Result<StoredRecord> {
    let mapping = state.require_dimensions(Stage::Persistence)?;
    let quality = state.require_quality(Stage::Persistence)?;

    let mut extracted_dimensions = IndexMap::new();
    for (name, dim) in &mapping.dimensions {
        let Some(value) = &dim.value else { continue };

        let mut metadata = IndexMap::new();
        metadata.insert("required".to_string(), json!(dim.required));
        metadata.insert("threshold".to_string(), json!(dim.threshold));

        extracted_dimensions.insert(
            name.clone(),
            StoredDimension {
                value: value.clone(),
                confidence: dim.confidence,
                source: DIMENSION_SOURCE.to_string(),
                metadata,
            },
        );
    }

    let mut extraction_metadata: IndexMap<String, serde_json::Value> = state.metadata.clone();
    extraction_metadata.insert("extraction_time".into(), json!(Utc::now().to_rfc3339()));
    extraction_metadata.insert("total_dimensions".into(), json!(mapping.total));
    extraction_metadata.insert("quality_score".into(), json!(quality.quality_score));
    extraction_metadata.insert("confidence_score".into(), json!(quality.confidence_score));
    extraction_metadata.insert("completeness_score".into(), json!(quality.completeness_score));
    extraction_metadata.insert("validation_passed".into(), json!(quality.passed));
    if let Some(content) = &state.content {
        extraction_metadata.insert("content_hash".into(), json!(content.content_hash));
    }

    Ok(StoredRecord {
        id: state.job.id.clone(),
        url: state.job.url.clone(),
        status: JobStatus::Extracted,
        domain: state.classification.as_ref().map(|c| c.domain.clone()),
        sub_domain: state.classification.as_ref().map(|c| c.sub_domain.clone()),
        role: state.classification.as_ref().map(|c| c.role.clone()),
        experience_level: state.experience.as_ref().map(|e| e.level.clone()),
        extracted_dimensions,
        quality_metrics: Some(quality.clone()),
        entities: Vec::new(),
        created_at: state.job.created_at,
        updated_at: Utc::now(),
        extraction_metadata,
    })
}

/// Merge-upsert the run's document into the store.
pub async fn persist_extraction<S: RecordStore>(
    store: &S,
    state: &PipelineState,
) -> Result<StoredRecord> {
    let record = build_record(state)?;
    let persisted = store.upsert_record(record).await?;

    info!(
        job_id = %persisted.id,
        dimensions = persisted.extracted_dimensions.len(),
        "Extraction persisted"
    );

    Ok(persisted)
}
