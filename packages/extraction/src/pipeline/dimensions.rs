//! Dimension mapping stage.
//!
//! Resolves the level-specific dimension set and extracts every field in a
//! single completion round trip. Missing optional fields are expected and
//! scored, never treated as errors; only a failed call or an unparseable
//! response fails the stage.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::pipeline::parse::parse_json;
use crate::pipeline::prompts::format_dimensions_prompt;
use crate::taxonomy::TaxonomyRegistry;
use crate::traits::completion::{Completion, ResponseFormat};
use crate::types::state::{
    DimensionMapping, DomainClassification, ExperienceDetection, ExtractedContent, MappedDimension,
};

/// One field as returned by the completion service.
#[derive(Debug, Deserialize)]
struct RawDimension {
    #[serde(default)]
    value: Option<serde_json::Value>,

    #[serde(default)]
    confidence: Option<f32>,
}

/// Extract the resolved dimension set from posting text.
///
/// `confidence_override`, when set, replaces every dimension's configured
/// threshold for this run (a run-level floor from the trigger options).
pub async fn map_dimensions<A: Completion>(
    completion: &A,
    registry: &TaxonomyRegistry,
    classification: &DomainClassification,
    experience: &ExperienceDetection,
    content: &ExtractedContent,
    confidence_override: Option<f32>,
    timeout: Duration,
) -> Result<DimensionMapping> {
    let role = registry
        .resolve_role(
            &classification.domain,
            &classification.sub_domain,
            &classification.role,
        )
        .ok_or_else(|| ExtractionError::InvalidClassification {
            reason: format!("classified role {} is not in the taxonomy", classification.role),
        })?;

    let configured = role
        .dimensions_for(&experience.level)
        .ok_or_else(|| ExtractionError::InvalidClassification {
            reason: format!(
                "level {} is not declared for role {}",
                experience.level, classification.role
            ),
        })?;

    let prompt = format_dimensions_prompt(configured, &content.raw_text);

    let response =
        match tokio::time::timeout(timeout, completion.complete(&prompt, ResponseFormat::Json))
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ExtractionError::ExtractionFailed(e.to_string())),
            Err(_) => {
                return Err(ExtractionError::ExtractionFailed(
                    "dimension extraction call timed out".into(),
                ))
            }
        };

    let raw: HashMap<String, RawDimension> = parse_json(&response)
        .map_err(|e| ExtractionError::MalformedExtraction(e.to_string()))?;

    // Walk the declared set, not the response: undeclared response keys are
    // dropped, declared-but-missing keys score as absent.
    let mut dimensions = indexmap::IndexMap::new();
    for (name, config) in configured {
        let value = raw
            .get(name)
            .and_then(|r| r.value.clone())
            .filter(|v| !v.is_null());

        let confidence = if value.is_some() {
            raw.get(name)
                .and_then(|r| r.confidence)
                .unwrap_or(0.0)
                .clamp(0.0, 1.0)
        } else {
            0.0
        };

        dimensions.insert(
            name.clone(),
            MappedDimension {
                value,
                confidence,
                required: config.required,
                threshold: confidence_override.unwrap_or(config.confidence_threshold),
            },
        );
    }

    let total = dimensions.len();
    let required_count = dimensions.values().filter(|d| d.required).count();
    let extracted_required_count = dimensions
        .values()
        .filter(|d| d.required && d.is_extracted())
        .count();

    let completeness_score = if required_count == 0 {
        1.0
    } else {
        extracted_required_count as f32 / required_count as f32
    };

    debug!(
        total,
        required_count,
        extracted_required_count,
        completeness_score,
        "Dimension mapping complete"
    );

    Ok(DimensionMapping {
        dimensions,
        total,
        required_count,
        extracted_required_count,
        completeness_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_registry, MockCompletion};
    use crate::types::state::LevelResolution;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn classification() -> DomainClassification {
        DomainClassification {
            domain: "engineering".into(),
            sub_domain: "backend".into(),
            role: "senior_engineer".into(),
            confidence: 0.9,
        }
    }

    fn senior() -> ExperienceDetection {
        ExperienceDetection {
            level: "senior".into(),
            confidence: 0.9,
            resolution: LevelResolution::Parsed,
        }
    }

    fn content() -> ExtractedContent {
        ExtractedContent::new("Own backend services. Base salary $150k.", None)
    }

    #[tokio::test]
    async fn test_full_extraction_is_complete() {
        let registry = sample_registry();
        let completion = MockCompletion::new().with_response(
            "Extract the following fields",
            r#"{
                "responsibilities": {"value": "own backend services", "confidence": 0.9},
                "compensation": {"value": "$150k base", "confidence": 0.85}
            }"#,
        );

        let mapping = map_dimensions(
            &completion,
            &registry,
            &classification(),
            &senior(),
            &content(),
            None,
            TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(mapping.total, 2);
        assert_eq!(mapping.required_count, 2);
        assert_eq!(mapping.extracted_required_count, 2);
        assert_eq!(mapping.completeness_score, 1.0);
    }

    #[tokio::test]
    async fn test_missing_field_scores_zero_confidence() {
        let registry = sample_registry();
        let completion = MockCompletion::new().with_response(
            "Extract the following fields",
            r#"{
                "responsibilities": {"value": "own backend services", "confidence": 0.9},
                "compensation": {"value": null, "confidence": 0.0}
            }"#,
        );

        let mapping = map_dimensions(
            &completion,
            &registry,
            &classification(),
            &senior(),
            &content(),
            None,
            TIMEOUT,
        )
        .await
        .unwrap();

        let compensation = &mapping.dimensions["compensation"];
        assert!(compensation.value.is_none());
        assert_eq!(compensation.confidence, 0.0);
        assert_eq!(mapping.extracted_required_count, 1);
        assert_eq!(mapping.completeness_score, 0.5);
    }

    #[tokio::test]
    async fn test_partial_extraction_is_not_an_error() {
        let registry = sample_registry();
        // Response omits compensation entirely
        let completion = MockCompletion::new().with_response(
            "Extract the following fields",
            r#"{"responsibilities": {"value": "own backend services", "confidence": 0.9}}"#,
        );

        let mapping = map_dimensions(
            &completion,
            &registry,
            &classification(),
            &senior(),
            &content(),
            None,
            TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(mapping.total, 2);
        assert!(mapping.dimensions["compensation"].value.is_none());
    }

    #[tokio::test]
    async fn test_malformed_response_fails_stage() {
        let registry = sample_registry();
        let completion = MockCompletion::new()
            .with_response("Extract the following fields", "not json at all");

        let err = map_dimensions(
            &completion,
            &registry,
            &classification(),
            &senior(),
            &content(),
            None,
            TIMEOUT,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractionError::MalformedExtraction(_)));
    }

    #[tokio::test]
    async fn test_completion_failure_fails_stage() {
        let registry = sample_registry();
        let completion = MockCompletion::new().with_failure("Extract the following fields");

        let err = map_dimensions(
            &completion,
            &registry,
            &classification(),
            &senior(),
            &content(),
            None,
            TIMEOUT,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractionError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_confidence_override_replaces_thresholds() {
        let registry = sample_registry();
        let completion = MockCompletion::new().with_response(
            "Extract the following fields",
            r#"{
                "responsibilities": {"value": "own backend services", "confidence": 0.6},
                "compensation": {"value": "$150k base", "confidence": 0.6}
            }"#,
        );

        let mapping = map_dimensions(
            &completion,
            &registry,
            &classification(),
            &senior(),
            &content(),
            Some(0.5),
            TIMEOUT,
        )
        .await
        .unwrap();

        // 0.6 clears the overridden 0.5 floor even though configured thresholds are higher
        assert_eq!(mapping.extracted_required_count, 2);
        assert_eq!(mapping.completeness_score, 1.0);
    }
}
