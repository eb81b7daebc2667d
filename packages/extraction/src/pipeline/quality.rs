//! Quality validation stage.
//!
//! A pure function over the dimension mapping: no external calls, cannot
//! fail. Scores are clamped to [0, 1] so upstream noise never produces an
//! out-of-range quality score.

use tracing::debug;

use crate::taxonomy::types::QualityThresholds;
use crate::types::state::{DimensionMapping, QualityMetrics};

/// Weights of the combined quality score.
const COMPLETENESS_WEIGHT: f32 = 0.4;
const CONFIDENCE_WEIGHT: f32 = 0.4;
const REQUIRED_WEIGHT: f32 = 0.2;

fn clamp01(score: f32) -> f32 {
    score.clamp(0.0, 1.0)
}

/// Gate an extraction on completeness, confidence, and required coverage.
pub fn validate_quality(
    mapping: &DimensionMapping,
    thresholds: &QualityThresholds,
) -> QualityMetrics {
    let mut issues = Vec::new();

    // A dimension is valid when a value is present and its confidence meets
    // its threshold; average confidence is taken over valid dimensions only.
    let mut valid_count = 0usize;
    let mut confidence_sum = 0.0f32;

    for (name, dim) in &mapping.dimensions {
        match &dim.value {
            Some(_) if dim.confidence >= dim.threshold => {
                valid_count += 1;
                confidence_sum += dim.confidence;
            }
            Some(_) => {
                issues.push(format!(
                    "low confidence on {name} ({:.2} < {:.2})",
                    dim.confidence, dim.threshold
                ));
            }
            None if dim.required => {
                issues.push(format!("missing required dimension {name}"));
            }
            None => {}
        }
    }

    let confidence_score = if valid_count == 0 {
        0.0
    } else {
        clamp01(confidence_sum / valid_count as f32)
    };

    let completeness_score = clamp01(mapping.completeness_score);

    let required_dimensions_score = if mapping.required_count == 0 {
        1.0
    } else {
        clamp01(mapping.extracted_required_count as f32 / mapping.required_count as f32)
    };

    let quality_score = clamp01(
        COMPLETENESS_WEIGHT * completeness_score
            + CONFIDENCE_WEIGHT * confidence_score
            + REQUIRED_WEIGHT * required_dimensions_score,
    );

    let passed = quality_score >= thresholds.quality
        && completeness_score >= thresholds.completeness
        && mapping.extracted_required_count >= mapping.required_count;

    if quality_score < thresholds.quality {
        issues.push(format!(
            "quality score {quality_score:.2} below threshold {:.2}",
            thresholds.quality
        ));
    }
    if completeness_score < thresholds.completeness {
        issues.push(format!(
            "completeness {completeness_score:.2} below threshold {:.2}",
            thresholds.completeness
        ));
    }

    debug!(quality_score, completeness_score, confidence_score, passed, "Quality validated");

    QualityMetrics {
        quality_score,
        completeness_score,
        confidence_score,
        required_dimensions_score,
        passed,
        issues,
    }
}
