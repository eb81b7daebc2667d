//! Experience level detection stage.
//!
//! Selects one level from the resolved role's closed set. The stage never
//! hard-fails on a malformed completion response: it degrades through a
//! strict parse, a containment scan over the response text, and finally the
//! role's first declared level. A formatting glitch in the response must
//! not lose the whole record.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::pipeline::parse::parse_json;
use crate::pipeline::prompts::format_experience_prompt;
use crate::taxonomy::TaxonomyRegistry;
use crate::traits::completion::{Completion, ResponseFormat};
use crate::types::state::{
    DomainClassification, ExperienceDetection, ExtractedContent, LevelResolution,
};

/// Fixed confidence for detected levels. Degraded resolutions keep the same
/// confidence; the resolution tag records how the level was obtained.
pub const DETECTION_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Deserialize)]
struct LevelResponse {
    level: String,
}

/// Detect the experience level for an already-classified posting.
pub async fn detect_experience<A: Completion>(
    completion: &A,
    registry: &TaxonomyRegistry,
    classification: &DomainClassification,
    content: &ExtractedContent,
    timeout: Duration,
) -> Result<ExperienceDetection> {
    let role = registry
        .resolve_role(
            &classification.domain,
            &classification.sub_domain,
            &classification.role,
        )
        .ok_or_else(|| ExtractionError::InvalidClassification {
            reason: format!("classified role {} is not in the taxonomy", classification.role),
        })?;

    let levels = role.level_names();
    let prompt = format_experience_prompt(&classification.role, &levels, &content.raw_text);

    let response =
        match tokio::time::timeout(timeout, completion.complete(&prompt, ResponseFormat::Json))
            .await
        {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                warn!(error = %e, "Experience completion failed, degrading to default level");
                None
            }
            Err(_) => {
                warn!("Experience completion timed out, degrading to default level");
                None
            }
        };

    let (level, resolution) = match response.as_deref() {
        Some(response) => resolve_level(response, &levels),
        None => (None, LevelResolution::Defaulted),
    };

    let level = match level {
        Some(level) => level,
        // Last resort: the role's first declared level
        None => role
            .default_level()
            .ok_or_else(|| ExtractionError::InvalidClassification {
                reason: format!("role {} declares no experience levels", classification.role),
            })?
            .to_string(),
    };

    debug!(level = %level, resolution = ?resolution, "Experience level resolved");

    Ok(ExperienceDetection {
        level,
        confidence: DETECTION_CONFIDENCE,
        resolution,
    })
}

/// Two-tier resolution over the completion response.
///
/// Strict: parse `{"level": ...}` (or a bare label) and require an exact,
/// case-insensitive member of the closed set. Recovery: scan the response
/// text for any declared label, in declaration order.
fn resolve_level(response: &str, levels: &[&str]) -> (Option<String>, LevelResolution) {
    let candidate = parse_json::<LevelResponse>(response)
        .map(|r| r.level)
        .unwrap_or_else(|_| response.trim().trim_matches('"').to_string());

    if let Some(exact) = levels
        .iter()
        .find(|l| l.eq_ignore_ascii_case(candidate.trim()))
    {
        return (Some(exact.to_string()), LevelResolution::Parsed);
    }

    let haystack = response.to_lowercase();
    if let Some(contained) = levels.iter().find(|l| haystack.contains(&l.to_lowercase())) {
        return (Some(contained.to_string()), LevelResolution::Recovered);
    }

    (None, LevelResolution::Defaulted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_registry, MockCompletion};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn classification() -> DomainClassification {
        DomainClassification {
            domain: "engineering".into(),
            sub_domain: "backend".into(),
            role: "senior_engineer".into(),
            confidence: 0.9,
        }
    }

    fn content() -> ExtractedContent {
        ExtractedContent::new("5 years experience, base salary $150k", None)
    }

    #[tokio::test]
    async fn test_strict_parse_wins() {
        let registry = sample_registry();
        let completion =
            MockCompletion::new().with_response("experience level", r#"{"level": "senior"}"#);

        let detection = detect_experience(&completion, &registry, &classification(), &content(), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(detection.level, "senior");
        assert_eq!(detection.resolution, LevelResolution::Parsed);
    }

    #[tokio::test]
    async fn test_containment_recovers_prose_response() {
        let registry = sample_registry();
        let completion = MockCompletion::new().with_response(
            "experience level",
            "This posting is clearly for a senior person.",
        );

        let detection = detect_experience(&completion, &registry, &classification(), &content(), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(detection.level, "senior");
        assert_eq!(detection.resolution, LevelResolution::Recovered);
    }

    #[tokio::test]
    async fn test_unusable_response_defaults_to_first_declared_level() {
        let registry = sample_registry();
        let completion =
            MockCompletion::new().with_response("experience level", "no idea, sorry");

        let detection = detect_experience(&completion, &registry, &classification(), &content(), TIMEOUT)
            .await
            .unwrap();

        // "mid" is declared first for senior_engineer
        assert_eq!(detection.level, "mid");
        assert_eq!(detection.resolution, LevelResolution::Defaulted);
    }

    #[tokio::test]
    async fn test_completion_failure_degrades_instead_of_raising() {
        let registry = sample_registry();
        let completion = MockCompletion::new().with_failure("experience level");

        let detection = detect_experience(&completion, &registry, &classification(), &content(), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(detection.level, "mid");
        assert_eq!(detection.resolution, LevelResolution::Defaulted);
    }

    #[tokio::test]
    async fn test_bare_label_response_counts_as_parsed() {
        let registry = sample_registry();
        let completion = MockCompletion::new().with_response("experience level", "senior");

        let detection = detect_experience(&completion, &registry, &classification(), &content(), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(detection.level, "senior");
        assert_eq!(detection.resolution, LevelResolution::Parsed);
    }
}
