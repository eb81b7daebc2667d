//! Domain classification stage.
//!
//! The completion service sees the entire closed taxonomy in one prompt and
//! returns a (domain, sub_domain, role) triple. Anything outside the
//! taxonomy fails the stage; nothing is coerced.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::pipeline::parse::parse_json;
use crate::pipeline::prompts::format_classify_prompt;
use crate::taxonomy::TaxonomyRegistry;
use crate::traits::completion::{Completion, ResponseFormat};
use crate::types::state::{DomainClassification, ExtractedContent};

/// Fixed confidence for validated classifications. The lookup against the
/// closed taxonomy is deterministic; the completion call carries no
/// confidence signal of its own.
pub const CLASSIFICATION_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    domain: String,
    sub_domain: String,
    role: String,
}

/// Classify posting text into a taxonomy triple.
pub async fn classify_domain<A: Completion>(
    completion: &A,
    registry: &TaxonomyRegistry,
    content: &ExtractedContent,
    timeout: Duration,
) -> Result<DomainClassification> {
    let prompt = format_classify_prompt(registry, &content.raw_text);

    let response = tokio::time::timeout(timeout, completion.complete(&prompt, ResponseFormat::Json))
        .await
        .map_err(|_| ExtractionError::Completion("classification call timed out".into()))??;

    let parsed: ClassificationResponse =
        parse_json(&response).map_err(|e| ExtractionError::InvalidClassification {
            reason: format!("unparseable classification response: {e}"),
        })?;

    validate_triple(registry, &parsed)?;

    debug!(
        domain = %parsed.domain,
        sub_domain = %parsed.sub_domain,
        role = %parsed.role,
        "Classification validated against taxonomy"
    );

    Ok(DomainClassification {
        domain: parsed.domain,
        sub_domain: parsed.sub_domain,
        role: parsed.role,
        confidence: CLASSIFICATION_CONFIDENCE,
    })
}

/// Reject any triple that is not a path in the loaded taxonomy.
fn validate_triple(registry: &TaxonomyRegistry, parsed: &ClassificationResponse) -> Result<()> {
    let taxonomy = registry.domain(&parsed.domain).map_err(|_| {
        ExtractionError::InvalidClassification {
            reason: format!("unknown domain: {}", parsed.domain),
        }
    })?;

    let sub = taxonomy.sub_domains.get(&parsed.sub_domain).ok_or_else(|| {
        ExtractionError::InvalidClassification {
            reason: format!(
                "sub-domain {} not under domain {}",
                parsed.sub_domain, parsed.domain
            ),
        }
    })?;

    if !sub.roles.contains_key(&parsed.role) {
        return Err(ExtractionError::InvalidClassification {
            reason: format!(
                "role {} not under {}/{}",
                parsed.role, parsed.domain, parsed.sub_domain
            ),
        });
    }

    Ok(())
}
