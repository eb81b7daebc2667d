//! Completion prompts for the extraction pipeline.
//!
//! Every prompt presents a closed vocabulary taken from the taxonomy, so
//! responses can be validated strictly instead of trusted.

use indexmap::IndexMap;

use crate::taxonomy::types::DimensionConfig;
use crate::taxonomy::TaxonomyRegistry;

/// Upper bound on posting text included in a prompt.
pub const MAX_CONTENT_CHARS: usize = 12_000;

/// Prompt for classifying a posting into the taxonomy.
pub const CLASSIFY_PROMPT: &str = r#"Classify this job posting against the taxonomy below.

Pick exactly one domain, one sub-domain under that domain, and one role under
that sub-domain. Use only entries that appear in the taxonomy.

Taxonomy:
{taxonomy}

Job posting:
{content}

Output JSON:
{"domain": "...", "sub_domain": "...", "role": "..."}"#;

/// Prompt for selecting an experience level from a closed set.
pub const EXPERIENCE_PROMPT: &str = r#"Determine the experience level of this {role} job posting.

Allowed levels: {levels}

Pick exactly one of the allowed levels, based on years of experience,
seniority wording, and scope of responsibility in the posting.

Job posting:
{content}

Output JSON:
{"level": "..."}"#;

/// Prompt for extracting every dimension in one round trip.
pub const DIMENSIONS_PROMPT: &str = r#"Extract the following fields from this job posting.

Fields:
{fields}

For every field output an object with "value" and "confidence" (0.0 to 1.0).
When the posting does not contain a field, use a null value with confidence 0.0.

Job posting:
{content}

Output one JSON object keyed by field name:
{"field_name": {"value": ..., "confidence": 0.0}}"#;

/// Truncate posting text to the prompt budget.
fn clip(content: &str) -> &str {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Render the full domain -> sub-domain -> role outline.
///
/// The completion service sees the entire closed vocabulary in one prompt,
/// which keeps classification a single round trip.
pub fn format_taxonomy_outline(registry: &TaxonomyRegistry) -> String {
    let mut outline = String::new();
    for (domain, taxonomy) in registry.domains() {
        outline.push_str(&format!("- domain: {domain}\n"));
        for (sub_domain, sub) in &taxonomy.sub_domains {
            outline.push_str(&format!("  - sub_domain: {sub_domain}\n"));
            let roles: Vec<&str> = sub.roles.keys().map(|r| r.as_str()).collect();
            outline.push_str(&format!("    roles: {}\n", roles.join(", ")));
        }
    }
    outline
}

/// Build the classification prompt.
pub fn format_classify_prompt(registry: &TaxonomyRegistry, content: &str) -> String {
    CLASSIFY_PROMPT
        .replace("{taxonomy}", &format_taxonomy_outline(registry))
        .replace("{content}", clip(content))
}

/// Build the experience level prompt for a role's declared levels.
pub fn format_experience_prompt(role: &str, levels: &[&str], content: &str) -> String {
    EXPERIENCE_PROMPT
        .replace("{role}", role)
        .replace("{levels}", &levels.join(", "))
        .replace("{content}", clip(content))
}

/// Build the combined dimension extraction prompt.
pub fn format_dimensions_prompt(
    dimensions: &IndexMap<String, DimensionConfig>,
    content: &str,
) -> String {
    let fields = dimensions
        .iter()
        .map(|(name, dim)| format!("- {name}: {}", dim.extraction_prompt))
        .collect::<Vec<_>>()
        .join("\n");

    DIMENSIONS_PROMPT
        .replace("{fields}", &fields)
        .replace("{content}", clip(content))
}
