//! Completion response parsing helpers.
//!
//! Completion services return JSON wrapped in varying amounts of prose and
//! code fencing. The strict tier locates the outermost JSON value and hands
//! it to serde; stage-specific recovery (e.g. the experience detector's
//! containment scan) builds on top of this.

use serde::de::DeserializeOwned;

/// Locate the outermost JSON object or array in a raw response.
///
/// Strips markdown code fences and any leading/trailing prose. Returns the
/// raw trimmed text when no braces are found, letting serde report the
/// failure with the original payload.
pub fn json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();

    // Strip ```json ... ``` fencing
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    let object = unfenced
        .find('{')
        .and_then(|start| unfenced.rfind('}').map(|end| (start, end)));
    let array = unfenced
        .find('[')
        .and_then(|start| unfenced.rfind(']').map(|end| (start, end)));

    // Prefer whichever opens first
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if o.0 < a.0 { o } else { a }),
        (Some(o), None) => Some(o),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    };

    match span {
        Some((start, end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Strict-tier parse: locate the JSON payload and deserialize it.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(json_payload(raw))
}
