//! The extraction pipeline - the core of the library.
//!
//! Stages in fixed order, each consuming earlier slots of the accumulator
//! and producing its own:
//! - Content fetch (bounded retry over the content collaborator)
//! - Domain classification against the closed taxonomy
//! - Experience level detection with degraded-mode fallback
//! - Dimension mapping in a single completion round trip
//! - Quality validation (pure)
//! - Merge-upsert persistence

pub mod classify;
pub mod dimensions;
pub mod experience;
pub mod parse;
pub mod persist;
pub mod prompts;
pub mod quality;
pub mod runner;

pub use classify::{classify_domain, CLASSIFICATION_CONFIDENCE};
pub use dimensions::map_dimensions;
pub use experience::{detect_experience, DETECTION_CONFIDENCE};
pub use parse::{json_payload, parse_json};
pub use persist::{build_record, persist_extraction};
pub use prompts::{
    format_classify_prompt, format_dimensions_prompt, format_experience_prompt,
    format_taxonomy_outline, CLASSIFY_PROMPT, DIMENSIONS_PROMPT, EXPERIENCE_PROMPT,
};
pub use quality::validate_quality;
pub use runner::{ExtractionPipeline, PipelineOptions, PipelineOutcome};
