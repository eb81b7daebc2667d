//! Taxonomy-Driven Job Posting Extraction
//!
//! A configuration-driven pipeline that takes a bare (url, id) job record
//! and produces a validated, role-aware, structured representation suitable
//! for storage and downstream matching.
//!
//! # Design
//!
//! - Closed vocabulary: every classification is validated against the
//!   domain -> sub-domain -> role -> experience-level taxonomy, never trusted
//! - Typed accumulator: one `Option` slot per stage, so dependency order is
//!   checked at compile time instead of probed at runtime
//! - Partial-failure semantics: stage errors are recorded on the state and
//!   the run keeps going unless asked to stop
//! - Merge-upsert persistence: repeated runs for the same job id converge
//!   instead of duplicating or clobbering data
//!
//! # Usage
//!
//! ```rust,ignore
//! use extraction::{ExtractionPipeline, MemoryStore, TaxonomyRegistry};
//! use extraction::testing::{sample_registry, MockCompletion, MockContentSource};
//!
//! let registry = TaxonomyRegistry::load_dir("config/taxonomy")?;
//! let pipeline = ExtractionPipeline::new(registry, content_source, completion, MemoryStore::new());
//!
//! let outcome = pipeline.run(job).await;
//! if outcome.success {
//!     println!("extracted {} dimensions", outcome.record.unwrap().extracted_dimensions.len());
//! }
//! ```
//!
//! # Modules
//!
//! - [`taxonomy`] - The closed vocabulary and the registry serving it
//! - [`traits`] - Collaborator abstractions (Completion, ContentSource, Store)
//! - [`types`] - Jobs, pipeline state, persisted records
//! - [`pipeline`] - The staged pipeline and its orchestrator
//! - [`stores`] - Storage implementations and the upsert merge policy
//! - [`ai`] / [`content`] - Reference collaborator implementations
//! - [`testing`] - Mock collaborators for tests

pub mod ai;
pub mod content;
pub mod error;
pub mod pipeline;
pub mod stores;
pub mod taxonomy;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ConfigError, ContentError, ExtractionError, Result};
pub use taxonomy::{
    DimensionConfig, DomainTaxonomy, LevelConfig, QualityThresholds, RoleConfig, SubDomainConfig,
    TaxonomyRegistry,
};
pub use traits::{
    completion::{Completion, ResponseFormat},
    content::{ContentSource, PageContent},
    store::{JobCatalog, RecordStore, Store},
};
pub use types::{
    DimensionMapping, DomainClassification, ExperienceDetection, ExtractedContent, JobRecord,
    JobStatus, LevelResolution, MappedDimension, PipelineState, QualityMetrics, Stage, StageError,
    StoredDimension, StoredRecord,
};

// Re-export the pipeline entry points
pub use pipeline::{ExtractionPipeline, PipelineOptions, PipelineOutcome};

// Re-export pipeline stage functions
pub use pipeline::{
    build_record, classify_domain, detect_experience, map_dimensions, persist_extraction,
    validate_quality,
};

// Re-export stores
pub use stores::{merge_records, MemoryStore, MergePolicy, FIELD_POLICIES};

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

// Re-export reference collaborators
pub use ai::OpenAiCompletion;
pub use content::HttpContentSource;
