//! Data types for jobs, pipeline state, and persisted records.

pub mod job;
pub mod record;
pub mod state;

pub use job::{JobRecord, JobStatus};
pub use record::{StoredDimension, StoredRecord};
pub use state::{
    DimensionMapping, DomainClassification, ExperienceDetection, ExtractedContent,
    LevelResolution, MappedDimension, PipelineState, QualityMetrics, Stage, StageError,
};
