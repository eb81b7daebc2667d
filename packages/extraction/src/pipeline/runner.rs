//! The pipeline orchestrator.
//!
//! Threads one `PipelineState` through the stages in fixed order: content ->
//! classification -> experience detection -> dimension mapping -> quality
//! validation -> persistence. Each stage reads only slots written by earlier
//! stages and writes its own. Failures are recorded on the state; the run
//! continues so downstream stages can record their own missing-dependency
//! entries, unless `stop_on_error` asks for an abort.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{ContentError, ExtractionError, Result};
use crate::pipeline::{classify, dimensions, experience, persist, quality};
use crate::taxonomy::types::QualityThresholds;
use crate::taxonomy::TaxonomyRegistry;
use crate::traits::completion::Completion;
use crate::traits::content::ContentSource;
use crate::traits::store::Store;
use crate::types::job::{JobRecord, JobStatus};
use crate::types::record::StoredRecord;
use crate::types::state::{ExtractedContent, PipelineState, Stage, StageError};

/// Per-run knobs, settable at construction and overridable per trigger.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Extra navigation attempts after the first failed fetch
    pub max_retries: u32,

    /// Fixed timeout applied to every external call
    pub timeout: Duration,

    /// Run-level confidence floor replacing per-dimension thresholds
    pub confidence_threshold: Option<f32>,

    /// Override of the registry's completeness gate
    pub completeness_threshold: Option<f32>,

    /// Override of the registry's quality gate
    pub quality_threshold: Option<f32>,

    /// Abort after the first recorded stage error
    pub stop_on_error: bool,

    /// Fixed delay between jobs in a batch, for collaborator rate limits
    pub batch_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout: Duration::from_secs(30),
            confidence_threshold: None,
            completeness_threshold: None,
            quality_threshold: None,
            stop_on_error: false,
            batch_delay: Duration::from_secs(2),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }

    pub fn with_completeness_threshold(mut self, threshold: f32) -> Self {
        self.completeness_threshold = Some(threshold);
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f32) -> Self {
        self.quality_threshold = Some(threshold);
        self
    }

    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }
}

/// Result of one pipeline run.
///
/// A non-empty `errors` list does not mean no data was produced: the partial
/// state is returned either way, and `record` is set when persistence ran.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub success: bool,
    pub errors: Vec<StageError>,
    pub record: Option<StoredRecord>,
    pub state: PipelineState,
}

/// The extraction pipeline, wired to its collaborators once and reused
/// across runs.
pub struct ExtractionPipeline<C: ContentSource, A: Completion, S: Store> {
    registry: TaxonomyRegistry,
    content: C,
    completion: A,
    store: S,
    options: PipelineOptions,
}

impl<C: ContentSource, A: Completion, S: Store> ExtractionPipeline<C, A, S> {
    pub fn new(registry: TaxonomyRegistry, content: C, completion: A, store: S) -> Self {
        Self {
            registry,
            content,
            completion,
            store,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &TaxonomyRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the full pipeline for one job with the default options.
    ///
    /// The content session is acquired before the first stage and released
    /// on every exit path.
    pub async fn run(&self, job: JobRecord) -> PipelineOutcome {
        let options = self.options.clone();
        self.run_with(job, &options).await
    }

    /// Run the full pipeline for one job with per-run options.
    pub async fn run_with(&self, job: JobRecord, options: &PipelineOptions) -> PipelineOutcome {
        if let Err(e) = self.content.open().await {
            let mut state = PipelineState::new(job);
            state.record_error(Stage::Content, e.to_string());
            return finish(state, None);
        }

        let outcome = self.run_stages(job, options).await;
        self.content.close().await;
        outcome
    }

    /// Run a batch of jobs strictly sequentially with a fixed inter-job
    /// delay. One content session spans the whole batch and is released
    /// even when individual runs fail.
    pub async fn run_batch(
        &self,
        jobs: Vec<JobRecord>,
        options: &PipelineOptions,
    ) -> Vec<PipelineOutcome> {
        let mut outcomes = Vec::with_capacity(jobs.len());

        if let Err(e) = self.content.open().await {
            for job in jobs {
                let mut state = PipelineState::new(job);
                state.record_error(Stage::Content, e.to_string());
                outcomes.push(finish(state, None));
            }
            return outcomes;
        }

        let total = jobs.len();
        for (index, job) in jobs.into_iter().enumerate() {
            info!(job_id = %job.id, index, total, "Batch job starting");
            outcomes.push(self.run_stages(job, options).await);

            if index + 1 < total {
                tokio::time::sleep(options.batch_delay).await;
            }
        }

        self.content.close().await;
        outcomes
    }

    /// Execute the stage sequence. Assumes the content session is open.
    async fn run_stages(&self, job: JobRecord, options: &PipelineOptions) -> PipelineOutcome {
        let mut state = PipelineState::new(job);
        let thresholds = self.effective_thresholds(options);

        // Content
        let started = Instant::now();
        match self.fetch_content(&state.job.url, options).await {
            Ok(content) => {
                state.stamp("content_ms", json!(started.elapsed().as_millis() as u64));
                state.content = Some(content);
            }
            Err(e) => {
                warn!(job_id = %state.job.id, error = %e, "Content stage failed");
                state.record_error(Stage::Content, e.to_string());
                if options.stop_on_error {
                    return finish(state, None);
                }
            }
        }

        // Classification
        let started = Instant::now();
        match self.stage_classify(&state, options).await {
            Ok(classification) => {
                state.stamp("classification_ms", json!(started.elapsed().as_millis() as u64));
                state.classification = Some(classification);
            }
            Err(e) => {
                warn!(job_id = %state.job.id, error = %e, "Classification stage failed");
                state.record_error(Stage::Classification, e.to_string());
                if options.stop_on_error {
                    return finish(state, None);
                }
            }
        }

        // Experience detection
        let started = Instant::now();
        match self.stage_experience(&state, options).await {
            Ok(detection) => {
                state.stamp(
                    "experience_detection_ms",
                    json!(started.elapsed().as_millis() as u64),
                );
                state.stamp("experience_resolution", json!(detection.resolution));
                state.experience = Some(detection);
            }
            Err(e) => {
                warn!(job_id = %state.job.id, error = %e, "Experience stage failed");
                state.record_error(Stage::ExperienceDetection, e.to_string());
                if options.stop_on_error {
                    return finish(state, None);
                }
            }
        }

        // Dimension mapping
        let started = Instant::now();
        match self.stage_dimensions(&state, options).await {
            Ok(mapping) => {
                state.stamp(
                    "dimension_mapping_ms",
                    json!(started.elapsed().as_millis() as u64),
                );
                state.dimensions = Some(mapping);
            }
            Err(e) => {
                warn!(job_id = %state.job.id, error = %e, "Dimension stage failed");
                state.record_error(Stage::DimensionMapping, e.to_string());
                if options.stop_on_error {
                    return finish(state, None);
                }
            }
        }

        // Quality validation: pure, cannot fail; a missing mapping is the
        // orchestrator's dependency error, recorded before the stage runs
        match state.dimensions.as_ref() {
            Some(mapping) => {
                state.quality = Some(quality::validate_quality(mapping, &thresholds));
            }
            None => {
                let e = ExtractionError::MissingDependency {
                    stage: Stage::QualityValidation,
                    needs: "dimension_mapping",
                };
                state.record_error(Stage::QualityValidation, e.to_string());
                if options.stop_on_error {
                    return finish(state, None);
                }
            }
        }

        // Persistence
        match persist::persist_extraction(&self.store, &state).await {
            Ok(record) => {
                state.job.status = JobStatus::Extracted;
                state.job.updated_at = record.updated_at;
                if let Err(e) = self.store.put_job(&state.job).await {
                    state.record_error(Stage::Persistence, e.to_string());
                } else {
                    debug!(job_id = %state.job.id, "Job advanced to extracted");
                }
                return finish(state, Some(record));
            }
            Err(e) => {
                warn!(job_id = %state.job.id, error = %e, "Persistence stage failed");
                state.record_error(Stage::Persistence, e.to_string());
            }
        }

        finish(state, None)
    }

    /// Registry thresholds with per-run overrides applied.
    fn effective_thresholds(&self, options: &PipelineOptions) -> QualityThresholds {
        let mut thresholds = self.registry.thresholds();
        if let Some(quality) = options.quality_threshold {
            thresholds.quality = quality;
        }
        if let Some(completeness) = options.completeness_threshold {
            thresholds.completeness = completeness;
        }
        if let Some(confidence) = options.confidence_threshold {
            thresholds.confidence = confidence;
        }
        thresholds
    }

    /// Fetch page content with a fixed per-attempt timeout and a bounded
    /// retry count.
    async fn fetch_content(
        &self,
        url: &str,
        options: &PipelineOptions,
    ) -> Result<ExtractedContent> {
        let attempts = options.max_retries + 1;

        for attempt in 1..=attempts {
            match tokio::time::timeout(options.timeout, self.content.extract_text(url)).await {
                Ok(Ok(page)) => {
                    return Ok(ExtractedContent::new(page.raw_text, page.page_title));
                }
                Ok(Err(e)) => {
                    warn!(url = %url, attempt, error = %e, "Navigation attempt failed");
                }
                Err(_) => {
                    warn!(url = %url, attempt, "Navigation attempt timed out");
                }
            }
        }

        Err(ContentError::Navigation {
            url: url.to_string(),
            attempts,
        }
        .into())
    }

    async fn stage_classify(
        &self,
        state: &PipelineState,
        options: &PipelineOptions,
    ) -> Result<crate::types::state::DomainClassification> {
        let content = state.require_content(Stage::Classification)?;
        classify::classify_domain(&self.completion, &self.registry, content, options.timeout).await
    }

    async fn stage_experience(
        &self,
        state: &PipelineState,
        options: &PipelineOptions,
    ) -> Result<crate::types::state::ExperienceDetection> {
        let content = state.require_content(Stage::ExperienceDetection)?;
        let classification = state.require_classification(Stage::ExperienceDetection)?;
        experience::detect_experience(
            &self.completion,
            &self.registry,
            classification,
            content,
            options.timeout,
        )
        .await
    }

    async fn stage_dimensions(
        &self,
        state: &PipelineState,
        options: &PipelineOptions,
    ) -> Result<crate::types::state::DimensionMapping> {
        let content = state.require_content(Stage::DimensionMapping)?;
        let classification = state.require_classification(Stage::DimensionMapping)?;
        let detection = state.require_experience(Stage::DimensionMapping)?;
        dimensions::map_dimensions(
            &self.completion,
            &self.registry,
            classification,
            detection,
            content,
            options.confidence_threshold,
            options.timeout,
        )
        .await
    }
}

fn finish(state: PipelineState, record: Option<StoredRecord>) -> PipelineOutcome {
    let success = state.errors.is_empty();

    if success {
        info!(job_id = %state.job.id, "Pipeline run succeeded");
    } else {
        warn!(
            job_id = %state.job.id,
            errors = state.errors.len(),
            first = %state.errors[0].message,
            "Pipeline run finished with errors"
        );
    }

    PipelineOutcome {
        success,
        errors: state.errors.clone(),
        record,
        state,
    }
}
