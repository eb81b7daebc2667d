//! HTTP handlers for the extraction trigger boundary.
//!
//! Job-state preconditions are enforced here, before the pipeline is
//! invoked: an unknown job is a 404 and a job outside the `discovered`
//! state is a 400. Pipeline execution failures are 500s carrying the
//! recorded stage errors verbatim.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use extraction::{
    Completion, ContentSource, ExtractionPipeline, JobCatalog, JobRecord, JobStatus,
    PipelineOptions, QualityMetrics, StageError, Store, StoredDimension,
};

/// Shared application state: the pipeline, wired once at startup.
pub type AppState<C, A, S> = Arc<ExtractionPipeline<C, A, S>>;

/// Per-request option overrides, camelCase at the HTTP boundary.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    pub max_retries: Option<u32>,

    /// Per-call timeout in milliseconds
    pub timeout: Option<u64>,

    pub confidence_threshold: Option<f32>,
    pub completeness_threshold: Option<f32>,
    pub quality_threshold: Option<f32>,
    pub stop_on_error: Option<bool>,
}

impl ExtractOptions {
    /// Apply overrides on top of the pipeline's defaults.
    fn merge_into(&self, mut options: PipelineOptions) -> PipelineOptions {
        if let Some(retries) = self.max_retries {
            options.max_retries = retries;
        }
        if let Some(ms) = self.timeout {
            options.timeout = Duration::from_millis(ms);
        }
        if let Some(threshold) = self.confidence_threshold {
            options.confidence_threshold = Some(threshold);
        }
        if let Some(threshold) = self.completeness_threshold {
            options.completeness_threshold = Some(threshold);
        }
        if let Some(threshold) = self.quality_threshold {
            options.quality_threshold = Some(threshold);
        }
        if let Some(stop) = self.stop_on_error {
            options.stop_on_error = stop;
        }
        options
    }
}

/// `POST /job-extraction` request body.
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub job_id: String,

    #[serde(default)]
    pub options: ExtractOptions,
}

/// `POST /job-extraction` success body.
#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub status: JobStatus,
    pub quality_metrics: Option<QualityMetrics>,
    pub job_data: JobRecord,
    pub extracted_dimensions: IndexMap<String, StoredDimension>,
}

/// Error body for 4xx and 5xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: Vec::new(),
        }
    }

    fn with_errors(error: impl Into<String>, errors: Vec<StageError>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors,
        }
    }
}

/// `GET /health`
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `POST /jobs` request body: register a discovered job.
#[derive(Debug, Deserialize)]
pub struct RegisterJobRequest {
    pub id: String,
    pub url: String,
}

/// `POST /jobs` - catalog a job discovered outside this service.
pub async fn register_job_handler<C, A, S>(
    State(pipeline): State<AppState<C, A, S>>,
    Json(request): Json<RegisterJobRequest>,
) -> Result<(StatusCode, Json<JobRecord>), (StatusCode, Json<ErrorResponse>)>
where
    C: ContentSource + 'static,
    A: Completion + 'static,
    S: Store + 'static,
{
    let job = JobRecord::discovered(request.id, request.url);

    pipeline.store().put_job(&job).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )
    })?;

    info!(job_id = %job.id, "Job registered");
    Ok((StatusCode::CREATED, Json(job)))
}

/// `POST /job-extraction` - run the pipeline for one discovered job.
pub async fn extract_handler<C, A, S>(
    State(pipeline): State<AppState<C, A, S>>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, (StatusCode, Json<ErrorResponse>)>
where
    C: ContentSource + 'static,
    A: Completion + 'static,
    S: Store + 'static,
{
    let job = pipeline
        .store()
        .get_job(&request.job_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!(
                    "job not found: {}",
                    request.job_id
                ))),
            )
        })?;

    if job.status != JobStatus::Discovered {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "job {} is {}, expected discovered",
                job.id, job.status
            ))),
        ));
    }

    let options = request.options.merge_into(pipeline.options().clone());
    info!(job_id = %job.id, "Extraction triggered");

    let outcome = pipeline.run_with(job, &options).await;

    if !outcome.success {
        let first = outcome
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "pipeline failed".to_string());
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::with_errors(first, outcome.errors)),
        ));
    }

    let extracted_dimensions = outcome
        .record
        .as_ref()
        .map(|r| r.extracted_dimensions.clone())
        .unwrap_or_default();

    Ok(Json(ExtractResponse {
        success: true,
        status: outcome.state.job.status,
        quality_metrics: outcome.state.quality.clone(),
        job_data: outcome.state.job,
        extracted_dimensions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use extraction::testing::{sample_registry, MockCompletion, MockContentSource};
    use extraction::MemoryStore;

    const JOB_URL: &str = "https://example.com/jobs/7";

    type TestState = AppState<Arc<MockContentSource>, Arc<MockCompletion>, Arc<MemoryStore>>;

    fn state() -> (TestState, Arc<MemoryStore>) {
        let content = Arc::new(MockContentSource::new().with_page(
            JOB_URL,
            "Senior engineer. 5 years experience. Base salary $150k.",
        ));
        let completion = Arc::new(
            MockCompletion::new()
                .with_response(
                    "Classify this job posting",
                    r#"{"domain": "engineering", "sub_domain": "backend", "role": "senior_engineer"}"#,
                )
                .with_response("Determine the experience level", r#"{"level": "senior"}"#)
                .with_response(
                    "Extract the following fields",
                    r#"{
                        "responsibilities": {"value": "own services", "confidence": 0.9},
                        "compensation": {"value": "$150k", "confidence": 0.85}
                    }"#,
                ),
        );
        let store = Arc::new(MemoryStore::new());
        let pipeline = ExtractionPipeline::new(
            sample_registry(),
            content,
            completion,
            Arc::clone(&store),
        );
        (Arc::new(pipeline), store)
    }

    fn request(job_id: &str) -> ExtractRequest {
        ExtractRequest {
            job_id: job_id.to_string(),
            options: ExtractOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let (state, _store) = state();

        let (status, Json(body)) = extract_handler(State(state), Json(request("missing")))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_already_extracted_job_is_400() {
        let (state, store) = state();
        let mut job = JobRecord::discovered("j7", JOB_URL);
        job.status = JobStatus::Extracted;
        store.put_job(&job).await.unwrap();

        let (status, _body) = extract_handler(State(state), Json(request("j7")))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_successful_extraction_returns_metrics_and_dimensions() {
        let (state, store) = state();
        store
            .put_job(&JobRecord::discovered("j7", JOB_URL))
            .await
            .unwrap();

        let Json(body) = extract_handler(State(state), Json(request("j7")))
            .await
            .unwrap();

        assert!(body.success);
        assert_eq!(body.status, JobStatus::Extracted);
        assert!(body.quality_metrics.as_ref().unwrap().passed);
        assert_eq!(body.extracted_dimensions.len(), 2);
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_500_with_stage_errors() {
        let content = Arc::new(MockContentSource::new().with_page(JOB_URL, "posting"));
        let completion = Arc::new(MockCompletion::new()); // no canned responses
        let store = Arc::new(MemoryStore::new());
        let pipeline: TestState = Arc::new(ExtractionPipeline::new(
            sample_registry(),
            content,
            completion,
            Arc::clone(&store),
        ));

        store
            .put_job(&JobRecord::discovered("j7", JOB_URL))
            .await
            .unwrap();

        let (status, Json(body)) = extract_handler(State(pipeline), Json(request("j7")))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.errors.is_empty());

        // Job not advanced by the failed run
        let job = store.get_job("j7").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Discovered);
    }

    #[tokio::test]
    async fn test_register_job_catalogs_as_discovered() {
        let (state, store) = state();

        let (status, _job) = register_job_handler(
            State(state),
            Json(RegisterJobRequest {
                id: "j9".into(),
                url: JOB_URL.into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        let job = store.get_job("j9").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Discovered);
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: ExtractOptions = serde_json::from_str(
            r#"{"maxRetries": 1, "timeout": 5000, "qualityThreshold": 0.8, "stopOnError": true}"#,
        )
        .unwrap();

        assert_eq!(options.max_retries, Some(1));
        assert_eq!(options.timeout, Some(5000));
        assert_eq!(options.quality_threshold, Some(0.8));
        assert_eq!(options.stop_on_error, Some(true));
    }
}
