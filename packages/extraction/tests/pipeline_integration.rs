//! Integration tests for the full extraction pipeline.
//!
//! These exercise the whole run: content fetch, classification, experience
//! detection, dimension mapping, quality gating, and merge-upsert
//! persistence, with mock collaborators standing in for the browser and
//! completion services.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use extraction::testing::{sample_registry, MockCompletion, MockContentSource};
use extraction::{
    ExtractionPipeline, JobCatalog, JobRecord, JobStatus, MemoryStore, PipelineOptions,
    RecordStore, Stage,
};

const JOB_URL: &str = "https://example.com/jobs/42";

const POSTING: &str = "Senior Backend Engineer at Acme. 5 years experience required. \
     Own our backend services end to end. Base salary $150k.";

fn classify_response() -> &'static str {
    r#"{"domain": "engineering", "sub_domain": "backend", "role": "senior_engineer"}"#
}

fn experience_response() -> &'static str {
    r#"{"level": "senior"}"#
}

fn dimensions_response() -> &'static str {
    r#"{
        "responsibilities": {"value": "own backend services end to end", "confidence": 0.9},
        "compensation": {"value": "$150k base salary", "confidence": 0.85}
    }"#
}

/// Mock completion serving all three pipeline prompts.
fn happy_completion() -> MockCompletion {
    MockCompletion::new()
        .with_response("Classify this job posting", classify_response())
        .with_response("Determine the experience level", experience_response())
        .with_response("Extract the following fields", dimensions_response())
}

fn job() -> JobRecord {
    JobRecord::discovered("job-42", JOB_URL)
}

type TestPipeline =
    ExtractionPipeline<Arc<MockContentSource>, Arc<MockCompletion>, Arc<MemoryStore>>;

/// Build a pipeline with shared handles to its mock collaborators.
fn pipeline_with(
    content: MockContentSource,
    completion: MockCompletion,
) -> (TestPipeline, Arc<MockContentSource>, Arc<MemoryStore>) {
    let content = Arc::new(content);
    let store = Arc::new(MemoryStore::new());
    let pipeline = ExtractionPipeline::new(
        sample_registry(),
        Arc::clone(&content),
        Arc::new(completion),
        Arc::clone(&store),
    )
    .with_options(PipelineOptions::new().with_batch_delay(Duration::from_millis(1)));
    (pipeline, content, store)
}

#[tokio::test]
async fn test_happy_path_extracts_and_persists() {
    let content = MockContentSource::new().with_page(JOB_URL, POSTING);
    let (pipeline, session, store) = pipeline_with(content, happy_completion());

    let outcome = pipeline.run(job()).await;

    assert!(outcome.success, "errors: {:?}", outcome.errors);
    assert!(outcome.errors.is_empty());

    let state = &outcome.state;
    let classification = state.classification.as_ref().unwrap();
    assert_eq!(classification.domain, "engineering");
    assert_eq!(classification.sub_domain, "backend");
    assert_eq!(classification.role, "senior_engineer");

    assert_eq!(state.experience.as_ref().unwrap().level, "senior");

    let mapping = state.dimensions.as_ref().unwrap();
    assert_eq!(mapping.completeness_score, 1.0);

    let quality = state.quality.as_ref().unwrap();
    assert!(quality.passed);

    // Stored record and job lifecycle
    let record = outcome.record.unwrap();
    assert_eq!(record.status, JobStatus::Extracted);
    assert_eq!(record.domain.as_deref(), Some("engineering"));
    assert_eq!(record.experience_level.as_deref(), Some("senior"));
    assert_eq!(record.extracted_dimensions.len(), 2);

    let job = store.get_job("job-42").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Extracted);

    // Session bracketed the run
    assert_eq!(session.open_count(), 1);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_repeated_runs_converge() {
    let content = MockContentSource::new().with_page(JOB_URL, POSTING);
    let (pipeline, _session, store) = pipeline_with(content, happy_completion());

    let first = pipeline.run(job()).await;
    let first_record = first.record.unwrap();

    let second = pipeline.run(job()).await;
    let second_record = second.record.unwrap();

    // Byte-identical content yields identical extraction results
    assert_eq!(
        first_record.extracted_dimensions,
        second_record.extracted_dimensions
    );
    assert_eq!(first_record.domain, second_record.domain);
    assert_eq!(first_record.role, second_record.role);
    assert_eq!(first_record.experience_level, second_record.experience_level);
    assert_eq!(
        serde_json::to_value(&first_record.quality_metrics).unwrap(),
        serde_json::to_value(&second_record.quality_metrics).unwrap()
    );
    assert!(second_record.updated_at >= first_record.updated_at);

    // Still exactly one stored record
    assert_eq!(store.record_count(), 1);
}

#[tokio::test]
async fn test_merge_preserves_fields_from_prior_runs() {
    let content = MockContentSource::new().with_page(JOB_URL, POSTING);
    let (pipeline, _session, store) = pipeline_with(content, happy_completion());

    // Seed a record with a flag a prior run left behind
    let first = pipeline.run(job()).await;
    let mut seeded = first.record.unwrap();
    seeded
        .extraction_metadata
        .insert("customFlag".to_string(), json!("keep-me"));
    seeded.entities = vec!["Acme Corp".to_string()];
    store.put_record(&seeded).await.unwrap();

    let second = pipeline.run(job()).await;
    let merged = second.record.unwrap();

    assert_eq!(merged.extraction_metadata["customFlag"], json!("keep-me"));
    assert_eq!(merged.entities, vec!["Acme Corp".to_string()]);
    // Recomputed keys still refresh
    assert_eq!(merged.extraction_metadata["validation_passed"], json!(true));
}

#[tokio::test]
async fn test_malformed_dimension_response_fails_run_without_advancing_job() {
    let completion = MockCompletion::new()
        .with_response("Classify this job posting", classify_response())
        .with_response("Determine the experience level", experience_response())
        .with_response("Extract the following fields", "{ not json");
    let content = MockContentSource::new().with_page(JOB_URL, POSTING);
    let (pipeline, _session, store) = pipeline_with(content, completion);

    let seed = job();
    store.put_job(&seed).await.unwrap();

    let outcome = pipeline.run(seed).await;

    assert!(!outcome.success);
    assert!(outcome.record.is_none());
    assert!(outcome.state.dimensions.is_none());
    assert!(outcome.state.quality.is_none());

    // Dimension stage failed, then quality and persistence recorded their
    // own dependency errors
    let stages: Vec<Stage> = outcome.errors.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::DimensionMapping,
            Stage::QualityValidation,
            Stage::Persistence
        ]
    );
    assert!(outcome.errors[0].message.contains("malformed"));

    // Job was not advanced
    let job = store.get_job("job-42").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Discovered);
}

#[tokio::test]
async fn test_invalid_classification_cascades_as_missing_dependencies() {
    let completion = MockCompletion::new()
        .with_response(
            "Classify this job posting",
            r#"{"domain": "astrology", "sub_domain": "charts", "role": "stargazer"}"#,
        )
        .with_response("Determine the experience level", experience_response())
        .with_response("Extract the following fields", dimensions_response());
    let content = MockContentSource::new().with_page(JOB_URL, POSTING);
    let (pipeline, _session, _store) = pipeline_with(content, completion);

    let outcome = pipeline.run(job()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.errors[0].stage, Stage::Classification);
    assert!(outcome.errors[0].message.contains("invalid classification"));

    // Downstream stages failed fast instead of guessing defaults
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.stage == Stage::ExperienceDetection));
    assert!(outcome.state.classification.is_none());
    assert!(outcome.state.experience.is_none());
}

#[tokio::test]
async fn test_stop_on_error_aborts_after_recording() {
    let completion = MockCompletion::new()
        .with_response(
            "Classify this job posting",
            r#"{"domain": "astrology", "sub_domain": "charts", "role": "stargazer"}"#,
        )
        .with_response("Determine the experience level", experience_response())
        .with_response("Extract the following fields", dimensions_response());
    let content = MockContentSource::new().with_page(JOB_URL, POSTING);
    let (pipeline, session, _store) = pipeline_with(content, completion);

    let options = PipelineOptions::new().with_stop_on_error(true);
    let outcome = pipeline.run_with(job(), &options).await;

    assert!(!outcome.success);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].stage, Stage::Classification);

    // Session released even on the abort path
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_navigation_failure_is_bounded_and_recorded() {
    let content = MockContentSource::new().with_failing_url(JOB_URL);
    let (pipeline, _session, _store) = pipeline_with(content, happy_completion());

    let options = PipelineOptions::new()
        .with_max_retries(1)
        .with_stop_on_error(true);
    let outcome = pipeline.run_with(job(), &options).await;

    assert!(!outcome.success);
    assert_eq!(outcome.errors[0].stage, Stage::Content);
    assert!(outcome.errors[0].message.contains("after 2 attempts"));
}

#[tokio::test]
async fn test_batch_runs_sequentially_with_one_session() {
    let content = MockContentSource::new()
        .with_page("https://example.com/jobs/1", POSTING)
        .with_page("https://example.com/jobs/2", POSTING);
    let (pipeline, session, store) = pipeline_with(content, happy_completion());

    let jobs = vec![
        JobRecord::discovered("job-1", "https://example.com/jobs/1"),
        JobRecord::discovered("job-2", "https://example.com/jobs/2"),
    ];

    let options = PipelineOptions::new().with_batch_delay(Duration::from_millis(1));
    let outcomes = pipeline.run_batch(jobs, &options).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(store.record_count(), 2);

    // One session spans the whole batch
    assert_eq!(session.open_count(), 1);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_degraded_experience_response_still_passes() {
    let completion = MockCompletion::new()
        .with_response("Classify this job posting", classify_response())
        .with_response(
            "Determine the experience level",
            "somewhere between levels, hard to say",
        )
        .with_response("Extract the following fields", dimensions_response());
    let content = MockContentSource::new().with_page(JOB_URL, POSTING);
    let (pipeline, _session, _store) = pipeline_with(content, completion);

    let outcome = pipeline.run(job()).await;

    // Falls back to the first declared level instead of failing the run
    assert!(outcome.success, "errors: {:?}", outcome.errors);
    assert_eq!(outcome.state.experience.as_ref().unwrap().level, "mid");
}

#[tokio::test]
async fn test_failed_session_open_records_content_error() {
    let content = MockContentSource::new().with_failing_open();
    let (pipeline, _session, _store) = pipeline_with(content, happy_completion());

    let outcome = pipeline.run(job()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.errors[0].stage, Stage::Content);
}
