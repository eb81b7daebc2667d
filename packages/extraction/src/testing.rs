//! Testing utilities including mock collaborators.
//!
//! These are useful for exercising the pipeline without real completion or
//! network calls. Responses are canned per prompt fragment; calls are
//! tracked for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;

use crate::error::{ContentError, ContentResult, ExtractionError, Result};
use crate::taxonomy::types::{
    DimensionConfig, DomainTaxonomy, LevelConfig, RoleConfig, SubDomainConfig,
};
use crate::taxonomy::TaxonomyRegistry;
use crate::traits::completion::{Completion, ResponseFormat};
use crate::traits::content::{ContentSource, PageContent};

/// A mock completion service.
///
/// Responses are keyed by a fragment of the prompt, so one mock can serve
/// every stage of a run: the first registered fragment found in the prompt
/// wins. Prompts without a match (or matching a registered failure) return
/// an error, keeping unexpected calls visible.
#[derive(Default)]
pub struct MockCompletion {
    responses: Arc<RwLock<Vec<(String, String)>>>,
    failures: Arc<RwLock<Vec<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` to any prompt containing `fragment`.
    pub fn with_response(self, fragment: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push((fragment.into(), response.into()));
        self
    }

    /// Fail any prompt containing `fragment`.
    pub fn with_failure(self, fragment: impl Into<String>) -> Self {
        self.failures.write().unwrap().push(fragment.into());
        self
    }

    /// All prompts this mock has served, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Number of completion calls made.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl Completion for MockCompletion {
    async fn complete(&self, prompt: &str, _format: ResponseFormat) -> Result<String> {
        self.calls.write().unwrap().push(prompt.to_string());

        if let Some(fragment) = self
            .failures
            .read()
            .unwrap()
            .iter()
            .find(|f| prompt.contains(f.as_str()))
        {
            return Err(ExtractionError::Completion(format!(
                "mock failure for fragment: {fragment}"
            )));
        }

        self.responses
            .read()
            .unwrap()
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| {
                ExtractionError::Completion("no canned response for prompt".to_string())
            })
    }
}

/// A mock content source with canned pages and session tracking.
#[derive(Default)]
pub struct MockContentSource {
    pages: Arc<RwLock<HashMap<String, PageContent>>>,
    fail_urls: Arc<RwLock<Vec<String>>>,
    fail_open: bool,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl MockContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `text` for `url`.
    pub fn with_page(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(url.into(), PageContent::new(text));
        self
    }

    /// Fail navigation for `url`.
    pub fn with_failing_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.write().unwrap().push(url.into());
        self
    }

    /// Fail session acquisition.
    pub fn with_failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for MockContentSource {
    async fn open(&self) -> ContentResult<()> {
        if self.fail_open {
            return Err(ContentError::SessionClosed);
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn extract_text(&self, url: &str) -> ContentResult<PageContent> {
        if self.fail_urls.read().unwrap().iter().any(|u| u == url) {
            return Err(ContentError::Timeout {
                url: url.to_string(),
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ContentError::InvalidUrl {
                url: url.to_string(),
            })
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn dimension(required: bool, threshold: f32, prompt: &str) -> DimensionConfig {
    DimensionConfig {
        required,
        confidence_threshold: threshold,
        extraction_prompt: prompt.to_string(),
    }
}

/// A small taxonomy used across the test suite:
/// `engineering/backend/senior_engineer` with `mid` and `senior` levels,
/// where `senior` requires `responsibilities` and `compensation`.
pub fn sample_registry() -> TaxonomyRegistry {
    let mut mid_dims = IndexMap::new();
    mid_dims.insert(
        "responsibilities".to_string(),
        dimension(true, 0.7, "What will this person be responsible for?"),
    );
    mid_dims.insert(
        "compensation".to_string(),
        dimension(false, 0.6, "What compensation does the posting offer?"),
    );

    let mut senior_dims = IndexMap::new();
    senior_dims.insert(
        "responsibilities".to_string(),
        dimension(true, 0.7, "What will this person be responsible for?"),
    );
    senior_dims.insert(
        "compensation".to_string(),
        dimension(true, 0.6, "What compensation does the posting offer?"),
    );

    let mut levels = IndexMap::new();
    levels.insert(
        "mid".to_string(),
        LevelConfig {
            required_count: 1,
            dimensions: Some(mid_dims),
        },
    );
    levels.insert(
        "senior".to_string(),
        LevelConfig {
            required_count: 2,
            dimensions: Some(senior_dims),
        },
    );

    let mut roles = IndexMap::new();
    roles.insert(
        "senior_engineer".to_string(),
        RoleConfig {
            dimensions: IndexMap::new(),
            experience_levels: levels,
        },
    );

    let mut sub_domains = IndexMap::new();
    sub_domains.insert("backend".to_string(), SubDomainConfig { roles });

    TaxonomyRegistry::from_domains([(
        "engineering".to_string(),
        DomainTaxonomy { sub_domains },
    )])
    .expect("sample taxonomy is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_completion_matches_fragments() {
        let mock = MockCompletion::new()
            .with_response("classify", r#"{"domain": "engineering"}"#)
            .with_failure("broken");

        let ok = mock
            .complete("please classify this", ResponseFormat::Json)
            .await
            .unwrap();
        assert!(ok.contains("engineering"));

        let err = mock
            .complete("this one is broken", ResponseFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Completion(_)));

        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_content_source_serves_pages() {
        let mock = MockContentSource::new()
            .with_page("https://a.example", "text a")
            .with_failing_url("https://b.example");

        mock.open().await.unwrap();
        let page = mock.extract_text("https://a.example").await.unwrap();
        assert_eq!(page.raw_text, "text a");

        assert!(mock.extract_text("https://b.example").await.is_err());

        mock.close().await;
        assert_eq!(mock.open_count(), 1);
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_sample_registry_matches_documented_shape() {
        let registry = sample_registry();
        let role = registry
            .resolve_role("engineering", "backend", "senior_engineer")
            .unwrap();

        assert_eq!(role.level_names(), vec!["mid", "senior"]);
        let senior = role.dimensions_for("senior").unwrap();
        assert!(senior["responsibilities"].required);
        assert!(senior["compensation"].required);
    }
}
