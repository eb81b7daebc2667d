//! Content source trait for the page-content collaborator.
//!
//! The collaborator holds the only long-lived external resource in the
//! pipeline (typically a browser session). Callers acquire it with `open`
//! before the first fetch and must guarantee `close` on every exit path,
//! including stage failures.

use async_trait::async_trait;

use crate::error::ContentResult;

/// Raw page content for one URL.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub raw_text: String,
    pub page_title: Option<String>,
}

impl PageContent {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            page_title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = Some(title.into());
        self
    }
}

/// The page-content extraction boundary.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Acquire the underlying session. Idempotent.
    async fn open(&self) -> ContentResult<()>;

    /// Fetch one page and return its plain text. A single attempt; the
    /// pipeline wraps this in its bounded retry.
    async fn extract_text(&self, url: &str) -> ContentResult<PageContent>;

    /// Release the underlying session. Must be safe to call on error paths
    /// and after a failed `open`.
    async fn close(&self);
}

#[async_trait]
impl<T: ContentSource + ?Sized> ContentSource for std::sync::Arc<T> {
    async fn open(&self) -> ContentResult<()> {
        (**self).open().await
    }

    async fn extract_text(&self, url: &str) -> ContentResult<PageContent> {
        (**self).extract_text(url).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}
