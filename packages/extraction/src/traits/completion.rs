//! Completion trait for the external large-language-model collaborator.

use async_trait::async_trait;

use crate::error::Result;

/// Requested shape of the completion response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form text
    Text,

    /// A single JSON value
    Json,
}

/// The completion service boundary.
///
/// Implementations wrap a specific provider and handle transport only; the
/// pipeline owns prompt construction and response parsing. One fixed timeout
/// per call, no retry at this layer.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String>;
}

#[async_trait]
impl<T: Completion + ?Sized> Completion for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        (**self).complete(prompt, format).await
    }
}
