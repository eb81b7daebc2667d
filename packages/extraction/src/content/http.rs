//! HTTP implementation of the ContentSource trait.
//!
//! Fetches a posting page and reduces it to plain text. Suitable for
//! server-rendered postings; JavaScript-heavy boards need a browser-backed
//! source behind the same trait.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{ContentError, ContentResult};
use crate::traits::content::{ContentSource, PageContent};

/// HTTP-backed page content source.
pub struct HttpContentSource {
    client: reqwest::Client,
    user_agent: String,
    open: AtomicBool,
}

impl Default for HttpContentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpContentSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: "JobsiftBot/1.0".to_string(),
            open: AtomicBool::new(false),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Reduce HTML to readable plain text.
    fn html_to_text(html: &str) -> String {
        let mut text = html.to_string();

        // Remove scripts and styles
        let script_pattern = Regex::new(r"(?s)<script[^>]*>.*?</script>").unwrap();
        let style_pattern = Regex::new(r"(?s)<style[^>]*>.*?</style>").unwrap();
        text = script_pattern.replace_all(&text, "").to_string();
        text = style_pattern.replace_all(&text, "").to_string();

        // Block-level tags become line breaks so sections stay separated
        let block_pattern = Regex::new(r"</(p|div|li|h1|h2|h3|h4|tr|section)>").unwrap();
        text = block_pattern.replace_all(&text, "\n").to_string();
        let br_pattern = Regex::new(r"<br\s*/?>").unwrap();
        text = br_pattern.replace_all(&text, "\n").to_string();

        // Remove remaining tags
        let tag_pattern = Regex::new(r"<[^>]+>").unwrap();
        text = tag_pattern.replace_all(&text, "").to_string();

        // Clean up whitespace
        let multi_newline = Regex::new(r"\n{3,}").unwrap();
        text = multi_newline.replace_all(&text, "\n\n").to_string();

        // Decode common HTML entities
        text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'");

        text.trim().to_string()
    }

    /// Extract the page title.
    fn extract_title(html: &str) -> Option<String> {
        let title_pattern = Regex::new(r"(?s)<title[^>]*>(.*?)</title>").ok()?;
        title_pattern
            .captures(html)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn open(&self) -> ContentResult<()> {
        self.open.store(true, Ordering::SeqCst);
        debug!("HTTP content session opened");
        Ok(())
    }

    async fn extract_text(&self, url: &str) -> ContentResult<PageContent> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(ContentError::SessionClosed);
        }

        let parsed = url::Url::parse(url).map_err(|_| ContentError::InvalidUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ContentError::InvalidUrl {
                url: url.to_string(),
            });
        }

        debug!(url = %url, "Fetching posting page");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                ContentError::Http(Box::new(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP {status}"),
            ))));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ContentError::Http(Box::new(e)))?;

        let title = Self::extract_title(&html);
        let raw_text = Self::html_to_text(&html);

        let mut page = PageContent::new(raw_text);
        if let Some(title) = title {
            page = page.with_title(title);
        }
        Ok(page)
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        debug!("HTTP content session closed");
    }
}
