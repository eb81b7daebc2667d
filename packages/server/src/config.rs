//! Environment-driven server configuration.

use anyhow::Context;

/// Server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:8080`
    pub bind_addr: String,

    /// Directory of per-domain taxonomy JSON files
    pub taxonomy_dir: String,

    /// API key for the completion collaborator
    pub openai_api_key: String,

    /// Optional chat model override
    pub openai_model: Option<String>,
}

impl ServerConfig {
    /// Read configuration from the environment.
    ///
    /// `OPENAI_API_KEY` is required; everything else has a default.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            taxonomy_dir: std::env::var("TAXONOMY_DIR")
                .unwrap_or_else(|_| "config/taxonomy".to_string()),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?,
            openai_model: std::env::var("OPENAI_MODEL").ok(),
        })
    }
}
