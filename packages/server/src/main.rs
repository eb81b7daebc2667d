//! Server entry point.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use extraction::{ExtractionPipeline, HttpContentSource, MemoryStore, OpenAiCompletion, TaxonomyRegistry};
use server_core::{build_router, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let registry = TaxonomyRegistry::load_dir(&config.taxonomy_dir)
        .with_context(|| format!("loading taxonomy from {}", config.taxonomy_dir))?;

    let mut completion = OpenAiCompletion::new(config.openai_api_key.clone());
    if let Some(model) = &config.openai_model {
        completion = completion.with_model(model.as_str());
    }

    let pipeline = ExtractionPipeline::new(
        registry,
        HttpContentSource::new(),
        completion,
        MemoryStore::new(),
    );

    let app = build_router(Arc::new(pipeline));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
