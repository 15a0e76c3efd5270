//! Wiring: configuration + credentials → store, capabilities, components.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docmind_core::ingest::Ingestor;
use docmind_core::Orchestrator;

use crate::config::{Config, Credentials};
use crate::db;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::sqlite_store::SqliteVectorStore;

/// Open the initialized vector store, checking the configured embedding
/// dimension against the one fixed at init.
pub async fn open_store(config: &Config) -> Result<Arc<SqliteVectorStore>> {
    let pool = db::connect(&config.db.path).await?;
    let expected = config
        .embedding
        .is_enabled()
        .then_some(config.embedding.dims)
        .flatten();
    let store = SqliteVectorStore::open(pool, expected)
        .await
        .with_context(|| format!("Failed to open vector store at {}", config.db.path.display()))?
        .with_timeout(Duration::from_secs(config.db.timeout_secs));
    Ok(Arc::new(store))
}

/// Build the upload pipeline. Needs no generation credentials.
pub async fn build_ingestor(config: &Config, credentials: &Credentials) -> Result<Ingestor> {
    let store = open_store(config).await?;
    let embedder = create_embedder(&config.embedding, credentials)?;
    Ok(Ingestor::new(embedder, store, config.chunking_policy()?)
        .with_embed_concurrency(config.embedding.concurrency))
}

/// Build the full chat pipeline.
pub async fn build_orchestrator(config: &Config, credentials: &Credentials) -> Result<Orchestrator> {
    let store = open_store(config).await?;
    let embedder = create_embedder(&config.embedding, credentials)?;
    let generator =
        create_generator(&config.generation, credentials).context("invalid [generation] section")?;
    let judge = create_generator(&config.judge_generation(), credentials)
        .context("invalid [evaluation] section")?;

    Ok(Orchestrator::new(
        embedder,
        store,
        generator,
        judge,
        config.chunking_policy()?,
        config.retrieval_params(),
    )
    .with_embed_concurrency(config.embedding.concurrency))
}
