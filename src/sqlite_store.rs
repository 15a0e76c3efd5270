//! SQLite-backed [`VectorStore`] implementation.
//!
//! Embeddings are stored as little-endian f32 BLOBs next to the chunk text
//! and its JSON metadata. Search loads every vector and ranks by cosine
//! similarity in Rust, so results are exact.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use docmind_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docmind_core::models::{Evidence, Metadata, ScoredRecord, StoredRecord};
use docmind_core::store::{check_dims, VectorStore};
use docmind_core::{ConfigurationError, StoreError};

use crate::migrate;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    dims: usize,
    timeout: Duration,
}

impl SqliteVectorStore {
    /// Open an initialized store.
    ///
    /// When `expected_dims` is given (the configured embedder's dimension)
    /// it must equal the dimension fixed at init.
    pub async fn open(pool: SqlitePool, expected_dims: Option<usize>) -> Result<Self> {
        migrate::run_migrations(&pool).await?;
        let Some(dims) = migrate::stored_dims(&pool).await? else {
            bail!("Vector store is not initialized. Run `docmind init` first.");
        };

        if let Some(embedder) = expected_dims {
            if embedder != dims {
                return Err(ConfigurationError::DimensionMismatch {
                    store: dims,
                    embedder,
                }
                .into());
            }
        }

        Ok(Self {
            pool,
            dims,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(backend),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn insert(
        &self,
        content: &str,
        metadata: &Metadata,
        embedding: &[f32],
    ) -> Result<i64, StoreError> {
        check_dims(self.dims, embedding)?;
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| StoreError::Backend(format!("failed to encode metadata: {}", e)))?;
        let now = chrono::Utc::now().timestamp();

        let result = self
            .bounded(
                sqlx::query(
                    "INSERT INTO records (content, metadata_json, embedding, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(content)
                .bind(&metadata_json)
                .bind(vec_to_blob(embedding))
                .bind(now)
                .execute(&self.pool),
            )
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        check_dims(self.dims, query_embedding)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .bounded(
                sqlx::query("SELECT id, content, metadata_json, embedding FROM records")
                    .fetch_all(&self.pool),
            )
            .await?;

        let mut hits = Vec::new();
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let embedding = blob_to_vec(&blob);
            let similarity = cosine_similarity(query_embedding, &embedding);
            if similarity <= threshold {
                continue;
            }

            let metadata_json: String = row.get("metadata_json");
            let metadata: Metadata = serde_json::from_str(&metadata_json)
                .map_err(|e| StoreError::Backend(format!("corrupt metadata_json: {}", e)))?;

            hits.push(ScoredRecord {
                record: StoredRecord {
                    id: row.get("id"),
                    content: row.get("content"),
                    metadata,
                    embedding,
                },
                similarity,
            });
        }

        Ok(Evidence::from_hits(hits, k, threshold).into_inner())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .bounded(sqlx::query_scalar("SELECT COUNT(*) FROM records").fetch_one(&self.pool))
            .await?;
        Ok(count as usize)
    }

    async fn source_counts(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let rows = self
            .bounded(
                sqlx::query(
                    r#"
                    SELECT json_extract(metadata_json, '$.source') AS source, COUNT(*) AS n
                    FROM records
                    GROUP BY source
                    "#,
                )
                .fetch_all(&self.pool),
            )
            .await?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in &rows {
            let source: Option<String> = row.get("source");
            let n: i64 = row.get("n");
            *counts
                .entry(source.unwrap_or_else(|| "(unknown)".to_string()))
                .or_default() += n as usize;
        }
        Ok(counts.into_iter().collect())
    }
}
