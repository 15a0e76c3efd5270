//! Upload pipeline: chunk → embed → persist.
//!
//! # Persistence guarantee
//!
//! The store has no transaction boundary across chunks. If embedding or
//! storage fails for chunk `i`, the upload aborts with
//! [`PipelineError::Ingestion`] naming `i`, and chunks `0..i` stay stored.
//! Re-uploading the same document therefore stores those chunks again:
//! persistence is at-least-once, not exactly-once.
//!
//! # Concurrency
//!
//! With `embed_concurrency > 1`, embedding calls for up to that many chunks
//! are in flight at once. Results are consumed in chunk order and inserted
//! one at a time, so the persisted prefix on failure is the same as in the
//! sequential case.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::chunk::{chunk_text, ChunkingPolicy};
use crate::embedding::{EmbedPurpose, Embedder};
use crate::error::PipelineError;
use crate::models::IngestResult;
use crate::store::VectorStore;

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    policy: ChunkingPolicy,
    embed_concurrency: usize,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        policy: ChunkingPolicy,
    ) -> Self {
        Self {
            embedder,
            store,
            policy,
            embed_concurrency: 1,
        }
    }

    /// Allow up to `n` embedding calls in flight. `0` is treated as `1`.
    pub fn with_embed_concurrency(mut self, n: usize) -> Self {
        self.embed_concurrency = n.max(1);
        self
    }

    pub fn policy(&self) -> &ChunkingPolicy {
        &self.policy
    }

    /// Chunk `text`, embed every chunk, and insert one record per chunk
    /// tagged with `source_identifier` and its chunk index.
    pub async fn ingest(
        &self,
        source_identifier: &str,
        text: &str,
    ) -> Result<IngestResult, PipelineError> {
        let chunks = chunk_text(source_identifier, text, &self.policy);
        if chunks.is_empty() {
            warn!(source = source_identifier, "no chunks produced, nothing to ingest");
            return Ok(IngestResult { chunks_stored: 0 });
        }
        info!(
            source = source_identifier,
            chunks = chunks.len(),
            chunk_size = self.policy.chunk_size(),
            overlap = self.policy.overlap(),
            "chunked document"
        );

        let embedder = &self.embedder;
        let mut embedded = stream::iter(chunks.iter().enumerate())
            .map(|(index, chunk)| async move {
                let result = embedder.embed(&chunk.content, EmbedPurpose::Document).await;
                (index, chunk, result)
            })
            .buffered(self.embed_concurrency);

        let mut stored = 0usize;
        while let Some((index, chunk, result)) = embedded.next().await {
            let fail = |cause: PipelineError| PipelineError::Ingestion {
                source_id: source_identifier.to_string(),
                chunk_index: index,
                chunks_stored: stored,
                cause: Box::new(cause),
            };

            let vector = result.map_err(|e| fail(PipelineError::from_embedding(e)))?;
            let id = self
                .store
                .insert(&chunk.content, &chunk.metadata, &vector)
                .await
                .map_err(|e| fail(PipelineError::from_store(e)))?;
            debug!(source = source_identifier, chunk_index = index, id, "stored chunk");
            stored += 1;
        }

        info!(source = source_identifier, chunks_stored = stored, "ingestion complete");
        Ok(IngestResult {
            chunks_stored: stored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use crate::store::memory::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails on the `fail_at`-th call (0-based).
    struct FlakyEmbedder {
        dims: usize,
        fail_at: Option<usize>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_name(&self) -> &str {
            "flaky"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed(&self, text: &str, _: EmbedPurpose) -> Result<Vec<f32>, CapabilityError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(n) == self.fail_at {
                return Err(CapabilityError::Provider("quota exceeded".into()));
            }
            Ok(vec![text.len() as f32 + 1.0; self.dims])
        }
    }

    fn ingestor(fail_at: Option<usize>, store: Arc<InMemoryVectorStore>) -> Ingestor {
        let embedder = Arc::new(FlakyEmbedder {
            dims: 4,
            fail_at,
            calls: AtomicUsize::new(0),
        });
        Ingestor::new(embedder, store, ChunkingPolicy::new(10, 2).unwrap())
    }

    #[tokio::test]
    async fn test_stores_every_chunk_with_metadata() {
        let store = Arc::new(InMemoryVectorStore::new(4));
        let result = ingestor(None, store.clone())
            .ingest("notes.txt", &"abcdefghij".repeat(3))
            .await
            .unwrap();
        assert_eq!(result.chunks_stored, 4);
        let records = store.records();
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.source(), Some("notes.txt"));
            assert_eq!(r.metadata["chunk_index"], i);
        }
    }

    #[tokio::test]
    async fn test_empty_document_stores_nothing() {
        let store = Arc::new(InMemoryVectorStore::new(4));
        let result = ingestor(None, store.clone()).ingest("empty.txt", "").await.unwrap();
        assert_eq!(result.chunks_stored, 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_names_chunk_and_keeps_prefix() {
        let store = Arc::new(InMemoryVectorStore::new(4));
        let err = ingestor(Some(2), store.clone())
            .ingest("notes.txt", &"abcdefghij".repeat(3))
            .await
            .unwrap_err();
        match err {
            PipelineError::Ingestion {
                chunk_index,
                chunks_stored,
                ref cause,
                ..
            } => {
                assert_eq!(chunk_index, 2);
                assert_eq!(chunks_stored, 2);
                assert!(matches!(**cause, PipelineError::Embedding(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // No rollback of what was already persisted.
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_ingestion_failure() {
        let store = Arc::new(InMemoryVectorStore::new(8));
        let err = ingestor(None, store.clone())
            .ingest("notes.txt", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ingestion { chunk_index: 0, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_embedding_matches_sequential() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(5);
        let seq_store = Arc::new(InMemoryVectorStore::new(4));
        let par_store = Arc::new(InMemoryVectorStore::new(4));
        ingestor(None, seq_store.clone()).ingest("fox", &text).await.unwrap();
        ingestor(None, par_store.clone())
            .with_embed_concurrency(4)
            .ingest("fox", &text)
            .await
            .unwrap();
        assert_eq!(seq_store.records(), par_store.records());
    }
}
