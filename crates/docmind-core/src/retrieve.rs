//! Query-time retrieval: embed the question, ask the store for evidence.

use std::sync::Arc;

use tracing::{debug, info};

use crate::embedding::{EmbedPurpose, Embedder};
use crate::error::{ConfigurationError, PipelineError};
use crate::models::Evidence;
use crate::store::VectorStore;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Return at most `k` records with similarity strictly greater than
    /// `similarity_threshold`, best first, ties broken by ascending id.
    ///
    /// No record clearing the threshold is not an error: the result is
    /// empty evidence.
    pub async fn retrieve(
        &self,
        question: &str,
        k: usize,
        similarity_threshold: f32,
    ) -> Result<Evidence, PipelineError> {
        if similarity_threshold.is_nan() {
            return Err(ConfigurationError::Invalid(
                "similarity_threshold must not be NaN".to_string(),
            )
            .into());
        }

        let query_vec = self
            .embedder
            .embed(question, EmbedPurpose::Query)
            .await
            .map_err(PipelineError::from_embedding)?;
        debug!(dims = query_vec.len(), "embedded question");

        if k == 0 {
            return Ok(Evidence::empty());
        }

        let hits = self
            .store
            .search(&query_vec, k, similarity_threshold)
            .await
            .map_err(PipelineError::from_store)?;

        // Re-apply the contract so a loose backend cannot leak extra hits.
        let evidence = Evidence::from_hits(hits, k, similarity_threshold);
        match evidence.best_similarity() {
            Some(best) => info!(hits = evidence.len(), best_similarity = best, "retrieved evidence"),
            None => info!(threshold = similarity_threshold, "no chunk cleared the threshold"),
        }
        Ok(evidence)
    }
}
