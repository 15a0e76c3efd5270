//! In-memory [`VectorStore`] implementation for tests and as a reference.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Ids are assigned
//! sequentially from 1. Search is brute-force cosine similarity, so unlike
//! an ANN-backed store its recall is exact.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::StoreError;
use crate::models::{Evidence, Metadata, ScoredRecord, StoredRecord};

use super::{check_dims, VectorStore};

/// In-memory store with a fixed embedding dimension.
pub struct InMemoryVectorStore {
    dims: usize,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of every stored record in insertion order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<StoredRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
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
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = records.len() as i64 + 1;
        records.push(StoredRecord {
            id,
            content: content.to_string(),
            metadata: metadata.clone(),
            embedding: embedding.to_vec(),
        });
        Ok(id)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        check_dims(self.dims, query_embedding)?;
        let hits: Vec<ScoredRecord> = self
            .read()
            .iter()
            .map(|record| ScoredRecord {
                similarity: cosine_similarity(query_embedding, &record.embedding),
                record: record.clone(),
            })
            .collect();
        Ok(Evidence::from_hits(hits, k, threshold).into_inner())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.read().len())
    }

    async fn source_counts(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in self.read().iter() {
            let source = record.source().unwrap_or("(unknown)").to_string();
            *counts.entry(source).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}
