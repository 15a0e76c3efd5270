//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only shared mutable resource the
//! pipeline touches. From the pipeline's point of view it is append-only:
//! records are inserted during upload and searched during chat, never
//! updated or deleted.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Contract
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`insert`](VectorStore::insert) | Persist one record, returning its store-assigned id |
//! | [`search`](VectorStore::search) | Cosine-ranked top-`k` records with similarity `> threshold` |
//! | [`dims`](VectorStore::dims) | Embedding dimension fixed when the store was created |
//! | [`count`](VectorStore::count) | Number of stored records |
//! | [`source_counts`](VectorStore::source_counts) | Records per `source` metadata value |
//!
//! Backends may use an approximate nearest-neighbour index, so recall is not
//! guaranteed to be the exact top-`k`. Results must still be ordered by
//! similarity descending with ties broken by ascending id.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Metadata, ScoredRecord};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embedding dimension of the store schema.
    fn dims(&self) -> usize;

    /// Insert a record. Fails with [`StoreError::DimensionMismatch`] when
    /// `embedding.len() != self.dims()`.
    async fn insert(
        &self,
        content: &str,
        metadata: &Metadata,
        embedding: &[f32],
    ) -> Result<i64, StoreError>;

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredRecord>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// `(source, record_count)` pairs sorted by source.
    async fn source_counts(&self) -> Result<Vec<(String, usize)>, StoreError>;
}

/// Shared dimension check for store implementations.
pub fn check_dims(expected: usize, embedding: &[f32]) -> Result<(), StoreError> {
    if embedding.len() != expected {
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}
