//! Error taxonomy for the grounded question-answering pipeline.
//!
//! Every failure that leaves a pipeline component is a [`PipelineError`].
//! Capability implementations (embedding, generation) report
//! [`CapabilityError`]; store implementations report [`StoreError`]. The
//! components translate those into the pipeline taxonomy so callers can
//! tell a provider outage from a timeout from a malformed audit response.

use std::fmt;
use std::time::Duration;

/// A pipeline stage. Every error surfaced to the caller names one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Chunking,
    Ingestion,
    Retrieval,
    Answering,
    Evaluation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Chunking => "chunking",
            Stage::Ingestion => "ingestion",
            Stage::Retrieval => "retrieval",
            Stage::Answering => "answering",
            Stage::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid chunking or retrieval parameters. Fatal, never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("chunk_size must be > 0")]
    ZeroChunkSize,
    #[error("overlap ({overlap}) must be smaller than chunk_size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
    #[error("embedding dimension mismatch: store expects {store}, embedder produces {embedder}")]
    DimensionMismatch { store: usize, embedder: usize },
    #[error("{0}")]
    Invalid(String),
}

/// Failure reported by an external embedding or generation capability.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CapabilityError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Failure reported by a vector store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("embedding has {actual} dimensions, store schema expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("store timed out after {0:?}")]
    Timeout(Duration),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors returned by pipeline components.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("vector store error: {0}")]
    Store(StoreError),

    /// An upload aborted at `chunk_index`. Chunks before it stay persisted.
    #[error("ingestion of '{source_id}' failed at chunk {chunk_index}: {cause}")]
    Ingestion {
        source_id: String,
        chunk_index: usize,
        chunks_stored: usize,
        #[source]
        cause: Box<PipelineError>,
    },

    #[error("could not parse evaluator output: {reason}")]
    EvaluationParse { reason: String, raw: String },
}

impl PipelineError {
    /// Map an embedding capability failure, keeping timeouts distinct.
    pub fn from_embedding(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Timeout(elapsed) => PipelineError::Timeout {
                operation: "embedding",
                elapsed,
            },
            other => PipelineError::Embedding(other.to_string()),
        }
    }

    /// Map a generation capability failure, keeping timeouts distinct.
    pub fn from_generation(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Timeout(elapsed) => PipelineError::Timeout {
                operation: "generation",
                elapsed,
            },
            other => PipelineError::Generation(other.to_string()),
        }
    }

    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(elapsed) => PipelineError::Timeout {
                operation: "vector store",
                elapsed,
            },
            other => PipelineError::Store(other),
        }
    }

    /// Whether the failure came from a provider or the network, as opposed
    /// to bad input or a malformed response.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Embedding(_)
                | PipelineError::Generation(_)
                | PipelineError::Timeout { .. }
                | PipelineError::Store(_)
        )
    }
}
