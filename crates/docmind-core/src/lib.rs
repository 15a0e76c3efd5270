//! # DocuMind Core
//!
//! The document-grounded question-answering pipeline: chunking, capability
//! traits, the vector store contract, and the Ingestor → Retriever →
//! Answerer → Evaluator components sequenced by the [`orchestrator`].
//!
//! This crate contains no tokio, sqlx, HTTP clients, or filesystem I/O.
//! Embedding, generation, and storage are reached only through the
//! [`embedding::Embedder`], [`generation::Generator`], and
//! [`store::VectorStore`] traits, so every component can be driven by
//! deterministic test doubles.
//!
//! ## Data flow
//!
//! ```text
//! upload: text ──▶ chunk ──▶ ingest (embed + insert) ──▶ IngestResult
//! chat:   question ──▶ retrieve ──▶ answer ──▶ evaluate ──▶ ChatOutcome
//! ```

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod evaluate;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod retrieve;
pub mod store;

pub use error::{CapabilityError, ConfigurationError, PipelineError, Stage, StoreError};
pub use orchestrator::{Orchestrator, RetrievalParams, StageFailure};
