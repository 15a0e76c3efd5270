//! # DocuMind
//!
//! Document-grounded question answering: upload PDFs or text files, then
//! ask questions answered only from the uploaded content, with every answer
//! audited for grounding.
//!
//! The pipeline itself lives in [`docmind_core`]. This crate supplies the
//! concrete pieces around it: configuration, a SQLite vector store, HTTP
//! embedding and generation providers, document extraction and the CLI
//! command runners.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  upload  │──▶│ chunk+embed  │──▶│    SQLite    │
//! │ PDF/text │   │  (Ingestor)  │   │ records+BLOB │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          │
//! ┌──────────┐   ┌──────────────┐   ┌──────▼───────┐
//! │ verdict  │◀──│   evaluate   │◀──│   retrieve   │
//! │PASS/FAIL │   │  ◀── answer  │   │  (cosine)    │
//! └──────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and credentials |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation and store initialization |
//! | [`sqlite_store`] | SQLite [`VectorStore`](docmind_core::store::VectorStore) |
//! | [`http`] | Provider retry and timeout handling |
//! | [`embedding`] | Embedding providers |
//! | [`generation`] | Generation providers |
//! | [`extract`] | PDF and text extraction |
//! | [`pipeline`] | Component wiring from configuration |
//! | [`upload`], [`chat`], [`stats`] | Command runners |

pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod http;
pub mod logging;
pub mod migrate;
pub mod pipeline;
pub mod sqlite_store;
pub mod stats;
pub mod upload;
