//! Embedding providers.
//!
//! Concrete [`Embedder`] implementations for the supported backends:
//! - **[`DisabledEmbedder`]** returns errors; used when embeddings are not configured.
//! - **[`OpenAIEmbedder`]** calls `POST /v1/embeddings`.
//! - **[`OllamaEmbedder`]** calls a local Ollama server's `POST /api/embed`.
//! - **[`GeminiEmbedder`]** calls `models/{model}:embedContent`, embedding
//!   documents and queries with different task types.
//!
//! All remote providers share the retry and deadline handling in
//! [`crate::http`]. A vector whose length differs from the configured
//! `dims` is reported as an invalid response.
//!
//! Use [`create_embedder`] to pick a provider from configuration.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use docmind_core::embedding::{EmbedPurpose, Embedder};
use docmind_core::CapabilityError;
use serde_json::{json, Value};

use crate::config::{Credentials, EmbeddingConfig};
use crate::http::{self, CallPolicy};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub(crate) const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============ Disabled Provider ============

/// A no-op embedder that always returns errors.
///
/// Used when `embedding.provider = "disabled"`. Commands that never embed
/// (`init`, `stats`) still work.
pub struct DisabledEmbedder {
    dims: usize,
}

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, _: &str, _: EmbedPurpose) -> Result<Vec<f32>, CapabilityError> {
        Err(CapabilityError::Provider(
            "embedding provider is disabled; set [embedding].provider in the config".into(),
        ))
    }
}

// ============ OpenAI Provider ============

pub struct OpenAIEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    base_url: String,
    api_key: String,
    policy: CallPolicy,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, credentials: &Credentials) -> Result<Self> {
        let (model, dims) = model_and_dims(config)?;
        let Some(api_key) = credentials.openai_api_key.clone() else {
            bail!("OPENAI_API_KEY environment variable not set");
        };
        Ok(Self {
            client: http::client()?,
            model,
            dims,
            base_url: base_url(config.url.as_deref(), OPENAI_BASE_URL),
            api_key,
            policy: CallPolicy::new(config.timeout_secs, config.max_retries),
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str, _: EmbedPurpose) -> Result<Vec<f32>, CapabilityError> {
        let body = json!({
            "model": self.model,
            "input": [text],
        });
        let response = http::post_json(
            &self.client,
            "OpenAI",
            &format!("{}/v1/embeddings", self.base_url),
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &body,
            self.policy,
        )
        .await?;
        check_len(parse_openai_response(&response)?, self.dims)
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings response.
fn parse_openai_response(json: &Value) -> Result<Vec<f32>, CapabilityError> {
    http::float_array(json.pointer("/data/0/embedding"), "OpenAI")
}

// ============ Ollama Provider ============

pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    base_url: String,
    policy: CallPolicy,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = model_and_dims(config)?;
        Ok(Self {
            client: http::client()?,
            model,
            dims,
            base_url: base_url(config.url.as_deref(), OLLAMA_BASE_URL),
            policy: CallPolicy::new(config.timeout_secs, config.max_retries),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str, _: EmbedPurpose) -> Result<Vec<f32>, CapabilityError> {
        let body = json!({
            "model": self.model,
            "input": text,
        });
        let response = http::post_json(
            &self.client,
            "Ollama",
            &format!("{}/api/embed", self.base_url),
            &[],
            &body,
            self.policy,
        )
        .await?;
        check_len(parse_ollama_response(&response)?, self.dims)
    }
}

/// Extract `embeddings[0]` from an Ollama `/api/embed` response.
fn parse_ollama_response(json: &Value) -> Result<Vec<f32>, CapabilityError> {
    http::float_array(json.pointer("/embeddings/0"), "Ollama")
}

// ============ Gemini Provider ============

pub struct GeminiEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    base_url: String,
    api_key: String,
    policy: CallPolicy,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig, credentials: &Credentials) -> Result<Self> {
        let (model, dims) = model_and_dims(config)?;
        let Some(api_key) = credentials.gemini_api_key.clone() else {
            bail!("GEMINI_API_KEY environment variable not set");
        };
        Ok(Self {
            client: http::client()?,
            model,
            dims,
            base_url: base_url(config.url.as_deref(), GEMINI_BASE_URL),
            api_key,
            policy: CallPolicy::new(config.timeout_secs, config.max_retries),
        })
    }
}

fn gemini_task_type(purpose: EmbedPurpose) -> &'static str {
    match purpose {
        EmbedPurpose::Document => "RETRIEVAL_DOCUMENT",
        EmbedPurpose::Query => "RETRIEVAL_QUERY",
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str, purpose: EmbedPurpose) -> Result<Vec<f32>, CapabilityError> {
        let body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
            "taskType": gemini_task_type(purpose),
            "outputDimensionality": self.dims,
        });
        let response = http::post_json(
            &self.client,
            "Gemini",
            &format!("{}/models/{}:embedContent", self.base_url, self.model),
            &[("x-goog-api-key", self.api_key.clone())],
            &body,
            self.policy,
        )
        .await?;
        check_len(parse_gemini_response(&response)?, self.dims)
    }
}

/// Extract `embedding.values` from a Gemini `embedContent` response.
fn parse_gemini_response(json: &Value) -> Result<Vec<f32>, CapabilityError> {
    http::float_array(json.pointer("/embedding/values"), "Gemini")
}

// ============ Helpers ============

fn model_and_dims(config: &EmbeddingConfig) -> Result<(String, usize)> {
    let model = config.model.clone().ok_or_else(|| {
        anyhow!("embedding.model required for the {} provider", config.provider)
    })?;
    let dims = config
        .dims
        .ok_or_else(|| anyhow!("embedding.dims required for the {} provider", config.provider))?;
    Ok((model, dims))
}

pub(crate) fn base_url(configured: Option<&str>, default: &str) -> String {
    configured.unwrap_or(default).trim_end_matches('/').to_string()
}

fn check_len(vec: Vec<f32>, dims: usize) -> Result<Vec<f32>, CapabilityError> {
    if vec.len() != dims {
        return Err(CapabilityError::InvalidResponse(format!(
            "expected a {}-dimensional embedding, provider returned {}",
            dims,
            vec.len()
        )));
    }
    Ok(vec)
}

/// Create the [`Embedder`] selected by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"gemini"` | [`GeminiEmbedder`] |
pub fn create_embedder(
    config: &EmbeddingConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn Embedder>> {
    Ok(match config.provider.as_str() {
        "disabled" => Arc::new(DisabledEmbedder {
            dims: config.dims.unwrap_or(0),
        }),
        "openai" => Arc::new(OpenAIEmbedder::new(config, credentials)?),
        "ollama" => Arc::new(OllamaEmbedder::new(config)?),
        "gemini" => Arc::new(GeminiEmbedder::new(config, credentials)?),
        other => bail!("Unknown embedding provider: {}", other),
    })
}
