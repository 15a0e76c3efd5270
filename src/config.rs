//! TOML configuration parsing and validation.
//!
//! Everything a command needs (database path, chunking, retrieval,
//! provider selection, logging) is read from one file. API keys are not
//! part of the file: they come from the environment once, at startup, as
//! [`Credentials`], and are handed to provider constructors explicitly.

use anyhow::{bail, Context, Result};
use docmind_core::chunk::ChunkingPolicy;
use docmind_core::RetrievalParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Upper bound on a single store operation.
    #[serde(default = "default_db_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_db_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_similarity_threshold() -> f32 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama, OpenAI-compatible gateways).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Embedding calls allowed in flight during one upload.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    2
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
            temperature: None,
        }
    }
}

fn default_generation_provider() -> String {
    "gemini".to_string()
}
fn default_generation_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    60
}

/// Overrides for the audit model. Unset fields fall back to `[generation]`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn chunking_policy(&self) -> Result<ChunkingPolicy> {
        ChunkingPolicy::new(self.chunking.chunk_size, self.chunking.overlap)
            .context("invalid [chunking] section")
    }

    pub fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            top_k: self.retrieval.top_k,
            similarity_threshold: self.retrieval.similarity_threshold,
        }
    }

    /// The generation settings used by the Evaluator's judge.
    pub fn judge_generation(&self) -> GenerationConfig {
        let mut judge = self.generation.clone();
        if let Some(provider) = &self.evaluation.provider {
            judge.provider = provider.clone();
            // A different provider must not inherit the answer model's URL.
            judge.url = None;
        }
        if let Some(model) = &self.evaluation.model {
            judge.model = model.clone();
        }
        if let Some(url) = &self.evaluation.url {
            judge.url = Some(url.clone());
        }
        if let Some(timeout) = self.evaluation.timeout_secs {
            judge.timeout_secs = timeout;
        }
        // Audits should be as repeatable as the provider allows.
        judge.temperature = Some(0.0);
        judge
    }
}

/// API keys read from the environment once at startup.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            gemini_api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate db
    if config.db.timeout_secs == 0 {
        bail!("db.timeout_secs must be > 0");
    }

    // Validate chunking
    config.chunking_policy()?;

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    if !config.retrieval.similarity_threshold.is_finite() {
        bail!("retrieval.similarity_threshold must be a finite number");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "gemini" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or gemini.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.timeout_secs == 0 {
        bail!("embedding.timeout_secs must be > 0");
    }

    // Validate generation and evaluation
    for (section, generation) in [
        ("generation", &config.generation),
        ("evaluation", &config.judge_generation()),
    ] {
        match generation.provider.as_str() {
            "openai" | "ollama" | "gemini" => {}
            other => bail!(
                "Unknown {} provider: '{}'. Must be openai, ollama, or gemini.",
                section,
                other
            ),
        }
        if generation.timeout_secs == 0 {
            bail!("{}.timeout_secs must be > 0", section);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[db]
path = "./data/docmind.sqlite"
"#;

    #[test]
    fn test_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.similarity_threshold - 0.5).abs() < f32::EPSILON);
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.generation.provider, "gemini");
        assert!(!config.logging.json);
        assert_eq!(config.db.timeout_secs, 30);
    }

    #[test]
    fn test_db_timeout_must_be_positive() {
        let config = parse_config(
            r#"
[db]
path = "x.sqlite"
timeout_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.db.timeout_secs, 5);

        let err = parse_config(
            r#"
[db]
path = "x.sqlite"
timeout_secs = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("db.timeout_secs"));
    }

    #[test]
    fn test_overlap_must_be_below_chunk_size() {
        let err = parse_config(
            r#"
[db]
path = "x.sqlite"
[chunking]
chunk_size = 100
overlap = 100
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("overlap"));
    }

    #[test]
    fn test_enabled_embedding_requires_dims_and_model() {
        let err = parse_config(
            r#"
[db]
path = "x.sqlite"
[embedding]
provider = "openai"
model = "text-embedding-3-small"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = parse_config(
            r#"
[db]
path = "x.sqlite"
[generation]
provider = "carrier-pigeon"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_judge_inherits_generation() {
        let config = parse_config(
            r#"
[db]
path = "x.sqlite"
[generation]
provider = "ollama"
model = "llama3.2"
url = "http://gpu-box:11434"
[evaluation]
model = "qwen2.5"
"#,
        )
        .unwrap();
        let judge = config.judge_generation();
        assert_eq!(judge.provider, "ollama");
        assert_eq!(judge.model, "qwen2.5");
        assert_eq!(judge.url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(judge.temperature, Some(0.0));
    }

    #[test]
    fn test_judge_provider_override_drops_url() {
        let config = parse_config(
            r#"
[db]
path = "x.sqlite"
[generation]
provider = "ollama"
model = "llama3.2"
url = "http://gpu-box:11434"
[evaluation]
provider = "openai"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();
        let judge = config.judge_generation();
        assert_eq!(judge.provider, "openai");
        assert_eq!(judge.url, None);
    }
}
