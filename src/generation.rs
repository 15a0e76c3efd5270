//! Text-generation providers.
//!
//! Concrete [`Generator`] implementations used by both the Answerer and the
//! Evaluator's judge:
//! - **[`OpenAIGenerator`]**: `POST /v1/chat/completions`
//! - **[`OllamaGenerator`]**: `POST /api/generate` (non-streaming)
//! - **[`GeminiGenerator`]**: `models/{model}:generateContent` with the
//!   system instruction sent as `systemInstruction`

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use docmind_core::generation::{Generator, Prompt};
use docmind_core::CapabilityError;
use serde_json::{json, Value};

use crate::config::{Credentials, GenerationConfig};
use crate::embedding::{base_url, GEMINI_BASE_URL};
use crate::http::{self, CallPolicy};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

pub struct OpenAIGenerator {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    temperature: Option<f32>,
    policy: CallPolicy,
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
        });
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }
        let response = http::post_json(
            &self.client,
            "OpenAI",
            &format!("{}/v1/chat/completions", self.base_url),
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &body,
            self.policy,
        )
        .await?;
        parse_openai_response(&response)
    }
}

fn parse_openai_response(json: &Value) -> Result<String, CapabilityError> {
    http::string_at(json, "/choices/0/message/content", "OpenAI").map(str::to_string)
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    policy: CallPolicy,
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError> {
        let mut body = json!({
            "model": self.model,
            "system": prompt.system,
            "prompt": prompt.user,
            "stream": false,
        });
        if let Some(t) = self.temperature {
            body["options"] = json!({ "temperature": t });
        }
        let response = http::post_json(
            &self.client,
            "Ollama",
            &format!("{}/api/generate", self.base_url),
            &[],
            &body,
            self.policy,
        )
        .await?;
        parse_ollama_response(&response)
    }
}

fn parse_ollama_response(json: &Value) -> Result<String, CapabilityError> {
    http::string_at(json, "/response", "Ollama").map(str::to_string)
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    temperature: Option<f32>,
    policy: CallPolicy,
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError> {
        let mut body = json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
        });
        if let Some(t) = self.temperature {
            body["generationConfig"] = json!({ "temperature": t });
        }
        let response = http::post_json(
            &self.client,
            "Gemini",
            &format!("{}/models/{}:generateContent", self.base_url, self.model),
            &[("x-goog-api-key", self.api_key.clone())],
            &body,
            self.policy,
        )
        .await?;
        parse_gemini_response(&response)
    }
}

/// Concatenate the text parts of the first candidate.
///
/// A response without candidates (e.g. blocked by safety filters) is
/// reported with the block reason when Gemini provides one.
fn parse_gemini_response(json: &Value) -> Result<String, CapabilityError> {
    let Some(parts) = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
    else {
        let reason = json
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
            .unwrap_or("no candidates returned");
        return Err(CapabilityError::InvalidResponse(format!(
            "Gemini response has no content: {}",
            reason
        )));
    };

    Ok(parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

/// Create the [`Generator`] selected by `config.provider`.
pub fn create_generator(
    config: &GenerationConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn Generator>> {
    let client = http::client()?;
    let model = config.model.clone();
    let policy = CallPolicy::new(config.timeout_secs, config.max_retries);
    let temperature = config.temperature;

    Ok(match config.provider.as_str() {
        "openai" => {
            let Some(api_key) = credentials.openai_api_key.clone() else {
                bail!("OPENAI_API_KEY environment variable not set");
            };
            Arc::new(OpenAIGenerator {
                client,
                model,
                base_url: base_url(config.url.as_deref(), OPENAI_BASE_URL),
                api_key,
                temperature,
                policy,
            })
        }
        "ollama" => Arc::new(OllamaGenerator {
            client,
            model,
            base_url: base_url(config.url.as_deref(), OLLAMA_BASE_URL),
            temperature,
            policy,
        }),
        "gemini" => {
            let Some(api_key) = credentials.gemini_api_key.clone() else {
                bail!("GEMINI_API_KEY environment variable not set");
            };
            Arc::new(GeminiGenerator {
                client,
                model,
                base_url: base_url(config.url.as_deref(), GEMINI_BASE_URL),
                api_key,
                temperature,
                policy,
            })
        }
        other => bail!("Unknown generation provider: {}", other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_response() {
        let json = json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Two years." } }]
        });
        assert_eq!(parse_openai_response(&json).unwrap(), "Two years.");
        assert!(parse_openai_response(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = json!({ "model": "llama3.2", "response": "Two years.", "done": true });
        assert_eq!(parse_ollama_response(&json).unwrap(), "Two years.");
    }

    #[test]
    fn test_parse_gemini_joins_parts() {
        let json = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Two " }, { "text": "years." }] }
            }]
        });
        assert_eq!(parse_gemini_response(&json).unwrap(), "Two years.");
    }

    #[test]
    fn test_parse_gemini_blocked() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = parse_gemini_response(&json).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_create_generator_requires_keys() {
        let mut config = GenerationConfig::default();
        let none = Credentials::default();
        assert!(create_generator(&config, &none).is_err());

        let creds = Credentials {
            gemini_api_key: Some("k".into()),
            ..Credentials::default()
        };
        let generator = create_generator(&config, &creds).unwrap();
        assert_eq!(generator.model_name(), "gemini-2.5-flash");

        config.provider = "ollama".into();
        config.model = "llama3.2".into();
        assert_eq!(create_generator(&config, &none).unwrap().model_name(), "llama3.2");
    }
}
