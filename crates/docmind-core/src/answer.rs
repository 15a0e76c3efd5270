//! Grounded answer synthesis.
//!
//! The Answerer never lets the generator answer from its own prior
//! knowledge: with no evidence it returns [`INSUFFICIENT_GROUNDING`]
//! without calling the generator at all, and with evidence the prompt
//! restricts the model to the supplied chunks.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::generation::{Generator, Prompt};
use crate::models::{Answer, Evidence};

/// Fixed answer returned when retrieval produced no evidence.
pub const INSUFFICIENT_GROUNDING: &str =
    "I could not find any relevant information in the knowledge base to answer this question.";

pub const ANSWER_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Answer the user query \
ONLY using the provided context chunks. Do not use prior knowledge. If the answer is not in the \
context, state that you do not know. When you use a chunk, cite its id like [chunk 12].";

pub struct Answerer {
    generator: Arc<dyn Generator>,
}

impl Answerer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub async fn answer(&self, question: &str, evidence: &Evidence) -> Result<Answer, PipelineError> {
        if evidence.is_empty() {
            warn!("no evidence retrieved, returning fallback answer");
            return Ok(Answer {
                text: INSUFFICIENT_GROUNDING.to_string(),
                evidence_used: Evidence::empty(),
                grounded_fallback: true,
            });
        }

        let prompt = build_prompt(question, evidence);
        info!(
            model = self.generator.model_name(),
            chunks = evidence.len(),
            "generating answer"
        );
        let text = self
            .generator
            .generate(&prompt)
            .await
            .map_err(PipelineError::from_generation)?;

        Ok(Answer {
            text,
            evidence_used: evidence.clone(),
            grounded_fallback: false,
        })
    }
}

/// Render evidence as labeled context blocks, one per chunk, tagged with
/// the store id and source so answers stay traceable.
pub fn format_context(evidence: &Evidence) -> String {
    evidence
        .iter()
        .map(|hit| {
            let source = hit.record.source().unwrap_or("unknown");
            format!(
                "[chunk {} | source: {}]\n{}",
                hit.record.id, source, hit.record.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(question: &str, evidence: &Evidence) -> Prompt {
    let user = format!(
        "Context:\n{}\n\nUser Query: {}\n\nAnswer:",
        format_context(evidence),
        question
    );
    Prompt::new(ANSWER_SYSTEM_INSTRUCTION, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use crate::models::{Metadata, ScoredRecord, StoredRecord};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<Prompt>>,
        fail: bool,
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        fn model_name(&self) -> &str {
            "recording"
        }
        async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            if self.fail {
                return Err(CapabilityError::Provider("overloaded".into()));
            }
            Ok("Paris is the capital [chunk 7].".to_string())
        }
    }

    fn evidence() -> Evidence {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!("atlas.txt"));
        Evidence::from_hits(
            vec![ScoredRecord {
                record: StoredRecord {
                    id: 7,
                    content: "Paris is the capital of France.".into(),
                    metadata,
                    embedding: Vec::new(),
                },
                similarity: 0.91,
            }],
            5,
            0.5,
        )
    }

    #[tokio::test]
    async fn test_empty_evidence_never_calls_generator() {
        let generator = Arc::new(RecordingGenerator::default());
        let answerer = Answerer::new(generator.clone());
        let answer = answerer.answer("capital?", &Evidence::empty()).await.unwrap();
        assert_eq!(answer.text, INSUFFICIENT_GROUNDING);
        assert!(answer.evidence_used.is_empty());
        assert!(answer.grounded_fallback);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_labeled_chunks() {
        let generator = Arc::new(RecordingGenerator::default());
        let answerer = Answerer::new(generator.clone());
        let answer = answerer.answer("What is the capital?", &evidence()).await.unwrap();
        assert_eq!(answer.text, "Paris is the capital [chunk 7].");
        assert_eq!(answer.evidence_used.ids(), vec![7]);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains("[chunk 7 | source: atlas.txt]"));
        assert!(prompts[0].user.contains("Paris is the capital of France."));
        assert!(prompts[0].user.contains("What is the capital?"));
        assert!(prompts[0].system.contains("ONLY"));
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces() {
        let generator = Arc::new(RecordingGenerator {
            fail: true,
            ..Default::default()
        });
        let err = Answerer::new(generator)
            .answer("q", &evidence())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }
}
