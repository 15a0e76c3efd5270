//! Answer audit: a secondary judgment call checks that an answer is
//! supported by the evidence and relevant to the question.
//!
//! # Audit response format
//!
//! The judge must reply with a single JSON object:
//!
//! ```json
//! {"score": 9, "verdict": "Pass", "reasoning": "Every claim is in chunk 4."}
//! ```
//!
//! Markdown code fences around the object are tolerated. Anything else
//! (prose, a verdict other than Pass/Fail, an out-of-range score) is an
//! [`PipelineError::EvaluationParse`]; the Evaluator never guesses Pass.
//!
//! # Empty evidence
//!
//! With no evidence there is nothing for a judge to compare against, so
//! the verdict is decided structurally: the fixed fallback answer makes no
//! claim and passes, any other answer is unsupported and fails.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::answer::{format_context, INSUFFICIENT_GROUNDING};
use crate::error::PipelineError;
use crate::generation::{Generator, Prompt};
use crate::models::{Evidence, Verdict};

pub const EVAL_SYSTEM_INSTRUCTION: &str = "You are a strict QA auditor. You will be given a User \
Query, the Context that was retrieved from a knowledge base, and the Generated Answer produced by \
another AI.

Your task:
1. Hallucination Check: does the answer contain any facts or claims NOT supported by the context?
2. Relevance Check: does the answer actually address the user query?

Respond ONLY with a JSON object (no markdown fences) in this exact schema:
{\"score\": <int 1-10>, \"verdict\": \"<Pass or Fail>\", \"reasoning\": \"<brief explanation>\"}

Scoring guide:
  9-10 = Fully grounded in context, directly answers the query.
  7-8  = Mostly grounded, minor gaps or slight tangents.
  4-6  = Partially grounded; some unsupported claims or only partially relevant.
  1-3  = Mostly hallucinated or off-topic.
Verdict: Pass if score >= 7, else Fail.";

/// Lowest score the audit instructions allow with a Pass verdict.
const PASS_SCORE: u8 = 7;

/// Rationale used when the fallback answer is audited without a judge.
pub const NO_CLAIM_RATIONALE: &str =
    "No evidence was retrieved and the answer declines to answer; it makes no unsupported claim.";

pub const UNSUPPORTED_RATIONALE: &str =
    "No evidence was retrieved, so every claim in the answer is unsupported.";

pub struct Evaluator {
    judge: Arc<dyn Generator>,
}

impl Evaluator {
    pub fn new(judge: Arc<dyn Generator>) -> Self {
        Self { judge }
    }

    /// Judge one (question, answer, evidence) triple.
    pub async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        evidence: &Evidence,
    ) -> Result<Verdict, PipelineError> {
        if evidence.is_empty() {
            let pass = answer.trim() == INSUFFICIENT_GROUNDING;
            return Ok(Verdict {
                pass,
                rationale: if pass {
                    NO_CLAIM_RATIONALE.to_string()
                } else {
                    UNSUPPORTED_RATIONALE.to_string()
                },
                score: None,
            });
        }

        let prompt = build_eval_prompt(question, answer, evidence);
        let raw = self
            .judge
            .generate(&prompt)
            .await
            .map_err(PipelineError::from_generation)?;

        let verdict = parse_verdict(&raw).inspect_err(|e| {
            warn!(error = %e, "evaluator returned unparseable output");
        })?;
        info!(
            model = self.judge.model_name(),
            pass = verdict.pass,
            score = verdict.score,
            "evaluation complete"
        );
        Ok(verdict)
    }
}

pub fn build_eval_prompt(question: &str, answer: &str, evidence: &Evidence) -> Prompt {
    let user = format!(
        "User Query:\n{}\n\nRetrieved Context:\n{}\n\nGenerated Answer:\n{}",
        question,
        format_context(evidence),
        answer
    );
    Prompt::new(EVAL_SYSTEM_INSTRUCTION, user)
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    score: Option<Value>,
    #[serde(default)]
    verdict: Option<String>,
    #[serde(default, alias = "rationale")]
    reasoning: Option<String>,
}

/// Parse a judge response into a [`Verdict`].
pub fn parse_verdict(raw: &str) -> Result<Verdict, PipelineError> {
    let parse_err = |reason: String| PipelineError::EvaluationParse {
        reason,
        raw: raw.chars().take(300).collect(),
    };

    let cleaned = strip_fences(raw);
    let parsed: RawVerdict = serde_json::from_str(cleaned)
        .map_err(|e| parse_err(format!("not a JSON verdict object: {e}")))?;

    let pass = match parsed.verdict.as_deref().map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("pass") => true,
        Some(v) if v.eq_ignore_ascii_case("fail") => false,
        Some(other) => return Err(parse_err(format!("unknown verdict '{other}'"))),
        None => return Err(parse_err("missing verdict".to_string())),
    };

    let score = match parsed.score {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_score(&value).ok_or_else(|| {
            parse_err(format!("score must be an integer in 1..=10, got {value}"))
        })?),
    };

    if let Some(score) = score {
        if (score >= PASS_SCORE) != pass {
            return Err(parse_err(format!(
                "verdict contradicts score: verdict {} with score {score}",
                if pass { "Pass" } else { "Fail" }
            )));
        }
    }

    Ok(Verdict {
        pass,
        rationale: parsed.reasoning.unwrap_or_default().trim().to_string(),
        score,
    })
}

fn parse_score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    (1..=10).contains(&n).then_some(n as u8)
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
