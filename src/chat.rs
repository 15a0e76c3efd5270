//! `docmind chat`: one turn, or an interactive loop.

use anyhow::{Context, Result};
use docmind_core::models::{ChatOutcome, VerdictStatus};
use docmind_core::{Orchestrator, RetrievalParams};
use serde_json::{json, Value};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{Config, Credentials};
use crate::pipeline;

/// Per-invocation overrides from the command line.
#[derive(Debug, Default, Clone)]
pub struct ChatOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub json: bool,
}

impl ChatOptions {
    fn params(&self, defaults: RetrievalParams) -> RetrievalParams {
        RetrievalParams {
            top_k: self.top_k.unwrap_or(defaults.top_k),
            similarity_threshold: self.threshold.unwrap_or(defaults.similarity_threshold),
        }
    }
}

pub async fn run_chat(
    config: &Config,
    credentials: &Credentials,
    question: Option<&str>,
    options: &ChatOptions,
) -> Result<()> {
    let orchestrator = pipeline::build_orchestrator(config, credentials).await?;
    let params = options.params(orchestrator.params());

    match question {
        Some(q) => {
            let outcome = orchestrator.chat_with(q, params).await.context("Chat failed")?;
            print_outcome(&outcome, options.json)?;
            Ok(())
        }
        None => interactive(&orchestrator, params, options.json).await,
    }
}

async fn interactive(orchestrator: &Orchestrator, params: RetrievalParams, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !json {
        println!("Ask a question about your documents (`exit` to quit).");
    }

    loop {
        write_prompt(&mut std::io::stdout(), json)?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        match orchestrator.chat_with(question, params).await {
            Ok(outcome) => print_outcome(&outcome, json)?,
            // A failed turn does not end the session.
            Err(failure) => eprintln!("Error: {}", failure),
        }
    }
    Ok(())
}

/// JSON mode keeps stdout machine-readable, so no prompt is written.
fn write_prompt(out: &mut impl Write, json: bool) -> std::io::Result<()> {
    if !json {
        write!(out, "> ")?;
        out.flush()?;
    }
    Ok(())
}

fn print_outcome(outcome: &ChatOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&render_json(outcome))?);
    } else {
        println!("{}", render_text(outcome));
    }
    Ok(())
}

pub fn render_text(outcome: &ChatOutcome) -> String {
    let evidence = if outcome.evidence_used.is_empty() {
        "none".to_string()
    } else {
        outcome
            .evidence_used
            .iter()
            .map(|hit| {
                format!(
                    "#{} ({}, {:.3})",
                    hit.record.id,
                    hit.record.source().unwrap_or("unknown"),
                    hit.similarity
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let verdict = match &outcome.verdict {
        VerdictStatus::Verified(v) => match v.score {
            Some(score) => format!("{} (score {}/10): {}", outcome.verdict.label(), score, v.rationale),
            None => format!("{}: {}", outcome.verdict.label(), v.rationale),
        },
        VerdictStatus::Unverified { reason } => {
            format!("{}: {}", outcome.verdict.label(), reason)
        }
    };

    format!(
        "{}\n\nEvidence: {}\nVerdict:  {}\n",
        outcome.answer.trim_end(),
        evidence,
        verdict
    )
}

pub fn render_json(outcome: &ChatOutcome) -> Value {
    let evidence: Vec<Value> = outcome
        .evidence_used
        .iter()
        .map(|hit| {
            json!({
                "id": hit.record.id,
                "source": hit.record.source(),
                "chunk_index": hit.record.metadata.get("chunk_index"),
                "similarity": hit.similarity,
            })
        })
        .collect();

    json!({
        "question": outcome.question,
        "answer": outcome.answer,
        "evidence_used": evidence,
        "verdict": outcome.verdict,
        "label": outcome.verdict.label(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmind_core::models::{Evidence, Metadata, ScoredRecord, StoredRecord, Verdict};

    fn outcome(verdict: VerdictStatus) -> ChatOutcome {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!("manual.pdf"));
        metadata.insert("chunk_index".into(), json!(3));
        ChatOutcome {
            question: "How long is the warranty?".into(),
            answer: "Two years.".into(),
            evidence_used: Evidence::from_hits(
                vec![ScoredRecord {
                    record: StoredRecord {
                        id: 7,
                        content: "The warranty covers defects for 2 years.".into(),
                        metadata,
                        embedding: vec![],
                    },
                    similarity: 0.8125,
                }],
                5,
                0.5,
            ),
            verdict,
        }
    }

    #[test]
    fn test_render_text_pass() {
        let text = render_text(&outcome(VerdictStatus::Verified(Verdict {
            pass: true,
            rationale: "stated in chunk 7".into(),
            score: Some(9),
        })));
        assert!(text.starts_with("Two years.\n"));
        assert!(text.contains("#7 (manual.pdf, 0.812)") || text.contains("#7 (manual.pdf, 0.813)"));
        assert!(text.contains("PASS (score 9/10): stated in chunk 7"));
    }

    #[test]
    fn test_render_text_unverified() {
        let text = render_text(&outcome(VerdictStatus::Unverified {
            reason: "judge returned prose".into(),
        }));
        assert!(text.contains("UNVERIFIED: judge returned prose"));
    }

    #[test]
    fn test_render_json_is_slim() {
        let value = render_json(&outcome(VerdictStatus::Verified(Verdict {
            pass: false,
            rationale: "unsupported".into(),
            score: None,
        })));
        assert_eq!(value["label"], "FAIL");
        assert_eq!(value["evidence_used"][0]["id"], 7);
        assert_eq!(value["evidence_used"][0]["chunk_index"], 3);
        assert_eq!(value["verdict"]["status"], "verified");
        assert!(value["evidence_used"][0].get("embedding").is_none());
    }

    #[test]
    fn test_prompt_only_in_text_mode() {
        let mut text = Vec::new();
        write_prompt(&mut text, false).unwrap();
        assert_eq!(text, b"> ");

        let mut json = Vec::new();
        write_prompt(&mut json, true).unwrap();
        assert!(json.is_empty());
    }

    #[test]
    fn test_options_override_defaults() {
        let defaults = RetrievalParams::default();
        let opts = ChatOptions {
            top_k: Some(2),
            ..ChatOptions::default()
        };
        let params = opts.params(defaults);
        assert_eq!(params.top_k, 2);
        assert_eq!(params.similarity_threshold, defaults.similarity_threshold);
    }
}
