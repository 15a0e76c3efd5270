//! Pipeline orchestration.
//!
//! A chat turn is an explicit state machine:
//!
//! ```text
//! Idle ──▶ Retrieving ──▶ Answering ──▶ Evaluating ──▶ Done
//!   │          │              │              │
//!   └──────────┴──────────────┴──────────────┴──▶ Failed
//! ```
//!
//! [`ChatState::transition`] is a pure function of the current state and a
//! [`ChatEvent`]; [`Orchestrator::chat`] only performs the I/O for the
//! current state and feeds the outcome back in. No stage is retried. An
//! audit whose output cannot be parsed ends in `Done` with an
//! [`VerdictStatus::Unverified`] verdict instead of `Failed`, since the
//! answer itself was produced.
//!
//! The upload flow is a straight Chunker → Ingestor call.

use std::sync::Arc;

use tracing::{error, info, info_span, Instrument};

use crate::answer::Answerer;
use crate::chunk::ChunkingPolicy;
use crate::embedding::Embedder;
use crate::error::{PipelineError, Stage};
use crate::evaluate::Evaluator;
use crate::generation::Generator;
use crate::ingest::Ingestor;
use crate::models::{Answer, ChatOutcome, Evidence, IngestResult, Verdict, VerdictStatus};
use crate::retrieve::Retriever;
use crate::store::VectorStore;

/// A failed chat turn, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

/// State of one chat turn.
#[derive(Debug)]
pub enum ChatState {
    Idle {
        question: String,
    },
    Retrieving {
        question: String,
    },
    Answering {
        question: String,
        evidence: Evidence,
    },
    Evaluating {
        question: String,
        answer: Answer,
    },
    Done(ChatOutcome),
    Failed(StageFailure),
}

/// Outcome of the work performed in one state.
#[derive(Debug)]
pub enum ChatEvent {
    Start,
    Retrieved(Evidence),
    Answered(Answer),
    Evaluated(Verdict),
    Error(PipelineError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition: {event} while {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl ChatState {
    pub fn new(question: impl Into<String>) -> Self {
        ChatState::Idle {
            question: question.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Idle { .. } => "idle",
            ChatState::Retrieving { .. } => "retrieving",
            ChatState::Answering { .. } => "answering",
            ChatState::Evaluating { .. } => "evaluating",
            ChatState::Done(_) => "done",
            ChatState::Failed(_) => "failed",
        }
    }

    /// The pipeline stage this state performs, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ChatState::Retrieving { .. } => Some(Stage::Retrieval),
            ChatState::Answering { .. } => Some(Stage::Answering),
            ChatState::Evaluating { .. } => Some(Stage::Evaluation),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatState::Done(_) | ChatState::Failed(_))
    }

    pub fn transition(self, event: ChatEvent) -> Result<ChatState, TransitionError> {
        let state_name = self.name();
        let stage = self.stage();
        match (self, event, stage) {
            (ChatState::Idle { question }, ChatEvent::Start, _) => {
                Ok(ChatState::Retrieving { question })
            }
            (ChatState::Retrieving { question }, ChatEvent::Retrieved(evidence), _) => {
                Ok(ChatState::Answering { question, evidence })
            }
            (ChatState::Answering { question, .. }, ChatEvent::Answered(answer), _) => {
                Ok(ChatState::Evaluating { question, answer })
            }
            (ChatState::Evaluating { question, answer }, ChatEvent::Evaluated(verdict), _) => {
                Ok(ChatState::Done(ChatOutcome {
                    question,
                    answer: answer.text,
                    evidence_used: answer.evidence_used,
                    verdict: VerdictStatus::Verified(verdict),
                }))
            }
            (
                ChatState::Evaluating { question, answer },
                ChatEvent::Error(PipelineError::EvaluationParse { reason, .. }),
                _,
            ) => Ok(ChatState::Done(ChatOutcome {
                question,
                answer: answer.text,
                evidence_used: answer.evidence_used,
                verdict: VerdictStatus::Unverified { reason },
            })),
            // Only states that run a stage can fail; Idle and the terminal
            // states reject errors.
            (_, ChatEvent::Error(error), Some(stage)) => {
                Ok(ChatState::Failed(StageFailure { stage, error }))
            }
            (_, event, _) => Err(TransitionError {
                state: state_name,
                event: event.name(),
            }),
        }
    }
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Start => "start",
            ChatEvent::Retrieved(_) => "retrieved",
            ChatEvent::Answered(_) => "answered",
            ChatEvent::Evaluated(_) => "evaluated",
            ChatEvent::Error(_) => "error",
        }
    }
}

impl<T> From<Result<T, PipelineError>> for ChatEvent
where
    T: Into<ChatEvent>,
{
    fn from(result: Result<T, PipelineError>) -> Self {
        match result {
            Ok(v) => v.into(),
            Err(e) => ChatEvent::Error(e),
        }
    }
}

impl From<Evidence> for ChatEvent {
    fn from(evidence: Evidence) -> Self {
        ChatEvent::Retrieved(evidence)
    }
}

impl From<Answer> for ChatEvent {
    fn from(answer: Answer) -> Self {
        ChatEvent::Answered(answer)
    }
}

impl From<Verdict> for ChatEvent {
    fn from(verdict: Verdict) -> Self {
        ChatEvent::Evaluated(verdict)
    }
}

/// Retrieval parameters for a chat turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.5,
        }
    }
}

/// Sequences Retriever → Answerer → Evaluator for chat, and
/// Chunker → Ingestor for upload.
pub struct Orchestrator {
    ingestor: Ingestor,
    retriever: Retriever,
    answerer: Answerer,
    evaluator: Evaluator,
    params: RetrievalParams,
}

impl Orchestrator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        judge: Arc<dyn Generator>,
        policy: ChunkingPolicy,
        params: RetrievalParams,
    ) -> Self {
        Self {
            ingestor: Ingestor::new(embedder.clone(), store.clone(), policy),
            retriever: Retriever::new(embedder, store),
            answerer: Answerer::new(generator),
            evaluator: Evaluator::new(judge),
            params,
        }
    }

    pub fn with_embed_concurrency(mut self, n: usize) -> Self {
        self.ingestor = self.ingestor.with_embed_concurrency(n);
        self
    }

    pub fn params(&self) -> RetrievalParams {
        self.params
    }

    pub async fn upload(&self, source: &str, text: &str) -> Result<IngestResult, PipelineError> {
        self.ingestor
            .ingest(source, text)
            .instrument(info_span!("upload", source))
            .await
    }

    /// Run one chat turn with the configured retrieval parameters.
    pub async fn chat(&self, question: &str) -> Result<ChatOutcome, StageFailure> {
        self.chat_with(question, self.params).await
    }

    pub async fn chat_with(
        &self,
        question: &str,
        params: RetrievalParams,
    ) -> Result<ChatOutcome, StageFailure> {
        let span = info_span!("chat_turn", top_k = params.top_k);
        async move {
            let mut state = ChatState::new(question);
            loop {
                state = match state {
                    ChatState::Done(outcome) => return Ok(outcome),
                    ChatState::Failed(failure) => {
                        error!(stage = %failure.stage, error = %failure.error, "chat turn failed");
                        return Err(failure);
                    }
                    active => active,
                };
                let event = match &state {
                    ChatState::Idle { .. } => ChatEvent::Start,
                    ChatState::Retrieving { question } => self
                        .retriever
                        .retrieve(question, params.top_k, params.similarity_threshold)
                        .await
                        .into(),
                    ChatState::Answering { question, evidence } => {
                        self.answerer.answer(question, evidence).await.into()
                    }
                    ChatState::Evaluating { question, answer } => self
                        .evaluator
                        .evaluate(question, &answer.text, &answer.evidence_used)
                        .await
                        .into(),
                    ChatState::Done(_) | ChatState::Failed(_) => continue,
                };
                let from = state.name();
                let stage = state.stage().unwrap_or(Stage::Retrieval);
                state = match state.transition(event) {
                    Ok(next) => next,
                    Err(e) => {
                        // Only reachable through a bug in the loop above.
                        return Err(StageFailure {
                            stage,
                            error: PipelineError::Configuration(
                                crate::error::ConfigurationError::Invalid(e.to_string()),
                            ),
                        });
                    }
                };
                info!(from, to = state.name(), "chat transition");
            }
        }
        .instrument(span)
        .await
    }
}
