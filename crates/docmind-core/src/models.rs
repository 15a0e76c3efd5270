//! Core data models that flow through the upload and chat pipelines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form chunk metadata (`source`, `chunk_index`, offsets, hash).
pub type Metadata = Map<String, Value>;

pub const META_SOURCE: &str = "source";
pub const META_CHUNK_INDEX: &str = "chunk_index";
pub const META_CHAR_START: &str = "char_start";
pub const META_CHAR_END: &str = "char_end";
pub const META_CONTENT_HASH: &str = "content_hash";

/// A contiguous span of one document's text. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).and_then(Value::as_str)
    }

    pub fn chunk_index(&self) -> Option<usize> {
        self.metadata
            .get(META_CHUNK_INDEX)
            .and_then(Value::as_u64)
            .map(|i| i as usize)
    }
}

/// The persisted form of a chunk. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub content: String,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl StoredRecord {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).and_then(Value::as_str)
    }
}

/// A stored record paired with its cosine similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub record: StoredRecord,
    pub similarity: f32,
}

/// Retrieved evidence: descending by similarity, ties by ascending id,
/// every similarity above the retrieval threshold, at most `k` items.
///
/// Empty evidence is a valid state and must reach the Answerer and
/// Evaluator unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Evidence(Vec<ScoredRecord>);

impl Evidence {
    /// Normalize raw store hits into evidence: drop anything at or below
    /// `threshold`, order by similarity desc then id asc, keep `k`.
    pub fn from_hits(mut hits: Vec<ScoredRecord>, k: usize, threshold: f32) -> Self {
        hits.retain(|h| h.similarity > threshold);
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.record.id.cmp(&b.record.id))
        });
        hits.truncate(k);
        Self(hits)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredRecord> {
        self.0.iter()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.0.iter().map(|h| h.record.id).collect()
    }

    pub fn best_similarity(&self) -> Option<f32> {
        self.0.first().map(|h| h.similarity)
    }

    pub fn into_inner(self) -> Vec<ScoredRecord> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Evidence {
    type Item = &'a ScoredRecord;
    type IntoIter = std::slice::Iter<'a, ScoredRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Summary of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestResult {
    pub chunks_stored: usize,
}

/// A generated answer and the evidence that was actually supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub evidence_used: Evidence,
    /// True when the fixed fallback was returned without calling the generator.
    pub grounded_fallback: bool,
}

/// The auditor's judgment of one (question, answer, evidence) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub pass: bool,
    pub rationale: String,
    /// Optional 1-10 grounding score reported by the judge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

/// Verdict as reported to the caller. An audit that could not be parsed
/// is never reported as Pass or Fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerdictStatus {
    Verified(Verdict),
    Unverified { reason: String },
}

impl VerdictStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VerdictStatus::Verified(v) if v.pass => "PASS",
            VerdictStatus::Verified(_) => "FAIL",
            VerdictStatus::Unverified { .. } => "UNVERIFIED",
        }
    }
}

/// Result of one completed chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub question: String,
    pub answer: String,
    pub evidence_used: Evidence,
    pub verdict: VerdictStatus,
}
