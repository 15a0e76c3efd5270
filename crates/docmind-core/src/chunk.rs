//! Fixed-window text chunker with overlap.
//!
//! Splits extracted document text into [`Chunk`]s of `chunk_size`
//! characters, each window overlapping the previous one by `overlap`
//! characters. The unit is always the Unicode scalar value (`char`), never
//! the byte or the token, so multi-byte text is never split mid-character.
//!
//! # Algorithm
//!
//! 1. Reject `chunk_size == 0` and `overlap >= chunk_size`; a window that
//!    does not advance would never terminate.
//! 2. Window `i` covers chars `[i * step, i * step + chunk_size)` where
//!    `step = chunk_size - overlap`, clipped to the end of the text.
//! 3. Stop after the first window that reaches the end of the text.
//!
//! Every chunk records `source`, a contiguous `chunk_index`, its char
//! offsets, and a SHA-256 `content_hash`.
//!
//! # Example
//!
//! ```rust
//! use docmind_core::chunk::{chunk_text, ChunkingPolicy};
//!
//! let policy = ChunkingPolicy::new(4, 1).unwrap();
//! let chunks = chunk_text("notes.txt", "abcdefghij", &policy);
//! let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
//! assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
//! ```

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::ConfigurationError;
use crate::models::{
    Chunk, Metadata, META_CHAR_END, META_CHAR_START, META_CHUNK_INDEX, META_CONTENT_HASH,
    META_SOURCE,
};

/// Validated chunking parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingPolicy {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingPolicy {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigurationError> {
        if chunk_size == 0 {
            return Err(ConfigurationError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ConfigurationError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split `text` with raw parameters, validating them first.
pub fn chunk(
    source: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ConfigurationError> {
    let policy = ChunkingPolicy::new(chunk_size, overlap)?;
    Ok(chunk_text(source, text, &policy))
}

/// Split `text` into overlapping windows. Empty text yields no chunks.
pub fn chunk_text(source: &str, text: &str, policy: &ChunkingPolicy) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let char_len = bounds.len() - 1;

    let mut chunks = Vec::with_capacity(char_len / policy.step() + 1);
    let mut start = 0usize;

    loop {
        let end = (start + policy.chunk_size).min(char_len);
        let content = &text[bounds[start]..bounds[end]];
        chunks.push(make_chunk(source, chunks.len(), start, end, content));
        if end == char_len {
            break;
        }
        start += policy.step();
    }

    chunks
}

fn make_chunk(source: &str, index: usize, char_start: usize, char_end: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let mut metadata = Metadata::new();
    metadata.insert(META_SOURCE.to_string(), json!(source));
    metadata.insert(META_CHUNK_INDEX.to_string(), json!(index));
    metadata.insert(META_CHAR_START.to_string(), json!(char_start));
    metadata.insert(META_CHAR_END.to_string(), json!(char_end));
    metadata.insert(META_CONTENT_HASH.to_string(), json!(hash));

    Chunk {
        content: text.to_string(),
        metadata,
    }
}
