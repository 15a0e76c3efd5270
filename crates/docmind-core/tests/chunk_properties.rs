//! Property tests for the fixed-window chunker.

use docmind_core::chunk::{chunk, chunk_text, ChunkingPolicy};
use proptest::prelude::*;

/// Arbitrary `(chunk_size, overlap)` with `0 <= overlap < chunk_size`.
fn arb_policy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..64).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunking_is_deterministic(text in "\\PC{0,300}", (size, overlap) in arb_policy()) {
        let a = chunk("doc", &text, size, overlap).unwrap();
        let b = chunk("doc", &text, size, overlap).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn every_char_is_covered(text in "\\PC{1,300}", (size, overlap) in arb_policy()) {
        let chunks = chunk("doc", &text, size, overlap).unwrap();
        let char_len = text.chars().count();
        let mut covered = vec![false; char_len];
        let chars: Vec<char> = text.chars().collect();

        for c in &chunks {
            let start = c.metadata["char_start"].as_u64().unwrap() as usize;
            let end = c.metadata["char_end"].as_u64().unwrap() as usize;
            prop_assert!(end - start <= size);
            let expected: String = chars[start..end].iter().collect();
            prop_assert_eq!(&c.content, &expected);
            for flag in &mut covered[start..end] {
                *flag = true;
            }
        }
        prop_assert!(covered.iter().all(|&c| c), "gap in coverage");
    }

    #[test]
    fn zero_overlap_reconstructs_text(text in "\\PC{0,300}", size in 1usize..64) {
        let policy = ChunkingPolicy::new(size, 0).unwrap();
        let chunks = chunk_text("doc", &text, &policy);
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        prop_assert_eq!(joined, text);
    }

    #[test]
    fn indices_are_contiguous(text in "[a-z ]{0,500}", (size, overlap) in arb_policy()) {
        let chunks = chunk("doc", &text, size, overlap).unwrap();
        for (i, c) in chunks.iter().enumerate() {
            prop_assert_eq!(c.chunk_index(), Some(i));
            prop_assert_eq!(c.source(), Some("doc"));
        }
    }

    #[test]
    fn invalid_overlap_always_rejected(size in 1usize..64, extra in 0usize..64) {
        prop_assert!(chunk("doc", "abc", size, size + extra).is_err());
    }
}
