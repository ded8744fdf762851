use chunklab_chunk::{chunk_text, Chunker, FixedChunker};
use chunklab_core::ChunkParams;
use proptest::prelude::*;

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn zero_overlap_params() -> impl Strategy<Value = ChunkParams> {
    prop_oneof![
        (1usize..40).prop_map(|chunk_size| ChunkParams::Fixed { chunk_size, overlap: 0 }),
        (1usize..40).prop_map(|chunk_size| ChunkParams::Recursive { chunk_size, overlap: 0 }),
        (1usize..10).prop_map(|token_count| ChunkParams::Token { token_count, overlap: 0 }),
        (1usize..5).prop_map(|sentence_count| ChunkParams::Sentence { sentence_count, overlap: 0 }),
        (0.0f32..=1.0).prop_map(|similarity_threshold| ChunkParams::Semantic { similarity_threshold }),
    ]
}

fn any_params() -> impl Strategy<Value = ChunkParams> {
    prop_oneof![
        (1usize..40, 0usize..50).prop_map(|(chunk_size, overlap)| ChunkParams::Fixed { chunk_size, overlap }),
        (1usize..40, 0usize..50).prop_map(|(chunk_size, overlap)| ChunkParams::Recursive { chunk_size, overlap }),
        (1usize..10, 0usize..12).prop_map(|(token_count, overlap)| ChunkParams::Token { token_count, overlap }),
        (1usize..5, 0usize..6).prop_map(|(sentence_count, overlap)| ChunkParams::Sentence { sentence_count, overlap }),
        (0.0f32..=1.0).prop_map(|similarity_threshold| ChunkParams::Semantic { similarity_threshold }),
    ]
}

proptest! {
    #[test]
    fn zero_overlap_preserves_content(text in "[a-zé日 .!?\n]{0,300}", params in zero_overlap_params()) {
        let chunks = chunk_text(&text, &params).unwrap();
        prop_assert_eq!(squash(&chunks.concat()), squash(&text));
    }

    #[test]
    fn chunks_are_never_blank(text in "[a-z .!?\n\t]{0,300}", params in any_params()) {
        let chunks = chunk_text(&text, &params).unwrap();
        prop_assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
        }
    }

    #[test]
    fn chunking_is_deterministic(text in "[a-zA-Z .!?\n]{0,300}", params in any_params()) {
        prop_assert_eq!(chunk_text(&text, &params).unwrap(), chunk_text(&text, &params).unwrap());
    }

    #[test]
    fn fixed_count_matches_closed_form(len in 1usize..2000, size in 1usize..300, overlap in 0usize..300) {
        let text = "x".repeat(len);
        let chunker = FixedChunker::new(size, overlap).unwrap();
        let chunks = chunker.chunk(&text);
        let overlap = overlap.min(size - 1);
        let expected = if len <= size { 1 } else { (len - overlap).div_ceil(size - overlap) };
        prop_assert_eq!(chunks.len(), expected);
        prop_assert!(chunks.iter().all(|c| c.chars().count() <= size));
    }

    #[test]
    fn recursive_chunks_fit_the_window(text in "[a-z .!?\n]{0,300}", size in 1usize..60, overlap in 0usize..30) {
        let chunks = chunk_text(&text, &ChunkParams::Recursive { chunk_size: size, overlap }).unwrap();
        prop_assert!(chunks.iter().all(|c| c.chars().count() <= size));
    }
}
