//! # chunklab-chunk
//!
//! Text chunking strategies used to build collections.
//!
//! Every strategy is a pure function of `(text, params)`: the same input always
//! yields the same ordered list of chunks, and no chunk is ever empty or
//! whitespace-only. Empty input yields no chunks; input shorter than one
//! window yields a single chunk holding the whole text.
//!
//! | Method | Unit | Boundary policy |
//! |--------|------|-----------------|
//! | Fixed | characters | none, raw substrings |
//! | Recursive | characters | blank line > sentence end > space > hard cut |
//! | Token | whitespace words | joined with single spaces |
//! | Sentence | `.`/`!`/`?` + whitespace | joined with single spaces |
//! | Semantic | paragraphs | merged while token overlap ≥ threshold |
//!
//! ```rust
//! use chunklab_chunk::chunk_text;
//! use chunklab_core::ChunkParams;
//!
//! let params = ChunkParams::Sentence { sentence_count: 2, overlap: 0 };
//! let chunks = chunk_text("One. Two! Three? Four.", &params).unwrap();
//! assert_eq!(chunks, vec!["One. Two!", "Three? Four."]);
//! ```

use chunklab_core::{ChunkError, ChunkMethod, ChunkParams};

mod fixed;
mod recursive;
mod semantic;
mod sentence;
mod token;

pub use fixed::FixedChunker;
pub use recursive::RecursiveChunker;
pub use semantic::{token_overlap, SemanticChunker};
pub use sentence::{split_sentences, SentenceChunker};
pub use token::TokenChunker;

/// A text chunking strategy.
pub trait Chunker: Send + Sync {
    fn method(&self) -> ChunkMethod;

    /// Split `text` into ordered, non-blank chunks.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Build the chunker described by `params`.
pub fn chunker_for(params: &ChunkParams) -> Result<Box<dyn Chunker>, ChunkError> {
    Ok(match *params {
        ChunkParams::Fixed { chunk_size, overlap } => Box::new(FixedChunker::new(chunk_size, overlap)?),
        ChunkParams::Recursive { chunk_size, overlap } => Box::new(RecursiveChunker::new(chunk_size, overlap)?),
        ChunkParams::Token { token_count, overlap } => Box::new(TokenChunker::new(token_count, overlap)?),
        ChunkParams::Sentence { sentence_count, overlap } => Box::new(SentenceChunker::new(sentence_count, overlap)?),
        ChunkParams::Semantic { similarity_threshold } => Box::new(SemanticChunker::new(similarity_threshold)?),
    })
}

pub fn chunk_text(text: &str, params: &ChunkParams) -> Result<Vec<String>, ChunkError> {
    Ok(chunker_for(params)?.chunk(text))
}

/// Overlap must stay below the window so every step advances by at least one unit.
fn clamp_overlap(window: usize, overlap: usize) -> usize {
    overlap.min(window.saturating_sub(1))
}

fn push_chunk(out: &mut Vec<String>, piece: &str) {
    if !piece.trim().is_empty() {
        out.push(piece.to_string());
    }
}

/// Group `units` into windows of `size` advancing by `size - overlap`, joining
/// each window with `sep`. The last window ends at the final unit.
fn windows_joined(units: &[&str], size: usize, overlap: usize, sep: &str) -> Vec<String> {
    let mut out = Vec::new();
    if units.is_empty() {
        return out;
    }
    let step = size - clamp_overlap(size, overlap);
    let mut start = 0;
    loop {
        let end = (start + size).min(units.len());
        push_chunk(&mut out, &units[start..end].join(sep));
        if end == units.len() {
            break;
        }
        start += step;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_params_variant() {
        for m in ChunkMethod::ALL {
            let chunker = chunker_for(&m.default_params()).unwrap();
            assert_eq!(chunker.method(), m);
        }
    }

    #[test]
    fn empty_text_yields_nothing_for_every_method() {
        for m in ChunkMethod::ALL {
            assert!(chunk_text("", &m.default_params()).unwrap().is_empty(), "{m}");
            assert!(chunk_text(" \n\n\t ", &m.default_params()).unwrap().is_empty(), "{m}");
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let text = "A short note.";
        for m in ChunkMethod::ALL {
            let chunks = chunk_text(text, &m.default_params()).unwrap();
            assert_eq!(chunks, vec![text.to_string()], "{m}");
        }
    }

    #[test]
    fn windows_overlap_by_requested_units() {
        let units = ["a", "b", "c", "d", "e"];
        assert_eq!(windows_joined(&units, 2, 1, " "), vec!["a b", "b c", "c d", "d e"]);
        assert_eq!(windows_joined(&units, 3, 0, " "), vec!["a b c", "d e"]);
        // overlap >= size is clamped to size - 1
        assert_eq!(windows_joined(&units, 2, 5, "-"), vec!["a-b", "b-c", "c-d", "d-e"]);
    }
}
