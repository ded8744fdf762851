//! Fixed-size character windows.
//!
//! ```text
//! chunk_size = 10, overlap = 3
//!
//! "abcdefghijklmnopqrstuvwxyz"
//!  [0..10)  "abcdefghij"
//!  [7..17)  "hijklmnopq"
//!  [14..24) "opqrstuvwx"
//!  [21..26) "vwxyz"        <- tail may be shorter
//! ```
//!
//! Windows are counted in `char`s, so multibyte text never splits inside a
//! code point. For a text of `L > chunk_size` characters the chunk count is
//! `ceil((L - overlap) / (chunk_size - overlap))`.

use chunklab_core::{ChunkError, ChunkMethod};

use crate::{clamp_overlap, push_chunk, Chunker};

#[derive(Debug, Clone)]
pub struct FixedChunker {
    size: usize,
    overlap: usize,
}

impl FixedChunker {
    /// `overlap` is clamped below `size`; a zero `size` is rejected.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::InvalidConfig("chunk_size must be > 0".to_string()));
        }
        Ok(Self { size, overlap: clamp_overlap(size, overlap) })
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }
}

impl Chunker for FixedChunker {
    fn method(&self) -> ChunkMethod {
        ChunkMethod::Fixed
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        if text.is_empty() {
            return out;
        }
        let bounds = char_bounds(text);
        let total = bounds.len() - 1;
        let mut start = 0;
        loop {
            let end = (start + self.size).min(total);
            push_chunk(&mut out, &text[bounds[start]..bounds[end]]);
            if end == total {
                break;
            }
            start += self.step();
        }
        out
    }
}

/// Byte offset of every char start, plus `text.len()` as the final bound.
pub(crate) fn char_bounds(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}
