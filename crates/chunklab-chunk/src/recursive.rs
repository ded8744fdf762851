//! Boundary-aware character windows.
//!
//! Like [`FixedChunker`](crate::FixedChunker), but each window ends at the
//! best boundary found by scanning backward from the `chunk_size`-th char:
//!
//! 1. after a blank line (`"\n\n"`)
//! 2. after a sentence terminator (`.`, `!`, `?`) followed by whitespace or end of text
//! 3. after a whitespace character
//! 4. otherwise a hard cut at `chunk_size`
//!
//! The next window starts `overlap` chars before the chosen split. When the
//! split lands so early that stepping back would not advance, the next window
//! starts at the split itself.

use chunklab_core::{ChunkError, ChunkMethod};

use crate::fixed::char_bounds;
use crate::{clamp_overlap, push_chunk, Chunker};

#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    size: usize,
    overlap: usize,
}

impl RecursiveChunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::InvalidConfig("chunk_size must be > 0".to_string()));
        }
        Ok(Self { size, overlap: clamp_overlap(size, overlap) })
    }
}

impl Chunker for RecursiveChunker {
    fn method(&self) -> ChunkMethod {
        ChunkMethod::Recursive
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        if text.is_empty() {
            return out;
        }
        let chars: Vec<char> = text.chars().collect();
        let bounds = char_bounds(text);
        let total = chars.len();
        let mut start = 0;
        while start < total {
            let limit = start + self.size;
            if limit >= total {
                push_chunk(&mut out, &text[bounds[start]..]);
                break;
            }
            let split = find_split(&chars, start, limit);
            push_chunk(&mut out, &text[bounds[start]..bounds[split]]);
            let back = split.saturating_sub(self.overlap);
            start = if back > start { back } else { split };
        }
        out
    }
}

/// Split position in `(start, limit]`, scanning backward by boundary priority.
fn find_split(chars: &[char], start: usize, limit: usize) -> usize {
    let candidates = || (start + 1..=limit).rev();

    if let Some(i) = candidates().find(|&i| i >= start + 2 && chars[i - 2] == '\n' && chars[i - 1] == '\n') {
        return i;
    }
    let is_terminator = |c: char| matches!(c, '.' | '!' | '?');
    if let Some(i) = candidates().find(|&i| is_terminator(chars[i - 1]) && chars.get(i).map_or(true, |c| c.is_whitespace())) {
        return i;
    }
    if let Some(i) = candidates().find(|&i| chars[i - 1].is_whitespace()) {
        return i;
    }
    limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_blank_line() {
        let text = "First para. Still first.\n\nSecond paragraph here.";
        let chunks = RecursiveChunker::new(30, 0).unwrap().chunk(text);
        assert_eq!(chunks[0], "First para. Still first.\n\n");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn falls_back_to_sentence_end() {
        let text = "One two three. Four five six seven eight";
        let chunks = RecursiveChunker::new(20, 0).unwrap().chunk(text);
        assert_eq!(chunks[0], "One two three.");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn falls_back_to_space_then_hard_cut() {
        let chunks = RecursiveChunker::new(8, 0).unwrap().chunk("alpha beta gamma");
        assert_eq!(chunks, vec!["alpha ", "beta ", "gamma"]);

        let chunks = RecursiveChunker::new(4, 0).unwrap().chunk("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn overlap_restarts_before_split() {
        let chunks = RecursiveChunker::new(10, 3).unwrap().chunk("aaaa bbbb cccc dddd");
        assert_eq!(chunks[0], "aaaa bbbb ");
        assert!(chunks[1].starts_with("bb "));
    }

    #[test]
    fn window_larger_than_text_is_whole_text() {
        let chunks = RecursiveChunker::new(1000, 200).unwrap().chunk("tiny");
        assert_eq!(chunks, vec!["tiny"]);
    }
}
