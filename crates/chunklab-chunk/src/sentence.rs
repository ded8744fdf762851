//! Groups of whole sentences.
//!
//! A sentence ends after a run of terminators (`.`, `!`, `?`) that is followed
//! by whitespace or the end of the text. Trailing text without a terminator
//! counts as a final sentence. Sentences are trimmed and joined with a single
//! space inside each chunk.

use chunklab_core::{ChunkError, ChunkMethod};

use crate::{clamp_overlap, windows_joined, Chunker};

#[derive(Debug, Clone)]
pub struct SentenceChunker {
    count: usize,
    overlap: usize,
}

impl SentenceChunker {
    pub fn new(count: usize, overlap: usize) -> Result<Self, ChunkError> {
        if count == 0 {
            return Err(ChunkError::InvalidConfig("sentence_count must be > 0".to_string()));
        }
        Ok(Self { count, overlap: clamp_overlap(count, overlap) })
    }
}

impl Chunker for SentenceChunker {
    fn method(&self) -> ChunkMethod {
        ChunkMethod::Sentence
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        windows_joined(&sentences, self.count, self.overlap, " ")
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into trimmed, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if !is_terminator(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = iter.peek() {
            if !is_terminator(next) {
                break;
            }
            end = j + next.len_utf8();
            iter.next();
        }
        let at_boundary = iter.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            let piece = text[start..end].trim();
            if !piece.is_empty() {
                out.push(piece);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators_followed_by_space() {
        let s = split_sentences("Hello there. How are you?! Fine...   Bye");
        assert_eq!(s, vec!["Hello there.", "How are you?!", "Fine...", "Bye"]);
    }

    #[test]
    fn inner_dots_do_not_split() {
        let s = split_sentences("Version 1.5 is out. See example.com for more.");
        assert_eq!(s, vec!["Version 1.5 is out.", "See example.com for more."]);
    }

    #[test]
    fn groups_with_overlap() {
        let chunker = SentenceChunker::new(2, 1).unwrap();
        let chunks = chunker.chunk("A. B. C. D.");
        assert_eq!(chunks, vec!["A. B.", "B. C.", "C. D."]);
    }

    #[test]
    fn default_groups_of_five() {
        let text = (1..=12).map(|i| format!("Sentence {i}.")).collect::<Vec<_>>().join(" ");
        let chunks = SentenceChunker::new(5, 1).unwrap().chunk(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("Sentence 1."));
        assert!(chunks[1].starts_with("Sentence 5."));
        assert!(chunks[2].ends_with("Sentence 12."));
    }

    #[test]
    fn zero_count_is_rejected() {
        assert!(SentenceChunker::new(0, 0).is_err());
    }
}
