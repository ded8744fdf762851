//! Paragraph merging by lexical similarity.
//!
//! Text is split into paragraphs on blank lines. Adjacent paragraphs are
//! merged into the running chunk while the overlap coefficient between the
//! chunk's token set and the next paragraph's token set is at least
//! `similarity_threshold`:
//!
//! ```text
//! overlap(A, B) = |A ∩ B| / min(|A|, |B|)      (0 when either set is empty)
//! ```
//!
//! A threshold of `0.0` merges everything into one chunk; `1.0` merges only
//! paragraphs whose vocabulary is contained in the running chunk's.

use std::collections::HashSet;

use chunklab_core::{ChunkError, ChunkMethod};
use chunklab_text::tokenize;

use crate::Chunker;

const PARAGRAPH_SEP: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct SemanticChunker {
    threshold: f32,
}

impl SemanticChunker {
    pub fn new(similarity_threshold: f32) -> Result<Self, ChunkError> {
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(ChunkError::InvalidConfig(format!(
                "similarity_threshold must be within [0, 1], got {similarity_threshold}"
            )));
        }
        Ok(Self { threshold: similarity_threshold })
    }
}

impl Chunker for SemanticChunker {
    fn method(&self) -> ChunkMethod {
        ChunkMethod::Semantic
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut paragraphs = paragraphs(text).into_iter();
        let Some(first) = paragraphs.next() else {
            return out;
        };
        let mut current = first.to_string();
        let mut vocab = token_set(first);
        for para in paragraphs {
            let next = token_set(para);
            if overlap_coefficient(&vocab, &next) >= self.threshold {
                current.push_str(PARAGRAPH_SEP);
                current.push_str(para);
                vocab.extend(next);
            } else {
                out.push(std::mem::replace(&mut current, para.to_string()));
                vocab = next;
            }
        }
        out.push(current);
        out
    }
}

/// Overlap coefficient between the token sets of `a` and `b`.
pub fn token_overlap(a: &str, b: &str) -> f32 {
    overlap_coefficient(&token_set(a), &token_set(b))
}

fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

fn overlap_coefficient(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / smaller as f32
}

/// Trimmed paragraphs separated by one or more whitespace-only lines.
fn paragraphs(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut open: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if line.trim().is_empty() {
            if let Some(start) = open.take() {
                out.push(text[start..end].trim());
            }
        } else {
            open.get_or_insert(line_start);
            end = offset;
        }
    }
    if let Some(start) = open {
        out.push(text[start..end].trim());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Rust ownership rules.\n\nOwnership in Rust prevents bugs.\n \nBananas are yellow fruit.";

    #[test]
    fn splits_on_blank_lines() {
        assert_eq!(
            paragraphs(DOC),
            vec!["Rust ownership rules.", "Ownership in Rust prevents bugs.", "Bananas are yellow fruit."]
        );
        assert_eq!(paragraphs("one\ntwo"), vec!["one\ntwo"]);
    }

    #[test]
    fn merges_related_paragraphs() {
        let chunks = SemanticChunker::new(0.5).unwrap().chunk(DOC);
        assert_eq!(
            chunks,
            vec!["Rust ownership rules.\n\nOwnership in Rust prevents bugs.", "Bananas are yellow fruit."]
        );
    }

    #[test]
    fn threshold_extremes() {
        assert_eq!(SemanticChunker::new(0.0).unwrap().chunk(DOC).len(), 1);
        assert_eq!(SemanticChunker::new(1.0).unwrap().chunk(DOC).len(), 3);
    }

    #[test]
    fn overlap_coefficient_values() {
        assert!((token_overlap("a b c", "b c d e") - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(token_overlap("", "anything"), 0.0);
        assert_eq!(token_overlap("Same words", "same WORDS"), 1.0);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        assert!(SemanticChunker::new(1.5).is_err());
        assert!(SemanticChunker::new(-0.1).is_err());
        assert!(SemanticChunker::new(f32::NAN).is_err());
    }
}
