//! Windows of whitespace-delimited tokens.
//!
//! Tokens are maximal runs of non-whitespace characters. Each chunk joins
//! `token_count` tokens with a single space, so original spacing and line
//! breaks are not preserved.

use chunklab_core::{ChunkError, ChunkMethod};

use crate::{clamp_overlap, windows_joined, Chunker};

#[derive(Debug, Clone)]
pub struct TokenChunker {
    count: usize,
    overlap: usize,
}

impl TokenChunker {
    pub fn new(count: usize, overlap: usize) -> Result<Self, ChunkError> {
        if count == 0 {
            return Err(ChunkError::InvalidConfig("token_count must be > 0".to_string()));
        }
        Ok(Self { count, overlap: clamp_overlap(count, overlap) })
    }
}

impl Chunker for TokenChunker {
    fn method(&self) -> ChunkMethod {
        ChunkMethod::Token
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        windows_joined(&tokens, self.count, self.overlap, " ")
    }
}
