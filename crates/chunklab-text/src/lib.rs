//! chunklab-text
//!
//! Lexical text utilities: the shared tokenizer and BM25 sparse scoring.
//! Scoring is computed over the supplied documents only; there is no
//! persistent inverted index.

pub mod bm25;
pub mod tokenize;

pub use bm25::{bm25_scores, Bm25Index, Bm25Params};
pub use tokenize::tokenize;
