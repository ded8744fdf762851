//! chunklab-hybrid
//!
//! Multi-method retrieval over built collections: dense cosine, sparse BM25,
//! and their weighted fusion.

pub mod engine;
pub mod fusion;

pub use engine::{RetrievalEngine, SearchError, SearchOutcome, SearchRequest};
pub use fusion::{fuse, hybrid_score, normalize_sparse, DENSE_WEIGHT, SPARSE_WEIGHT};
