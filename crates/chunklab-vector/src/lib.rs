//! chunklab-vector
//!
//! Dense similarity and the storage backends for files, collections and the
//! experiment log. Collections carry their vectors inline, so dense search is
//! a brute-force cosine scan over `Collection::vectors`.

pub mod dir_store;
pub mod experiment_log;
pub mod memory;
pub mod similarity;

pub use dir_store::DirStore;
pub use experiment_log::JsonExperimentLog;
pub use memory::MemoryStore;
pub use similarity::{cosine_similarity, dense_scores};

/// File name of the experiment log inside a store root.
pub const EXPERIMENTS_FILE: &str = "experiments.json";
