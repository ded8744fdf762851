//! Score normalization and dense/sparse fusion.
//!
//! ```text
//! sparse_norm[i] = bm25[i] / max(max(bm25), 1)
//! hybrid[i]      = 0.7 · dense[i] + 0.3 · sparse_norm[i]
//! ```
//!
//! Both arrays are indexed by chunk position within one collection.

pub const DENSE_WEIGHT: f32 = 0.7;
pub const SPARSE_WEIGHT: f32 = 0.3;

/// Map raw BM25 scores into `[0, 1]`. A corpus whose best score is below 1
/// is left unscaled.
pub fn normalize_sparse(raw: &[f32]) -> Vec<f32> {
    let max = raw.iter().copied().fold(1.0f32, f32::max);
    raw.iter().map(|s| s / max).collect()
}

pub fn hybrid_score(dense: f32, sparse_norm: f32) -> f32 {
    DENSE_WEIGHT * dense + SPARSE_WEIGHT * sparse_norm
}

/// Fuse per-chunk dense scores with raw BM25 scores of the same chunks.
pub fn fuse(dense: &[f32], sparse_raw: &[f32]) -> Vec<f32> {
    dense
        .iter()
        .zip(normalize_sparse(sparse_raw))
        .map(|(d, s)| hybrid_score(*d, s))
        .collect()
}
