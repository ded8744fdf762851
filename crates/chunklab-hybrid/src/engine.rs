use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chunklab_core::{Collection, CollectionId, EmbedError, Embedder, RetrievalMethod, SearchResult};
use chunklab_text::bm25_scores;
use chunklab_vector::dense_scores;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fusion::{fuse, normalize_sparse};

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub collection_ids: Vec<CollectionId>,
    pub methods: Vec<RetrievalMethod>,
    pub top_k: usize,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("select at least one collection")]
    NoCollections,

    #[error("select at least one retrieval method")]
    NoMethods,

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("none of the selected collections exist: {}", .0.join(", "))]
    UnknownCollections(Vec<CollectionId>),

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

impl SearchError {
    /// True for errors raised before any scoring work started.
    pub fn is_validation(&self) -> bool {
        !matches!(self, SearchError::Embedding(_))
    }
}

/// Ranks chunks of already-built collections against a free-text query.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Score every chunk of the selected collections with every selected
    /// method, then keep the best `top_k * |methods|` results overall.
    ///
    /// Ties keep insertion order: request collection order, then dense,
    /// sparse, hybrid, then chunk index. Collections built with a different
    /// embedding model than the engine's are scored by sparse only.
    pub async fn search(&self, request: &SearchRequest, collections: &[Collection]) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if request.collection_ids.is_empty() {
            return Err(SearchError::NoCollections);
        }
        if request.top_k == 0 {
            return Err(SearchError::InvalidTopK);
        }
        let methods: Vec<RetrievalMethod> =
            RetrievalMethod::ALL.into_iter().filter(|m| request.methods.contains(m)).collect();
        if methods.is_empty() {
            return Err(SearchError::NoMethods);
        }

        let targets = resolve(&request.collection_ids, collections);
        if targets.is_empty() {
            return Err(SearchError::UnknownCollections(request.collection_ids.clone()));
        }

        let query_vec = if methods.iter().any(|m| m.needs_embedding()) {
            Some(self.embedder.embed_query(query).await?)
        } else {
            None
        };

        let model = self.embedder.model_id();
        let mut results = Vec::new();
        for col in targets {
            // vectors from another model are not comparable with the query
            let comparable = col.embedding_model == model;
            if query_vec.is_some() && !comparable {
                warn!(
                    collection = %col.id,
                    built_with = %col.embedding_model,
                    query_model = model,
                    "embedding model mismatch, skipping dense and hybrid scoring"
                );
            }
            let dense = query_vec.as_ref().filter(|_| comparable).map(|q| dense_scores(q, &col.vectors));
            let sparse_raw = methods
                .iter()
                .any(|m| *m != RetrievalMethod::Dense)
                .then(|| bm25_scores(query, &col.texts()));

            for method in &methods {
                let scores = match (method, &dense, &sparse_raw) {
                    (RetrievalMethod::Dense, Some(d), _) => d.clone(),
                    (RetrievalMethod::Sparse, _, Some(s)) => normalize_sparse(s),
                    (RetrievalMethod::Hybrid, Some(d), Some(s)) => fuse(d, s),
                    _ => continue,
                };
                results.extend(col.chunks.iter().zip(scores).map(|(chunk, score)| SearchResult {
                    chunk: chunk.clone(),
                    score,
                    retrieval_method: *method,
                    collection_name: col.name.clone(),
                    collection_id: col.id.clone(),
                }));
            }
            debug!(collection = %col.id, chunks = col.chunk_count, "scored collection");
        }

        // partial_cmp treats -0.0 and 0.0 as equal, keeping ties in insertion order
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(request.top_k * methods.len());

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(query, results = results.len(), elapsed_ms, "search finished");
        Ok(SearchOutcome { results, elapsed_ms })
    }
}

/// Look up requested ids in order, dropping duplicates and unknown ids.
fn resolve<'a>(ids: &[CollectionId], collections: &'a [Collection]) -> Vec<&'a Collection> {
    let mut out: Vec<&Collection> = Vec::new();
    for id in ids {
        if out.iter().any(|c| &c.id == id) {
            continue;
        }
        match collections.iter().find(|c| &c.id == id) {
            Some(col) => out.push(col),
            None => warn!(collection = %id, "skipping unknown collection"),
        }
    }
    out
}
