//! Okapi BM25 over an in-memory document set.
//!
//! ```text
//! score(D, Q) = Σ_{q ∈ unique(Q)} idf(q) · tf(q,D)·(k1+1) / (tf(q,D) + k1·(1 − b + b·|D|/avgdl))
//! idf(q)      = ln((N − df(q) + 0.5) / (df(q) + 0.5) + 1)
//! ```
//!
//! The `+1` inside the logarithm keeps `idf` positive even for terms present in
//! every document, so scores are always `>= 0`. Document frequency, average
//! length and `N` come from the documents handed to [`Bm25Index::new`].

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::tokenize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone)]
pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    doc_freqs: HashMap<String, usize>,
    avgdl: f32,
}

impl Bm25Index {
    pub fn new<S: AsRef<str>>(docs: &[S]) -> Self {
        Self::with_params(docs, Bm25Params::default())
    }

    pub fn with_params<S: AsRef<str>>(docs: &[S], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(docs.len());
        let mut doc_lens = Vec::with_capacity(docs.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            let tokens = tokenize(doc.as_ref());
            doc_lens.push(tokens.len());
            let mut tf: HashMap<String, u32> = HashMap::new();
            for t in tokens {
                *tf.entry(t).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }
        let total: usize = doc_lens.iter().sum();
        let avgdl = if docs.is_empty() { 0.0 } else { total as f32 / docs.len() as f32 };
        trace!(docs = docs.len(), terms = doc_freqs.len(), avgdl, "built bm25 index");
        Self { params, term_freqs, doc_lens, doc_freqs, avgdl }
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    pub fn idf(&self, term: &str) -> f32 {
        let n = self.len() as f32;
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// One raw score per document, in document order.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        if self.avgdl == 0.0 {
            return vec![0.0; self.len()];
        }
        let mut seen = HashSet::new();
        let terms: Vec<(String, f32)> = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .filter(|t| self.doc_freqs.contains_key(t))
            .map(|t| {
                let idf = self.idf(&t);
                (t, idf)
            })
            .collect();

        let Bm25Params { k1, b } = self.params;
        self.term_freqs
            .iter()
            .zip(&self.doc_lens)
            .map(|(tf, &len)| {
                let norm = k1 * (1.0 - b + b * len as f32 / self.avgdl);
                terms
                    .iter()
                    .filter_map(|(t, idf)| tf.get(t).map(|&f| (f as f32, idf)))
                    // an empty f32 sum is -0.0; start from +0.0 so unmatched docs tie cleanly
                    .fold(0.0, |acc, (f, idf)| acc + idf * f * (k1 + 1.0) / (f + norm))
            })
            .collect()
    }
}

/// Score every document in `docs` against `query` with default parameters.
pub fn bm25_scores<S: AsRef<str>>(query: &str, docs: &[S]) -> Vec<f32> {
    Bm25Index::new(docs).scores(query)
}
