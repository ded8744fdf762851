//! Domain types shared by the chunker, the collection builder and the retrieval engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

pub type ChunkId = String;
pub type CollectionId = String;
pub type FileId = String;
pub type Meta = BTreeMap<String, String>;
pub type Embedding = Vec<f32>;

/// The chunking strategies a collection can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMethod {
    Fixed,
    Recursive,
    Token,
    Sentence,
    Semantic,
}

impl ChunkMethod {
    pub const ALL: [ChunkMethod; 5] = [
        ChunkMethod::Fixed,
        ChunkMethod::Recursive,
        ChunkMethod::Token,
        ChunkMethod::Sentence,
        ChunkMethod::Semantic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChunkMethod::Fixed => "fixed",
            ChunkMethod::Recursive => "recursive",
            ChunkMethod::Token => "token",
            ChunkMethod::Sentence => "sentence",
            ChunkMethod::Semantic => "semantic",
        }
    }

    /// Parameters used when a batch does not override this method.
    pub fn default_params(self) -> ChunkParams {
        match self {
            ChunkMethod::Fixed => ChunkParams::Fixed { chunk_size: 1000, overlap: 200 },
            ChunkMethod::Recursive => ChunkParams::Recursive { chunk_size: 1000, overlap: 200 },
            ChunkMethod::Token => ChunkParams::Token { token_count: 256, overlap: 50 },
            ChunkMethod::Sentence => ChunkParams::Sentence { sentence_count: 5, overlap: 1 },
            ChunkMethod::Semantic => ChunkParams::Semantic { similarity_threshold: 0.5 },
        }
    }
}

impl fmt::Display for ChunkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChunkMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("chunk method", s))
    }
}

/// Per-method chunking parameters.
///
/// Each variant carries only the fields its method reads, so a token window
/// can never be configured with a similarity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ChunkParams {
    Fixed { chunk_size: usize, overlap: usize },
    Recursive { chunk_size: usize, overlap: usize },
    Token { token_count: usize, overlap: usize },
    Sentence { sentence_count: usize, overlap: usize },
    Semantic { similarity_threshold: f32 },
}

impl ChunkParams {
    pub fn method(&self) -> ChunkMethod {
        match self {
            ChunkParams::Fixed { .. } => ChunkMethod::Fixed,
            ChunkParams::Recursive { .. } => ChunkMethod::Recursive,
            ChunkParams::Token { .. } => ChunkMethod::Token,
            ChunkParams::Sentence { .. } => ChunkMethod::Sentence,
            ChunkParams::Semantic { .. } => ChunkMethod::Semantic,
        }
    }
}

impl fmt::Display for ChunkParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkParams::Fixed { chunk_size, overlap } | ChunkParams::Recursive { chunk_size, overlap } => {
                write!(f, "chunk_size={chunk_size} overlap={overlap}")
            }
            ChunkParams::Token { token_count, overlap } => write!(f, "token_count={token_count} overlap={overlap}"),
            ChunkParams::Sentence { sentence_count, overlap } => {
                write!(f, "sentence_count={sentence_count} overlap={overlap}")
            }
            ChunkParams::Semantic { similarity_threshold } => write!(f, "similarity_threshold={similarity_threshold}"),
        }
    }
}

/// Parameters keyed by method for one processing batch.
///
/// The key is always derived from the variant, so a plan can never map
/// `token` to sentence parameters. Methods absent from the plan fall back to
/// [`ChunkMethod::default_params`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ChunkParams>", into = "Vec<ChunkParams>")]
pub struct ChunkPlan {
    params: BTreeMap<ChunkMethod, ChunkParams>,
}

impl ChunkPlan {
    pub fn new() -> Self { Self::default() }

    /// Insert or replace the parameters for `params.method()`.
    pub fn set(&mut self, params: ChunkParams) -> &mut Self {
        self.params.insert(params.method(), params);
        self
    }

    pub fn with(mut self, params: ChunkParams) -> Self {
        self.set(params);
        self
    }

    pub fn params_for(&self, method: ChunkMethod) -> ChunkParams {
        self.params.get(&method).copied().unwrap_or_else(|| method.default_params())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkParams> {
        self.params.values()
    }
}

impl From<Vec<ChunkParams>> for ChunkPlan {
    fn from(list: Vec<ChunkParams>) -> Self {
        list.into_iter().fold(ChunkPlan::new(), ChunkPlan::with)
    }
}

impl From<ChunkPlan> for Vec<ChunkParams> {
    fn from(plan: ChunkPlan) -> Self {
        plan.params.into_values().collect()
    }
}

/// A contiguous span of source text treated as one retrievable unit.
///
/// - `id`: `<collection id>:<index>`
/// - `index`: dense 0-based position within the owning collection
/// - `metadata`: free-form annotations (currently `char_count`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub index: usize,
    pub source_file_id: FileId,
    pub source_file_name: String,
    pub chunk_method: ChunkMethod,
    #[serde(default)]
    pub metadata: Meta,
}

/// The chunked-and-embedded output of one (file, method) processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub chunk_method: ChunkMethod,
    pub source_file_id: FileId,
    pub source_file_name: String,
    pub chunk_count: usize,
    pub params: ChunkParams,
    pub created_at: DateTime<Utc>,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<Embedding>,
    pub embedding_model: String,
}

impl Collection {
    /// `vectors[i]` pairs with `chunks[i]` and both match `chunk_count`.
    pub fn is_consistent(&self) -> bool {
        self.chunks.len() == self.chunk_count
            && self.vectors.len() == self.chunk_count
            && self.chunks.iter().enumerate().all(|(i, c)| c.index == i)
    }

    pub fn texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Csv,
    Pdf,
    Markdown,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(FileType::Text),
            "csv" => Some(FileType::Csv),
            "pdf" => Some(FileType::Pdf),
            "md" | "markdown" => Some(FileType::Markdown),
            _ => None,
        }
    }
}

/// A source document whose plain text has already been extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: FileId,
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Lifecycle of one (file, method) processing task.
///
/// Transitions only move forward: `waiting → chunking → vectorizing →
/// finished`, or into `error` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Waiting,
    Chunking,
    Vectorizing,
    Finished,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Error)
    }

    fn rank(self) -> u8 {
        match self {
            TaskState::Waiting => 0,
            TaskState::Chunking => 1,
            TaskState::Vectorizing => 2,
            TaskState::Finished | TaskState::Error => 3,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    /// Re-entering the same non-terminal state is allowed for progress ticks.
    pub fn can_advance_to(self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == TaskState::Error {
            return true;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Waiting => "waiting",
            TaskState::Chunking => "chunking",
            TaskState::Vectorizing => "vectorizing",
            TaskState::Finished => "finished",
            TaskState::Error => "error",
        };
        f.write_str(s)
    }
}

/// A user-visible error: readable message plus optional raw detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>, technical: impl Into<String>) -> Self {
        Self { message: message.into(), technical: Some(technical.into()) }
    }
}

/// Coarse cause of a task failure, used to pick the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    /// The embedding model could not be fetched or loaded.
    Connectivity,
    /// GPU / accelerator unavailable or restricted.
    Hardware,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub category: FailureCategory,
    #[serde(flatten)]
    pub info: ErrorInfo,
}

pub type TaskId = String;

/// Identifier of the task processing `file_id` with `method`.
pub fn task_id(file_id: &str, method: ChunkMethod) -> TaskId {
    format!("{file_id}_{method}")
}

/// Observable status of one processing task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub task_id: TaskId,
    pub file_id: FileId,
    pub file_name: String,
    pub method: ChunkMethod,
    pub status: TaskState,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_chunks: Vec<String>,
}

impl ProcessingStatus {
    pub fn waiting(file_id: &str, file_name: &str, method: ChunkMethod) -> Self {
        Self {
            task_id: task_id(file_id, method),
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            method,
            status: TaskState::Waiting,
            progress: 0,
            error: None,
            sample_chunks: Vec::new(),
        }
    }
}

/// Immutable audit record of one processing batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub files_processed: Vec<String>,
    pub chunk_methods: Vec<ChunkMethod>,
    pub params: ChunkPlan,
    /// Chunks produced per method, successful tasks only.
    pub chunk_counts: BTreeMap<ChunkMethod, usize>,
    pub processing_time_ms: u64,
}

/// Ranking method used by the retrieval engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Dense,
    Sparse,
    Hybrid,
}

impl RetrievalMethod {
    pub const ALL: [RetrievalMethod; 3] = [RetrievalMethod::Dense, RetrievalMethod::Sparse, RetrievalMethod::Hybrid];

    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalMethod::Dense => "dense",
            RetrievalMethod::Sparse => "sparse",
            RetrievalMethod::Hybrid => "hybrid",
        }
    }

    /// Whether scoring with this method needs the query embedding.
    pub fn needs_embedding(self) -> bool {
        matches!(self, RetrievalMethod::Dense | RetrievalMethod::Hybrid)
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RetrievalMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("retrieval method", s))
    }
}

/// One scored chunk. `score` is in `[0,1]` by construction for normalized
/// embeddings; it is not a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
    pub retrieval_method: RetrievalMethod,
    pub collection_name: String,
    pub collection_id: CollectionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_method_round_trips_through_str() {
        for m in ChunkMethod::ALL {
            assert_eq!(m.as_str().parse::<ChunkMethod>().unwrap(), m);
        }
        assert!("paragraph".parse::<ChunkMethod>().is_err());
    }

    #[test]
    fn plan_falls_back_to_defaults() {
        let plan = ChunkPlan::new().with(ChunkParams::Token { token_count: 10, overlap: 2 });
        assert_eq!(plan.params_for(ChunkMethod::Token), ChunkParams::Token { token_count: 10, overlap: 2 });
        assert_eq!(plan.params_for(ChunkMethod::Fixed), ChunkParams::Fixed { chunk_size: 1000, overlap: 200 });
    }

    #[test]
    fn plan_serializes_as_tagged_list() {
        let plan = ChunkPlan::new()
            .with(ChunkParams::Semantic { similarity_threshold: 0.5 })
            .with(ChunkParams::Fixed { chunk_size: 10, overlap: 1 });
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.starts_with("[{\"method\":\"fixed\""));
        let back: ChunkPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn task_state_never_moves_backward() {
        assert!(TaskState::Waiting.can_advance_to(TaskState::Chunking));
        assert!(TaskState::Vectorizing.can_advance_to(TaskState::Vectorizing));
        assert!(TaskState::Chunking.can_advance_to(TaskState::Error));
        assert!(!TaskState::Vectorizing.can_advance_to(TaskState::Chunking));
        assert!(!TaskState::Finished.can_advance_to(TaskState::Error));
        assert!(!TaskState::Error.can_advance_to(TaskState::Waiting));
    }

    #[test]
    fn task_id_joins_file_and_method() {
        assert_eq!(task_id("abc", ChunkMethod::Sentence), "abc_sentence");
    }
}
