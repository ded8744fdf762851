use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use chunklab_chunk::chunker_for;
use chunklab_core::{
    Chunk, ChunkMethod, ChunkParams, ChunkPlan, Collection, CollectionStore, Embedder, ErrorInfo, Experiment,
    ExperimentLog, FileId, ProcessingStatus, TaskError, TaskState, UploadedFile,
};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::board::{BoardError, TaskBoard, TaskUpdate};
use crate::failure::{self, Stage, CRITICAL_BATCH_MESSAGE};

const SAMPLE_CHUNKS: usize = 3;

/// Files and methods to process, with per-method parameters.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub file_ids: Vec<FileId>,
    pub methods: Vec<ChunkMethod>,
    pub plan: ChunkPlan,
}

/// Cooperative batch cancellation. Checked before each task starts; a task
/// already running finishes or fails normally.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Final status of every task, file-major then method order.
    pub statuses: Vec<ProcessingStatus>,
    /// Collections persisted by this batch.
    pub collections: Vec<Collection>,
    /// `None` when the batch was cancelled.
    pub experiment: Option<Experiment>,
    pub cancelled: bool,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    /// The batch itself broke down. Collections saved before the failure stay
    /// persisted and are returned here.
    #[error("{}", info.message)]
    Critical { info: ErrorInfo, collections: Vec<Collection> },
}

enum TaskFailure {
    Task(TaskError),
    Board(BoardError),
}

impl From<TaskError> for TaskFailure {
    fn from(e: TaskError) -> Self {
        TaskFailure::Task(e)
    }
}

impl From<BoardError> for TaskFailure {
    fn from(e: BoardError) -> Self {
        TaskFailure::Board(e)
    }
}

/// Turns (file, method) pairs into persisted collections.
pub struct CollectionBuilder {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn CollectionStore>,
    experiments: Arc<dyn ExperimentLog>,
    events: Option<UnboundedSender<TaskUpdate>>,
    cancel: CancelFlag,
}

impl CollectionBuilder {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn CollectionStore>,
        experiments: Arc<dyn ExperimentLog>,
    ) -> Self {
        Self { embedder, store, experiments, events: None, cancel: CancelFlag::new() }
    }

    pub fn with_events(mut self, events: UnboundedSender<TaskUpdate>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every (file, method) task in order.
    ///
    /// A failing task ends in `error` and the batch moves on. The experiment
    /// record is appended once every task is terminal and counts chunks of
    /// successful tasks only.
    pub async fn run(&self, files: &[UploadedFile], request: &ProcessRequest) -> Result<BatchOutcome, PipelineError> {
        let started = Instant::now();
        if request.file_ids.is_empty() {
            return Err(PipelineError::Validation("select at least one file".to_string()));
        }
        if request.methods.is_empty() {
            return Err(PipelineError::Validation("select at least one chunking method".to_string()));
        }
        let file_ids = dedup(&request.file_ids);
        let methods = dedup(&request.methods);

        let selected: Vec<&UploadedFile> = file_ids
            .iter()
            .filter_map(|id| {
                let found = files.iter().find(|f| &f.id == id);
                if found.is_none() {
                    warn!(file = %id, "skipping unknown file");
                }
                found
            })
            .collect();
        if selected.is_empty() {
            return Err(PipelineError::Validation("none of the selected files exist".to_string()));
        }

        let mut board = TaskBoard::new(self.events.clone());
        for file in &selected {
            for method in &methods {
                board
                    .enqueue(ProcessingStatus::waiting(&file.id, &file.name, *method))
                    .map_err(|e| critical(e.to_string(), Vec::new()))?;
            }
        }
        info!(files = selected.len(), methods = methods.len(), "processing batch");

        let mut collections = Vec::new();
        let mut chunk_counts: BTreeMap<ChunkMethod, usize> = BTreeMap::new();
        let mut cancelled = false;

        'batch: for file in &selected {
            for method in &methods {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'batch;
                }
                let task = chunklab_core::task_id(&file.id, *method);
                let params = request.plan.params_for(*method);
                match self.run_task(&mut board, &task, file, params).await {
                    Ok(collection) => {
                        *chunk_counts.entry(*method).or_insert(0) += collection.chunk_count;
                        collections.push(collection);
                    }
                    Err(TaskFailure::Task(err)) => {
                        board.fail(&task, err).map_err(|e| critical(e.to_string(), collections.clone()))?;
                    }
                    Err(TaskFailure::Board(e)) => {
                        error!(task = %task, error = %e, "task state machine violated");
                        return Err(critical(e.to_string(), collections));
                    }
                }
            }
        }

        if cancelled {
            info!(finished = collections.len(), "batch cancelled");
            return Ok(BatchOutcome { statuses: board.statuses(), collections, experiment: None, cancelled });
        }
        debug_assert!(board.all_terminal());

        let experiment = Experiment {
            id: format!("exp_{}", Utc::now().timestamp_millis()),
            timestamp: Utc::now(),
            files_processed: selected.iter().map(|f| f.name.clone()).collect(),
            chunk_methods: methods.clone(),
            params: methods.iter().map(|m| request.plan.params_for(*m)).collect::<Vec<_>>().into(),
            chunk_counts,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };
        if let Err(e) = self.experiments.append(&experiment).await {
            error!(error = %e, "failed to record experiment");
            return Err(critical(format!("ExperimentLog: {e}"), collections));
        }
        info!(
            experiment = %experiment.id,
            collections = collections.len(),
            elapsed_ms = experiment.processing_time_ms,
            "batch finished"
        );

        Ok(BatchOutcome { statuses: board.statuses(), collections, experiment: Some(experiment), cancelled })
    }

    async fn run_task(
        &self,
        board: &mut TaskBoard,
        task: &str,
        file: &UploadedFile,
        params: ChunkParams,
    ) -> Result<Collection, TaskFailure> {
        let method = params.method();

        board.advance(task, TaskState::Chunking, 20)?;
        let chunker = chunker_for(&params).map_err(|e| failure::from_chunk(&e))?;
        let texts = chunker.chunk(&file.content);
        if texts.is_empty() {
            return Err(failure::generic(Stage::Chunking, format!("{method} chunker produced no chunks ({params})")).into());
        }
        let samples = texts.iter().take(SAMPLE_CHUNKS).cloned().collect();
        board.advance_with_samples(task, TaskState::Vectorizing, 50, samples)?;

        let vectors = self.embedder.embed_batch(&texts).await.map_err(|e| failure::from_embed(&e))?;
        if vectors.len() != texts.len() {
            return Err(failure::generic(
                Stage::Vectorizing,
                format!("embedder returned {} vectors for {} chunks", vectors.len(), texts.len()),
            )
            .into());
        }
        let dim = self.embedder.dim();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(failure::generic(
                Stage::Vectorizing,
                format!("embedder returned a {}-dimensional vector, expected {dim}", bad.len()),
            )
            .into());
        }
        board.advance(task, TaskState::Vectorizing, 80)?;

        let collection = build_collection(file, params, texts, vectors, self.embedder.model_id());
        self.store.save(&collection).await.map_err(|e| failure::from_store(&e))?;
        board.advance(task, TaskState::Finished, 100)?;
        info!(task, collection = %collection.id, chunks = collection.chunk_count, "task finished");
        Ok(collection)
    }
}

fn build_collection(
    file: &UploadedFile,
    params: ChunkParams,
    texts: Vec<String>,
    vectors: Vec<Vec<f32>>,
    model: &str,
) -> Collection {
    let method = params.method();
    let created_at = Utc::now();
    let id = format!("col_{}", Uuid::new_v4().simple());
    let chunks: Vec<Chunk> = texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            id: format!("{id}:{index}"),
            metadata: BTreeMap::from([("char_count".to_string(), text.chars().count().to_string())]),
            text,
            index,
            source_file_id: file.id.clone(),
            source_file_name: file.name.clone(),
            chunk_method: method,
        })
        .collect();
    Collection {
        name: format!("{}_{}_{}", file.name, method, created_at.timestamp_millis()),
        chunk_method: method,
        source_file_id: file.id.clone(),
        source_file_name: file.name.clone(),
        chunk_count: chunks.len(),
        params,
        created_at,
        chunks,
        vectors,
        embedding_model: model.to_string(),
        id,
    }
}

fn critical(technical: String, collections: Vec<Collection>) -> PipelineError {
    PipelineError::Critical { info: ErrorInfo::new(CRITICAL_BATCH_MESSAGE, technical), collections }
}

/// Drop repeated entries, keeping first occurrences in order.
fn dedup<T: PartialEq + Clone>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup(&["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
    }

    #[test]
    fn collection_ids_and_metadata() {
        let file = UploadedFile {
            id: "f1".into(),
            name: "notes.txt".into(),
            file_type: chunklab_core::FileType::Text,
            size: 9,
            content: "héllo wörld".into(),
            uploaded_at: Utc::now(),
        };
        let col = build_collection(
            &file,
            ChunkMethod::Token.default_params(),
            vec!["héllo".into(), "wörld".into()],
            vec![vec![1.0], vec![0.0]],
            "hash:d1",
        );
        assert!(col.id.starts_with("col_"));
        assert!(col.name.starts_with("notes.txt_token_"));
        assert_eq!(col.chunks[1].id, format!("{}:1", col.id));
        assert_eq!(col.chunks[0].metadata["char_count"], "5");
        assert!(col.is_consistent());
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
