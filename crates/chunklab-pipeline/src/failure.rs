//! Turning task faults into user-facing errors.
//!
//! Classification is structural: the embedder reports an [`EmbedErrorKind`]
//! and the category follows from it. The raw error text is kept separately as
//! the technical detail.

use std::fmt;

use chunklab_core::{ChunkError, EmbedError, EmbedErrorKind, ErrorInfo, FailureCategory, StoreError, TaskError};

pub const MODEL_LOAD_MESSAGE: &str = "Failed to load local model. Check your internet connection.";
pub const HARDWARE_MESSAGE: &str = "GPU acceleration might be restricted on this machine. Try the CPU device.";
pub const CRITICAL_BATCH_MESSAGE: &str = "A critical failure occurred during the processing batch.";

/// Pipeline step a task failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Chunking,
    Vectorizing,
    Saving,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Chunking => "chunking",
            Stage::Vectorizing => "vectorizing",
            Stage::Saving => "saving",
        })
    }
}

pub fn category_for(kind: EmbedErrorKind) -> FailureCategory {
    match kind {
        EmbedErrorKind::ModelLoad => FailureCategory::Connectivity,
        EmbedErrorKind::Acceleration => FailureCategory::Hardware,
        EmbedErrorKind::Inference | EmbedErrorKind::Shape => FailureCategory::Generic,
    }
}

pub fn generic(stage: Stage, technical: impl Into<String>) -> TaskError {
    let message = match stage {
        Stage::Saving => "An error occurred while saving this collection.".to_string(),
        _ => format!("An error occurred while {stage} this document."),
    };
    TaskError { category: FailureCategory::Generic, info: ErrorInfo::new(message, technical) }
}

pub fn from_embed(err: &EmbedError) -> TaskError {
    let category = category_for(err.kind);
    let info = match category {
        FailureCategory::Connectivity => ErrorInfo::new(MODEL_LOAD_MESSAGE, err.technical()),
        FailureCategory::Hardware => ErrorInfo::new(HARDWARE_MESSAGE, err.technical()),
        FailureCategory::Generic => return generic(Stage::Vectorizing, err.technical()),
    };
    TaskError { category, info }
}

pub fn from_chunk(err: &ChunkError) -> TaskError {
    generic(Stage::Chunking, format!("ChunkError: {err}"))
}

pub fn from_store(err: &StoreError) -> TaskError {
    generic(Stage::Saving, format!("StoreError: {err}"))
}
