//! chunklab-pipeline
//!
//! The collection builder (file × method batches with per-task status and
//! failure isolation) and the [`Library`] that owns application state.

pub mod board;
pub mod builder;
pub mod failure;
pub mod library;

pub use board::{BoardError, TaskBoard, TaskUpdate};
pub use builder::{BatchOutcome, CancelFlag, CollectionBuilder, PipelineError, ProcessRequest};
pub use library::{Library, LibraryError, Stores};
