//! Task status board.
//!
//! The board is the single owner of every task's [`ProcessingStatus`] during a
//! batch. Each accepted change is published as one [`TaskUpdate`] so a UI can
//! mirror the board without sharing it.
//!
//! ```text
//! waiting ──▶ chunking ──▶ vectorizing ──▶ finished
//!    │            │              │
//!    └────────────┴──────────────┴──────▶ error (progress = 0)
//! ```

use std::collections::HashMap;

use chunklab_core::{ProcessingStatus, TaskError, TaskId, TaskState};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Snapshot of a task right after one accepted transition or progress step.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub status: ProcessingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("unknown task '{0}'")]
    UnknownTask(TaskId),

    #[error("task '{task}' cannot move from {from} to {to}")]
    IllegalTransition { task: TaskId, from: TaskState, to: TaskState },

    #[error("task '{task}' progress cannot go back from {from} to {to}")]
    ProgressRegression { task: TaskId, from: u8, to: u8 },

    #[error("task '{0}' is already on the board")]
    Duplicate(TaskId),
}

#[derive(Default)]
pub struct TaskBoard {
    tasks: HashMap<TaskId, ProcessingStatus>,
    order: Vec<TaskId>,
    events: Option<UnboundedSender<TaskUpdate>>,
}

impl TaskBoard {
    pub fn new(events: Option<UnboundedSender<TaskUpdate>>) -> Self {
        Self { tasks: HashMap::new(), order: Vec::new(), events }
    }

    /// Add a task in the `waiting` state.
    pub fn enqueue(&mut self, status: ProcessingStatus) -> Result<(), BoardError> {
        if self.tasks.contains_key(&status.task_id) {
            return Err(BoardError::Duplicate(status.task_id));
        }
        let status = ProcessingStatus { status: TaskState::Waiting, progress: 0, error: None, ..status };
        self.order.push(status.task_id.clone());
        self.tasks.insert(status.task_id.clone(), status.clone());
        self.publish(status);
        Ok(())
    }

    pub fn advance(&mut self, task: &str, state: TaskState, progress: u8) -> Result<(), BoardError> {
        self.apply(task, state, progress, |_| {})
    }

    /// Advance and attach sample chunks for display.
    pub fn advance_with_samples(
        &mut self,
        task: &str,
        state: TaskState,
        progress: u8,
        samples: Vec<String>,
    ) -> Result<(), BoardError> {
        self.apply(task, state, progress, move |s| s.sample_chunks = samples)
    }

    /// Move a task to `error`, resetting its progress.
    pub fn fail(&mut self, task: &str, error: TaskError) -> Result<(), BoardError> {
        let current = self.get(task).ok_or_else(|| BoardError::UnknownTask(task.to_string()))?;
        if !current.status.can_advance_to(TaskState::Error) {
            return Err(BoardError::IllegalTransition {
                task: task.to_string(),
                from: current.status,
                to: TaskState::Error,
            });
        }
        warn!(task, category = ?error.category, message = %error.info.message, "task failed");
        let updated = self.update(task, |s| {
            s.status = TaskState::Error;
            s.progress = 0;
            s.error = Some(error);
        })?;
        self.publish(updated);
        Ok(())
    }

    pub fn get(&self, task: &str) -> Option<&ProcessingStatus> {
        self.tasks.get(task)
    }

    /// All statuses in enqueue order.
    pub fn statuses(&self) -> Vec<ProcessingStatus> {
        self.order.iter().filter_map(|id| self.tasks.get(id)).cloned().collect()
    }

    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|s| s.status.is_terminal())
    }

    fn apply(
        &mut self,
        task: &str,
        state: TaskState,
        progress: u8,
        extra: impl FnOnce(&mut ProcessingStatus),
    ) -> Result<(), BoardError> {
        let current = self.get(task).ok_or_else(|| BoardError::UnknownTask(task.to_string()))?;
        if state == TaskState::Error || !current.status.can_advance_to(state) {
            return Err(BoardError::IllegalTransition { task: task.to_string(), from: current.status, to: state });
        }
        if progress < current.progress {
            return Err(BoardError::ProgressRegression { task: task.to_string(), from: current.progress, to: progress });
        }
        let progress = progress.min(100);
        let updated = self.update(task, |s| {
            s.status = state;
            s.progress = progress;
            extra(s);
        })?;
        debug!(task, status = %state, progress, "task progress");
        self.publish(updated);
        Ok(())
    }

    fn update(&mut self, task: &str, f: impl FnOnce(&mut ProcessingStatus)) -> Result<ProcessingStatus, BoardError> {
        let entry = self.tasks.get_mut(task).ok_or_else(|| BoardError::UnknownTask(task.to_string()))?;
        f(entry);
        Ok(entry.clone())
    }

    fn publish(&self, status: ProcessingStatus) {
        if let Some(tx) = &self.events {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(TaskUpdate { status });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunklab_core::{ChunkMethod, ErrorInfo, FailureCategory};
    use tokio::sync::mpsc;

    fn board_with_task() -> (TaskBoard, mpsc::UnboundedReceiver<TaskUpdate>, TaskId) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut board = TaskBoard::new(Some(tx));
        let status = ProcessingStatus::waiting("f1", "a.txt", ChunkMethod::Fixed);
        let id = status.task_id.clone();
        board.enqueue(status).unwrap();
        (board, rx, id)
    }

    #[test]
    fn happy_path_emits_one_event_per_step() {
        let (mut board, mut rx, id) = board_with_task();
        board.advance(&id, TaskState::Chunking, 20).unwrap();
        board.advance_with_samples(&id, TaskState::Vectorizing, 50, vec!["s".into()]).unwrap();
        board.advance(&id, TaskState::Vectorizing, 80).unwrap();
        board.advance(&id, TaskState::Finished, 100).unwrap();

        let mut seen = Vec::new();
        while let Ok(update) = rx.try_recv() {
            seen.push((update.status.status, update.status.progress));
        }
        assert_eq!(
            seen,
            vec![
                (TaskState::Waiting, 0),
                (TaskState::Chunking, 20),
                (TaskState::Vectorizing, 50),
                (TaskState::Vectorizing, 80),
                (TaskState::Finished, 100),
            ]
        );
        assert_eq!(board.get(&id).unwrap().sample_chunks, vec!["s".to_string()]);
        assert!(board.all_terminal());
    }

    #[test]
    fn rejects_backward_moves() {
        let (mut board, _rx, id) = board_with_task();
        board.advance(&id, TaskState::Vectorizing, 50).unwrap();
        assert!(matches!(
            board.advance(&id, TaskState::Chunking, 60),
            Err(BoardError::IllegalTransition { .. })
        ));
        assert!(matches!(
            board.advance(&id, TaskState::Vectorizing, 40),
            Err(BoardError::ProgressRegression { .. })
        ));
    }

    #[test]
    fn error_resets_progress_and_is_terminal() {
        let (mut board, _rx, id) = board_with_task();
        board.advance(&id, TaskState::Chunking, 20).unwrap();
        let err = TaskError { category: FailureCategory::Generic, info: ErrorInfo::new("boom", "detail") };
        board.fail(&id, err).unwrap();

        let status = board.get(&id).unwrap();
        assert_eq!(status.status, TaskState::Error);
        assert_eq!(status.progress, 0);
        assert!(board.advance(&id, TaskState::Finished, 100).is_err());
        assert!(board.advance(&id, TaskState::Error, 0).is_err());
    }

    #[test]
    fn unknown_and_duplicate_tasks() {
        let (mut board, _rx, id) = board_with_task();
        assert_eq!(board.advance("nope", TaskState::Chunking, 20), Err(BoardError::UnknownTask("nope".into())));
        let dup = ProcessingStatus::waiting("f1", "a.txt", ChunkMethod::Fixed);
        assert_eq!(board.enqueue(dup), Err(BoardError::Duplicate(id)));
    }
}
