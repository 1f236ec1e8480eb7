use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use super::record::{CheckpointRecord, PendingWrite};

#[derive(Debug, Error, Diagnostic, Clone)]
pub enum SaverError {
    #[error("no checkpoint found for thread {thread_id:?} namespace {checkpoint_ns:?}")]
    #[diagnostic(code(stepgraph::checkpoint::not_found))]
    NotFound {
        thread_id: String,
        checkpoint_ns: String,
    },

    #[error("checkpoint {checkpoint_id} already exists for thread {thread_id}")]
    #[diagnostic(code(stepgraph::checkpoint::conflict))]
    Conflict {
        thread_id: String,
        checkpoint_id: String,
    },

    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(stepgraph::checkpoint::backend))]
    Backend { message: String },
}

/// A checkpoint plus the pending writes buffered after it, as returned by
/// [`Saver::get_tuple`].
#[derive(Debug, Clone)]
pub struct CheckpointTuple {
    pub checkpoint: CheckpointRecord,
    pub pending_writes: Vec<PendingWrite>,
}

/// Filters accepted by [`Saver::list`]; all present fields must match.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub thread_id: String,
    pub checkpoint_ns: Option<String>,
    pub before: Option<String>,
    pub limit: Option<usize>,
}

/// Durable storage for checkpoints and the writes buffered between them.
/// Implementations must make `put_writes` idempotent per
/// `(checkpoint_id, task_id, index)` so a retried task after a crash cannot
/// double-apply its writes.
#[async_trait]
pub trait Saver: Send + Sync {
    async fn put(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        record: CheckpointRecord,
    ) -> Result<(), SaverError>;

    async fn put_writes(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: &str,
        writes: Vec<PendingWrite>,
    ) -> Result<(), SaverError>;

    async fn get_tuple(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<CheckpointTuple, SaverError>;

    async fn list(&self, filter: ListFilter) -> Result<Vec<CheckpointRecord>, SaverError>;

    async fn delete_thread(&self, thread_id: &str) -> Result<(), SaverError>;
}
