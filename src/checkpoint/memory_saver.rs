use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::record::{CheckpointRecord, PendingWrite};
use super::saver::{CheckpointTuple, ListFilter, Saver, SaverError};

use async_trait::async_trait;

#[derive(Default)]
struct ThreadHistory {
    /// Checkpoints in write order, per namespace. Most recent is last.
    by_namespace: FxHashMap<String, Vec<CheckpointRecord>>,
    /// Writes buffered since the last checkpoint, per namespace, keyed by
    /// `(task_id, index)` for idempotent re-application.
    pending: FxHashMap<String, FxHashMap<(String, u32), PendingWrite>>,
}

/// An in-process [`Saver`] backed by a `parking_lot::Mutex`-guarded map.
/// Keeps the full checkpoint history per thread rather than only the latest,
/// so `list`/time-travel and crash-resumption tests don't need a real
/// database.
#[derive(Default)]
pub struct MemorySaver {
    threads: Mutex<FxHashMap<String, ThreadHistory>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Saver for MemorySaver {
    async fn put(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        record: CheckpointRecord,
    ) -> Result<(), SaverError> {
        let mut threads = self.threads.lock();
        let history = threads.entry(thread_id.to_string()).or_default();
        let namespace = history.by_namespace.entry(checkpoint_ns.to_string()).or_default();
        if namespace.iter().any(|existing| existing.id == record.id) {
            return Err(SaverError::Conflict {
                thread_id: thread_id.to_string(),
                checkpoint_id: record.id,
            });
        }
        namespace.push(record);
        // A fresh checkpoint supersedes the writes that led up to it.
        history.pending.remove(checkpoint_ns);
        Ok(())
    }

    async fn put_writes(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: &str,
        writes: Vec<PendingWrite>,
    ) -> Result<(), SaverError> {
        let mut threads = self.threads.lock();
        let history = threads.entry(thread_id.to_string()).or_default();
        let namespace_exists = history
            .by_namespace
            .get(checkpoint_ns)
            .map(|checkpoints| checkpoints.iter().any(|c| c.id == checkpoint_id))
            .unwrap_or(false);
        if !namespace_exists {
            return Err(SaverError::NotFound {
                thread_id: thread_id.to_string(),
                checkpoint_ns: checkpoint_ns.to_string(),
            });
        }
        let slot = history.pending.entry(checkpoint_ns.to_string()).or_default();
        for write in writes {
            slot.entry((write.task_id.clone(), write.index)).or_insert(write);
        }
        Ok(())
    }

    async fn get_tuple(
        &self,
        thread_id: &str,
        checkpoint_ns: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<CheckpointTuple, SaverError> {
        let threads = self.threads.lock();
        let history = threads.get(thread_id).ok_or_else(|| SaverError::NotFound {
            thread_id: thread_id.to_string(),
            checkpoint_ns: checkpoint_ns.to_string(),
        })?;
        let namespace = history
            .by_namespace
            .get(checkpoint_ns)
            .filter(|checkpoints| !checkpoints.is_empty())
            .ok_or_else(|| SaverError::NotFound {
                thread_id: thread_id.to_string(),
                checkpoint_ns: checkpoint_ns.to_string(),
            })?;

        let checkpoint = match checkpoint_id {
            Some(id) => namespace
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| SaverError::NotFound {
                    thread_id: thread_id.to_string(),
                    checkpoint_ns: checkpoint_ns.to_string(),
                })?,
            None => namespace.last().cloned().expect("checked non-empty above"),
        };

        let pending_writes = history
            .pending
            .get(checkpoint_ns)
            .map(|slot| slot.values().cloned().collect())
            .unwrap_or_default();

        Ok(CheckpointTuple {
            checkpoint,
            pending_writes,
        })
    }

    async fn list(&self, filter: ListFilter) -> Result<Vec<CheckpointRecord>, SaverError> {
        let threads = self.threads.lock();
        let Some(history) = threads.get(&filter.thread_id) else {
            return Ok(Vec::new());
        };

        let mut out: Vec<CheckpointRecord> = match &filter.checkpoint_ns {
            Some(ns) => history
                .by_namespace
                .get(ns)
                .cloned()
                .unwrap_or_default(),
            None => history
                .by_namespace
                .values()
                .flat_map(|checkpoints| checkpoints.iter().cloned())
                .collect(),
        };

        out.sort_by(|a, b| b.ts.cmp(&a.ts));

        if let Some(before) = &filter.before {
            out.retain(|c| c.id.as_str() < before.as_str());
        }
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), SaverError> {
        self.threads.lock().remove(thread_id);
        Ok(())
    }
}
