use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channels::ChannelSnapshot;
use crate::control::Send as ControlSend;
use crate::types::Version;

/// Why a checkpoint was written, carried in its metadata for `list` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    /// The initial checkpoint created when a run starts.
    Input,
    /// A checkpoint written at the end of an ordinary superstep.
    Loop,
    /// A checkpoint written after an external state update (e.g. a resume
    /// value injected between runs).
    Update,
    /// A checkpoint branched from an earlier one (time travel / forking).
    Fork,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: Option<CheckpointSource>,
    pub step: u64,
    pub extra: FxHashMap<String, Value>,
}

/// An immutable snapshot of the graph's full channel state between
/// supersteps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub ts: DateTime<Utc>,
    pub channel_snapshots: FxHashMap<String, ChannelSnapshot>,
    pub channel_versions: FxHashMap<String, Version>,
    pub versions_seen: FxHashMap<String, FxHashMap<String, Version>>,
    pub pending_sends: Vec<ControlSend>,
    /// Interrupts raised during the superstep that produced this
    /// checkpoint, keyed by interrupt id, not yet resumed.
    pub pending_interrupts: FxHashMap<String, PendingInterrupt>,
    /// Every resume value supplied so far this run, keyed by interrupt id,
    /// carried forward checkpoint to checkpoint so a node that interrupts
    /// more than once across separate resumes sees all its prior answers,
    /// not just the latest.
    pub resume_values: FxHashMap<String, Value>,
    pub metadata: CheckpointMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInterrupt {
    pub task_id: String,
    pub node: String,
    pub value: Value,
    pub namespace: String,
}

impl CheckpointRecord {
    pub fn channel_values(&self) -> FxHashMap<String, Value> {
        self.channel_snapshots
            .iter()
            .filter_map(|(name, snap)| snapshot_value(snap).map(|v| (name.clone(), v)))
            .collect()
    }
}

fn snapshot_value(snap: &ChannelSnapshot) -> Option<Value> {
    match snap {
        ChannelSnapshot::LastValue { value, .. } => value.clone(),
        ChannelSnapshot::Reducer { value, available, .. } => {
            if *available {
                Some(value.clone())
            } else {
                None
            }
        }
        ChannelSnapshot::Ephemeral { value, .. } => value.clone(),
        ChannelSnapshot::Topic { accumulated, .. } => {
            if accumulated.is_empty() {
                None
            } else {
                Some(Value::Array(accumulated.clone()))
            }
        }
        ChannelSnapshot::Barrier { value, .. } => value.clone(),
    }
}

/// A write buffered durably between checkpoints so that a crash after a task
/// ran but before its superstep's checkpoint commits does not lose work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingWrite {
    pub task_id: String,
    pub channel_name: String,
    pub writer: String,
    pub value: Value,
    pub index: u32,
}
