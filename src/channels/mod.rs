//! Channel: a named storage cell with a declared update rule and a
//! monotonically increasing version.
//!
//! Five variants are supported — [`last_value::LastValueChannel`],
//! [`reducer::ReducerChannel`], [`ephemeral::EphemeralChannel`],
//! [`topic::TopicChannel`], [`barrier::BarrierChannel`] — all behind the
//! single [`Channel`] trait object so the planner, writer, and checkpoint
//! machinery never need to know which variant they're holding.

pub mod barrier;
pub mod ephemeral;
pub mod error;
pub mod last_value;
pub mod reducer;
pub mod spec;
pub mod topic;

pub use barrier::BarrierChannel;
pub use ephemeral::EphemeralChannel;
pub use error::ChannelError;
pub use last_value::LastValueChannel;
pub use reducer::ReducerChannel;
pub use spec::{ChannelKind, ChannelSpec, ReduceFn};
pub use topic::TopicChannel;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Version;

/// One write landing on a channel during a superstep, tagged with the name
/// of the task/node that produced it. The writer id is what lets a barrier
/// channel track which of its declared writers has fired, and is also the
/// tie-breaker the writer uses to apply writes in deterministic
/// task-id order rather than completion order.
#[derive(Debug, Clone)]
pub struct TaggedWrite {
    pub writer: String,
    pub value: Value,
}

/// Serializable snapshot of one channel's mutable state, used both for
/// checkpointing and for rehydrating a fresh [`Channel`] object when a run
/// resumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelSnapshot {
    LastValue {
        value: Option<Value>,
        version: Version,
    },
    Reducer {
        value: Value,
        available: bool,
        version: Version,
    },
    Ephemeral {
        value: Option<Value>,
        version: Version,
    },
    Topic {
        accumulated: Vec<Value>,
        version: Version,
    },
    Barrier {
        satisfied: Vec<String>,
        value: Option<Value>,
        version: Version,
    },
}

/// Uniform interface over all five channel variants.
pub trait Channel: Send + Sync + std::fmt::Debug {
    /// Apply an ordered batch of writes from the superstep that just
    /// completed. `superstep` is the number of the superstep that produced
    /// these writes (used by reducer channels to build a dotted version
    /// under multi-writer fan-in). Returns `true` iff the channel's
    /// observable value changed and its version should be bumped by the
    /// caller's bookkeeping (the channel itself always updates its own
    /// `version()` when it returns `true`).
    fn update(&mut self, writes: &[TaggedWrite], superstep: u64) -> Result<bool, ChannelError>;

    /// Read the current value. Topic channels return the full accumulated
    /// list for the prior superstep as a JSON array.
    fn get(&self) -> Result<Value, ChannelError>;

    fn is_available(&self) -> bool;

    fn version(&self) -> Version;

    fn checkpoint(&self) -> ChannelSnapshot;

    fn restore(&mut self, snapshot: ChannelSnapshot);

    fn name(&self) -> &str;
}

/// Builds a fresh, empty [`Channel`] from its static spec.
pub fn new_channel(spec: &ChannelSpec) -> Box<dyn Channel> {
    match &spec.kind {
        ChannelKind::LastValue => Box::new(LastValueChannel::new(spec.name.clone())),
        ChannelKind::Reducer { reduce, default } => Box::new(ReducerChannel::new(
            spec.name.clone(),
            reduce.clone(),
            default.clone(),
        )),
        ChannelKind::Ephemeral => Box::new(EphemeralChannel::new(spec.name.clone())),
        ChannelKind::Topic { dedupe } => Box::new(TopicChannel::new(spec.name.clone(), *dedupe)),
        ChannelKind::Barrier { writers } => {
            Box::new(BarrierChannel::new(spec.name.clone(), writers.clone()))
        }
    }
}
