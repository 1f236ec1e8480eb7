//! A task is one node's scheduled unit of work for a superstep: a
//! resolved input snapshot, the trigger channels that caused it to run, and
//! the retry policy it should run under.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::{FxHashMap, FxHasher};
use serde_json::Value;

use crate::scheduler::retry::RetryPolicy;
use crate::types::NodeKind;

#[derive(Debug)]
pub struct Task {
    pub id: String,
    pub node: NodeKind,
    /// The channel values visible to the node when it runs, resolved by the
    /// planner from the checkpoint ahead of this superstep.
    pub input_snapshot: FxHashMap<String, Value>,
    /// Names of the channels whose writes caused this task to be scheduled.
    pub triggers: Vec<String>,
    /// Set when this task was scheduled by an explicit `Send` rather than by
    /// a channel trigger; carries the payload the `Send` specified.
    pub send_payload: Option<Value>,
    pub retry_policy: RetryPolicy,
    /// Resume values carried forward from an earlier interrupt/resume cycle
    /// for this exact task id, keyed by interrupt id. Populated by the
    /// planner from the checkpoint's cumulative resume map; read by
    /// `crate::interrupt::call`.
    pub resume_values: FxHashMap<String, Value>,
    /// Whether this run has a checkpoint saver configured. `crate::interrupt::call`
    /// checks this before raising an interrupt, since a raised interrupt can
    /// only ever be resumed from a persisted checkpoint.
    pub has_checkpointer: bool,
    /// How many times `crate::interrupt::call` has been invoked against this
    /// task so far this attempt, so repeated calls within one node body get
    /// distinct interrupt ids.
    interrupt_counter: AtomicU32,
}

impl Clone for Task {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            node: self.node.clone(),
            input_snapshot: self.input_snapshot.clone(),
            triggers: self.triggers.clone(),
            send_payload: self.send_payload.clone(),
            retry_policy: self.retry_policy.clone(),
            resume_values: self.resume_values.clone(),
            has_checkpointer: self.has_checkpointer,
            interrupt_counter: AtomicU32::new(self.interrupt_counter.load(Ordering::SeqCst)),
        }
    }
}

impl Task {
    /// Deterministic id: a fresh `FxHasher` (process-local, not
    /// cryptographic, but that's all determinism across a single run
    /// requires) over the checkpoint id, node name, and sorted trigger
    /// names, so planning the same checkpoint twice always assigns the same
    /// task ids.
    pub fn deterministic_id(checkpoint_id: &str, node: &NodeKind, triggers: &[String]) -> String {
        let mut sorted_triggers: Vec<&str> = triggers.iter().map(String::as_str).collect();
        sorted_triggers.sort_unstable();

        let mut hasher = FxHasher::default();
        checkpoint_id.hash(&mut hasher);
        node.encode().hash(&mut hasher);
        for trigger in &sorted_triggers {
            trigger.hash(&mut hasher);
        }
        format!("task-{:016x}", hasher.finish())
    }

    pub fn new(
        checkpoint_id: &str,
        node: NodeKind,
        input_snapshot: FxHashMap<String, Value>,
        triggers: Vec<String>,
        send_payload: Option<Value>,
        retry_policy: RetryPolicy,
        resume_values: FxHashMap<String, Value>,
        has_checkpointer: bool,
    ) -> Self {
        let id = Self::deterministic_id(checkpoint_id, &node, &triggers);
        Self {
            id,
            node,
            input_snapshot,
            triggers,
            send_payload,
            retry_policy,
            resume_values,
            has_checkpointer,
            interrupt_counter: AtomicU32::new(0),
        }
    }

    /// Slices a run's cumulative, interrupt-id-keyed resume map down to the
    /// entries belonging to one task, by the `"{task_id}:"` prefix every
    /// interrupt id derived from that task carries.
    pub fn resume_values_for(task_id: &str, all: &FxHashMap<String, Value>) -> FxHashMap<String, Value> {
        let prefix = format!("{task_id}:");
        all.iter()
            .filter(|(id, _)| id.starts_with(&prefix))
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    /// Returns this call site's interrupt counter and advances it, so a node
    /// body that calls `crate::interrupt::call` more than once gets a
    /// distinct id each time.
    pub fn next_interrupt_counter(&self) -> u32 {
        self.interrupt_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// How many times this task has called `crate::interrupt::call` so far,
    /// used to check that a completed (non-interrupting) run consumed
    /// exactly as many resume values as it was given.
    pub fn interrupt_calls_made(&self) -> u32 {
        self.interrupt_counter.load(Ordering::SeqCst)
    }
}
