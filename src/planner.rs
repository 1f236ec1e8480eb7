//! Decides which nodes are schedulable for the next superstep: which
//! channels changed since a node's triggers last fired, what input snapshot
//! each resulting task should see, and draining any pending `Send`s.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::channels::Channel;
use crate::control::Send as ControlSend;
use crate::graph::CompiledGraph;
use crate::scheduler::RetryPolicy;
use crate::task::Task;
use crate::types::{NodeKind, Version};

/// Tracks, per node, the version last observed on each of its trigger
/// channels — the planner schedules a node only when at least one trigger
/// has advanced past what that node has already consumed.
#[derive(Debug, Clone, Default)]
pub struct VersionsSeen {
    pub by_node: FxHashMap<String, FxHashMap<String, Version>>,
}

impl VersionsSeen {
    pub fn record(&mut self, node: &str, channel: &str, version: Version) {
        self.by_node
            .entry(node.to_string())
            .or_default()
            .insert(channel.to_string(), version);
    }

    fn seen(&self, node: &str, channel: &str) -> Option<&Version> {
        self.by_node.get(node).and_then(|m| m.get(channel))
    }
}

pub struct Planner<'a> {
    pub graph: &'a CompiledGraph,
    pub default_retry_policy: RetryPolicy,
    /// Whether the run planning these tasks has a checkpoint saver
    /// configured; threaded onto every `Task` so `crate::interrupt::call` can
    /// refuse to raise an interrupt that could never be resumed.
    has_checkpointer: bool,
}

impl<'a> Planner<'a> {
    pub fn new(graph: &'a CompiledGraph, has_checkpointer: bool) -> Self {
        Self {
            graph,
            default_retry_policy: RetryPolicy::default(),
            has_checkpointer,
        }
    }

    /// Plans the next superstep. `channels` is the live channel state after
    /// the previous superstep's writes were applied; `pending_sends` are
    /// `Send`s collected from that superstep's node outputs.
    pub fn plan(
        &self,
        checkpoint_id: &str,
        channels: &FxHashMap<String, Box<dyn Channel>>,
        versions_seen: &VersionsSeen,
        pending_sends: Vec<ControlSend>,
        resume_values: &FxHashMap<String, Value>,
    ) -> Vec<Task> {
        let mut tasks = Vec::new();

        for send in pending_sends {
            let node = NodeKind::decode(&send.node);
            let input_snapshot = self.snapshot_for(channels);
            let id = Task::deterministic_id(checkpoint_id, &node, &[]);
            let resume = Task::resume_values_for(&id, resume_values);
            tasks.push(Task::new(
                checkpoint_id,
                node,
                input_snapshot,
                Vec::new(),
                Some(send.payload),
                self.default_retry_policy.clone(),
                resume,
                self.has_checkpointer,
            ));
        }

        for (node_name, triggers) in self.graph.node_triggers() {
            // __end__ is a sentinel, not a runnable node: reaching it just
            // means this path through the graph is finished, so it never
            // gets a task of its own.
            if node_name == crate::graph::END {
                continue;
            }

            let fired: Vec<String> = triggers
                .iter()
                .filter(|channel_name| {
                    channels
                        .get(*channel_name)
                        .map(|ch| {
                            ch.is_available()
                                && versions_seen.seen(node_name, channel_name) != Some(&ch.version())
                        })
                        .unwrap_or(false)
                })
                .cloned()
                .collect();

            if fired.is_empty() {
                continue;
            }

            let input_snapshot = self.snapshot_for(channels);
            let node = NodeKind::decode(node_name);
            let id = Task::deterministic_id(checkpoint_id, &node, &fired);
            let resume = Task::resume_values_for(&id, resume_values);
            tasks.push(Task::new(
                checkpoint_id,
                node,
                input_snapshot,
                fired,
                None,
                self.default_retry_policy.clone(),
                resume,
                self.has_checkpointer,
            ));
        }

        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        self.hold_back_deferred(tasks)
    }

    /// A deferred node only runs once no other node is schedulable in the
    /// same superstep, so it always sees every sibling's writes from that
    /// superstep rather than racing them. A deferred node's triggers are
    /// left unrecorded when it's held back, so it's reconsidered on the next
    /// superstep exactly as if it hadn't fired yet.
    fn hold_back_deferred(&self, tasks: Vec<Task>) -> Vec<Task> {
        let has_non_deferred = tasks
            .iter()
            .any(|task| !self.graph.is_deferred(&task.node.encode()));
        if !has_non_deferred {
            return tasks;
        }
        tasks
            .into_iter()
            .filter(|task| !self.graph.is_deferred(&task.node.encode()))
            .collect()
    }

    fn snapshot_for(&self, channels: &FxHashMap<String, Box<dyn Channel>>) -> FxHashMap<String, Value> {
        channels
            .iter()
            .filter_map(|(name, ch)| ch.get().ok().map(|v| (name.clone(), v)))
            .collect()
    }
}
