//! Applies a superstep's task outputs to channel state and persists the
//! result: group writes by destination channel, apply each channel's
//! own update rule once per superstep, then let the checkpoint own the
//! snapshot.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::channels::{Channel, ChannelError, TaggedWrite};
use crate::checkpoint::{CheckpointMetadata, CheckpointRecord, CheckpointSource, PendingInterrupt};
use crate::control::{GraphTarget, Send as ControlSend};
use crate::error::GraphError;
use crate::graph::{CompiledGraph, ConditionalEdge, RouteDecision, END};
use crate::scheduler::TaskResult;

pub struct WriteOutcome {
    pub checkpoint: CheckpointRecord,
    pub pending_sends: Vec<ControlSend>,
    pub node_errors: Vec<(String, GraphError)>,
}

/// Groups each superstep's task outputs by destination channel, in task-id
/// order (results are sorted by `task_id`, which the planner assigns
/// deterministically), and applies each channel's own update rule once.
/// `versions_seen` bookkeeping — which node has consumed which channel
/// version — is the planner's responsibility, not the writer's: the writer
/// only needs to hand back the new channel versions for the next
/// checkpoint.
///
/// Beyond a task's own declared writes, a task that completed without
/// interrupting also *routes*: its plain-edge successors get a completion
/// marker on their edge channel, and any conditional edges leaving its node
/// get their router invoked against the task's input snapshot, with the
/// resolved destination(s) turned into `Send`s for the next superstep.
pub fn apply_superstep(
    superstep: u64,
    parent_checkpoint_id: &str,
    mut channels: FxHashMap<String, Box<dyn Channel>>,
    results: Vec<TaskResult>,
    new_checkpoint_id: String,
    graph: &CompiledGraph,
    task_inputs: &FxHashMap<String, FxHashMap<String, Value>>,
) -> (FxHashMap<String, Box<dyn Channel>>, WriteOutcome) {
    let mut by_channel: FxHashMap<String, Vec<TaggedWrite>> = FxHashMap::default();
    let mut pending_sends = Vec::new();
    let mut pending_interrupts = FxHashMap::default();
    let mut node_errors = Vec::new();

    let mut ordered = results;
    ordered.sort_by(|a, b| a.task_id.cmp(&b.task_id));

    for result in ordered {
        match result.outcome {
            Ok(output) => {
                for (channel_name, value) in output.writes {
                    by_channel.entry(channel_name).or_default().push(TaggedWrite {
                        writer: result.node.clone(),
                        value,
                    });
                }
                let mut send_error = None;
                for send in &output.sends {
                    if send.node == END {
                        send_error = Some(send_to_end_error(&result.node));
                        break;
                    }
                }
                pending_sends.extend(output.sends);
                if let Some(command) = output.command {
                    // This runtime never runs as a nested subgraph, so a
                    // `Command` targeting the parent graph has nowhere to
                    // bubble up to and is fatal here, exactly as it would be
                    // at the top of any nesting chain.
                    if command.graph == GraphTarget::Parent {
                        node_errors.push((result.node.clone(), GraphError::NoParentGraph));
                        continue;
                    }
                    for (channel_name, value) in command.update {
                        by_channel.entry(channel_name).or_default().push(TaggedWrite {
                            writer: result.node.clone(),
                            value,
                        });
                    }
                    if send_error.is_none() {
                        for send in &command.goto {
                            if send.node == END {
                                send_error = Some(send_to_end_error(&result.node));
                                break;
                            }
                        }
                    }
                    pending_sends.extend(command.goto);
                }
                if let Some(err) = send_error {
                    node_errors.push((result.node.clone(), err));
                }

                if let Some(interrupt) = output.interrupt {
                    pending_interrupts.insert(
                        interrupt.id.clone(),
                        PendingInterrupt {
                            task_id: result.task_id.clone(),
                            node: result.node.clone(),
                            value: interrupt.value,
                            namespace: interrupt.namespace,
                        },
                    );
                } else if let Some(err) = route_completed_task(
                    graph,
                    &result.node,
                    task_inputs.get(&result.task_id),
                    &mut by_channel,
                    &mut pending_sends,
                ) {
                    node_errors.push((result.node.clone(), err));
                }
            }
            Err(err) => node_errors.push((result.node.clone(), err)),
        }
    }

    for (channel_name, writes) in &by_channel {
        if let Some(channel) = channels.get_mut(channel_name) {
            let _ = channel.update(writes, superstep);
        }
    }

    let mut channel_snapshots = FxHashMap::default();
    let mut channel_versions = FxHashMap::default();
    for (name, channel) in channels.iter() {
        channel_snapshots.insert(name.clone(), channel.checkpoint());
        channel_versions.insert(name.clone(), channel.version());
    }

    let checkpoint = CheckpointRecord {
        id: new_checkpoint_id,
        parent_id: Some(parent_checkpoint_id.to_string()),
        ts: chrono::Utc::now(),
        channel_snapshots,
        channel_versions,
        versions_seen: FxHashMap::default(),
        pending_sends: pending_sends.clone(),
        pending_interrupts,
        resume_values: FxHashMap::default(),
        metadata: CheckpointMetadata {
            source: Some(CheckpointSource::Loop),
            step: superstep,
            extra: FxHashMap::default(),
        },
    };

    (
        channels,
        WriteOutcome {
            checkpoint,
            pending_sends,
            node_errors,
        },
    )
}

fn send_to_end_error(node: &str) -> GraphError {
    GraphError::Channel(ChannelError::InvalidUpdate {
        name: END.to_string(),
        reason: format!("node `{node}` sent to the terminal END destination"),
    })
}

/// Fires `node`'s outgoing plain edges and resolves its conditional edges
/// (if any) against its input snapshot, once it has completed a superstep
/// without interrupting.
pub(crate) fn route_completed_task(
    graph: &CompiledGraph,
    node: &str,
    input_snapshot: Option<&FxHashMap<String, Value>>,
    by_channel: &mut FxHashMap<String, Vec<TaggedWrite>>,
    pending_sends: &mut Vec<ControlSend>,
) -> Option<GraphError> {
    if let Some(targets) = graph.outgoing_edges.get(node) {
        for to in targets {
            let channel_name = CompiledGraph::edge_channel_name(node, to);
            by_channel.entry(channel_name).or_default().push(TaggedWrite {
                writer: node.to_string(),
                value: Value::Bool(true),
            });
        }
    }

    if let Some(edges) = graph.conditional.get(node) {
        let empty = FxHashMap::default();
        let input = input_snapshot.unwrap_or(&empty);
        for edge in edges {
            match (edge.router)(input) {
                RouteDecision::Label(label) => {
                    push_resolved_label(edge, &label, pending_sends);
                }
                RouteDecision::Labels(labels) => {
                    for label in labels {
                        push_resolved_label(edge, &label, pending_sends);
                    }
                }
                RouteDecision::Sends(sends) => {
                    for send in &sends {
                        if send.node == END {
                            return Some(send_to_end_error(node));
                        }
                    }
                    pending_sends.extend(sends);
                }
            }
        }
    }
    None
}

/// Resolves one router-returned label through the edge's `path_map` (or as a
/// literal node name) and enqueues a `Send` for it, unless it resolves to
/// `END` — reaching `END` via a router label just ends that path, the same
/// as a plain edge into `END` would, rather than scheduling a task.
fn push_resolved_label(
    edge: &ConditionalEdge,
    label: &str,
    pending_sends: &mut Vec<ControlSend>,
) {
    let resolved = edge.resolve_label(label);
    if resolved != END {
        pending_sends.push(ControlSend::new(resolved, Value::Null));
    }
}
