//! Top-level orchestration: wires the planner, scheduler, and writer into
//! the full superstep loop and exposes the public entry points.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tokio::sync::watch;

use crate::channels::{new_channel, Channel};
use crate::checkpoint::{CheckpointIdGenerator, CheckpointSource, Saver};
use crate::config::RunConfig;
use crate::control::Send as ControlSend;
use crate::error::GraphError;
use crate::graph::CompiledGraph;
use crate::node::NodeRegistry;
use crate::planner::{Planner, VersionsSeen};
use crate::scheduler::Scheduler;
use crate::writer::{apply_superstep, route_completed_task};

/// A compiled graph bound to its node implementations and checkpoint
/// storage, ready to invoke.
pub struct GraphRuntime {
    graph: CompiledGraph,
    registry: Arc<NodeRegistry>,
    /// Absent only when constructed via `without_checkpointer`. A run with no
    /// saver executes entirely in memory within one `invoke` call (no
    /// cross-invocation continuation, no `resume`), and any node that calls
    /// `crate::interrupt::call` fails with `GraphError::MissingCheckpointer`
    /// instead of parking.
    saver: Option<Arc<dyn Saver>>,
    scheduler: Scheduler,
    id_generator: CheckpointIdGenerator,
}

/// Which side of a node's execution `RunConfig::interrupt_before` /
/// `interrupt_after` paused the run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PausePhase {
    Before,
    After,
}

/// What a completed or paused invocation returns.
pub enum RunOutcome {
    /// The graph ran to completion (the planner produced no more tasks).
    Done(FxHashMap<String, Value>),
    /// A node interrupted; the run is parked at `checkpoint_id` and can be
    /// resumed later by supplying a value for `interrupt_id`.
    Interrupted {
        checkpoint_id: String,
        interrupt_id: String,
        value: Value,
    },
    /// `RunConfig::interrupt_before`/`interrupt_after` matched one or more
    /// nodes in this superstep; the run is parked at `checkpoint_id` for
    /// external approval. Unlike `Interrupted`, there is no resume value to
    /// supply — calling `invoke` again on the same thread continues it.
    Paused {
        checkpoint_id: String,
        nodes: Vec<String>,
        phase: PausePhase,
    },
}

/// Matches a configured `interrupt_before`/`interrupt_after` set against a
/// node name; the sentinel `"*"` matches every node.
fn matches_interrupt_set(set: &[String], node: &str) -> bool {
    set.iter().any(|n| n == "*" || n == node)
}

impl GraphRuntime {
    pub fn new(
        graph: CompiledGraph,
        registry: Arc<NodeRegistry>,
        saver: Arc<dyn Saver>,
        max_concurrency: usize,
    ) -> Self {
        Self::with_saver(graph, registry, Some(saver), max_concurrency)
    }

    /// Builds a runtime with no checkpoint saver: a run executes entirely in
    /// memory within one `invoke` call and never persists between them.
    /// `resume()` always fails with `GraphError::MissingCheckpointer`, and any
    /// node that calls `crate::interrupt::call` does too, since neither has a
    /// checkpoint to park against.
    pub fn without_checkpointer(graph: CompiledGraph, registry: Arc<NodeRegistry>, max_concurrency: usize) -> Self {
        Self::with_saver(graph, registry, None, max_concurrency)
    }

    fn with_saver(
        graph: CompiledGraph,
        registry: Arc<NodeRegistry>,
        saver: Option<Arc<dyn Saver>>,
        max_concurrency: usize,
    ) -> Self {
        let scheduler = Scheduler::new(registry.clone(), max_concurrency);
        Self {
            graph,
            registry,
            saver,
            scheduler,
            id_generator: CheckpointIdGenerator::new(),
        }
    }

    /// Starts a thread, or continues one that already has a checkpoint: a
    /// second `invoke` against the same `(thread_id, checkpoint_ns)` restores
    /// channel state from the latest checkpoint rather than starting over, so
    /// a reducer channel fed across two separate invocations accumulates
    /// exactly as it would across two supersteps of one invocation.
    pub async fn invoke(
        &self,
        initial_input: FxHashMap<String, Value>,
        config: RunConfig,
    ) -> Result<RunOutcome, GraphError> {
        let existing = match &self.saver {
            Some(saver) => saver
                .get_tuple(&config.thread_id, &config.checkpoint_ns, config.checkpoint_id.as_deref())
                .await
                .ok(),
            None => None,
        };
        let is_fresh_start = existing.is_none();

        let (mut channels, versions_seen, restored_pending_sends, resume_values) = match existing {
            Some(tuple) => {
                let channels: FxHashMap<String, Box<dyn Channel>> = self
                    .graph
                    .channel_specs
                    .iter()
                    .map(|spec| {
                        let mut channel = new_channel(spec);
                        if let Some(snapshot) = tuple.checkpoint.channel_snapshots.get(&spec.name) {
                            channel.restore(snapshot.clone());
                        }
                        (spec.name.clone(), channel)
                    })
                    .collect();
                (
                    channels,
                    VersionsSeen {
                        by_node: tuple.checkpoint.versions_seen,
                    },
                    tuple.checkpoint.pending_sends,
                    tuple.checkpoint.resume_values,
                )
            }
            None => {
                let channels: FxHashMap<String, Box<dyn Channel>> = self
                    .graph
                    .channel_specs
                    .iter()
                    .map(|spec| (spec.name.clone(), new_channel(spec)))
                    .collect();
                (channels, VersionsSeen::default(), Vec::new(), FxHashMap::default())
            }
        };

        // A continuing thread might still have frontier work left over from
        // an earlier `invoke` that paused mid-run (`interrupt_before`/
        // `interrupt_after`) rather than reaching completion. Probe the
        // restored state with the planner, with no new input applied yet, to
        // tell that apart from a thread that has genuinely quiesced: only a
        // quiesced thread (or a brand-new one) should have `START`'s edges
        // fired for this call's input.
        let has_pending_frontier = if is_fresh_start {
            false
        } else {
            let probe_checkpoint_id = self.id_generator.generate();
            !Planner::new(&self.graph, self.saver.is_some())
                .plan(
                    &probe_checkpoint_id,
                    &channels,
                    &versions_seen,
                    restored_pending_sends.clone(),
                    &resume_values,
                )
                .is_empty()
        };

        let mut pending_sends = restored_pending_sends;

        if !has_pending_frontier {
            // Neither a fresh thread nor one that has quiesced (run to
            // completion on an earlier `invoke`) has a completed task to
            // route from on this call, so the entry point's plain edges and
            // conditional edges (both registered against the `START`
            // sentinel) are fired here instead of from the writer, against
            // whatever channel state this invocation starts from (empty for
            // a fresh thread, restored for a quiesced one). Re-firing them
            // on a quiesced thread bumps the entry node's trigger channel
            // past what `versions_seen` already recorded for it, so the
            // entry superstep runs again for this call's new input instead
            // of being silently skipped as already-seen.
            let mut by_channel: FxHashMap<String, Vec<crate::channels::TaggedWrite>> = FxHashMap::default();
            let mut entry_sends = Vec::new();
            if let Some(err) = route_completed_task(
                &self.graph,
                crate::graph::START,
                Some(&initial_input),
                &mut by_channel,
                &mut entry_sends,
            ) {
                return Err(err);
            }
            for (channel_name, writes) in &by_channel {
                if let Some(channel) = channels.get_mut(channel_name) {
                    let _ = channel.update(writes, 0);
                }
            }
            pending_sends.extend(entry_sends);
        }

        let checkpoint_id = self.id_generator.generate();

        self.run_loop(
            channels_seed(&mut channels, initial_input),
            config,
            checkpoint_id,
            versions_seen,
            pending_sends,
            resume_values,
            is_fresh_start,
        )
        .await
    }

    /// Supplies `resume_value` for the interrupt identified by
    /// `interrupt_id` and re-drives the run from the checkpoint that raised
    /// it. The interrupted task is replanned with the exact same
    /// deterministic id it had originally — its triggers were deliberately
    /// left unrecorded in `versions_seen` when that checkpoint was written —
    /// so `crate::interrupt::call` finds the newly supplied value waiting
    /// for it at the same call site.
    pub async fn resume(
        &self,
        interrupt_id: String,
        resume_value: Value,
        config: RunConfig,
    ) -> Result<RunOutcome, GraphError> {
        let saver = self.saver.as_ref().ok_or(GraphError::MissingCheckpointer)?;
        let tuple = saver
            .get_tuple(&config.thread_id, &config.checkpoint_ns, config.checkpoint_id.as_deref())
            .await?;

        let channels: FxHashMap<String, Box<dyn Channel>> = self
            .graph
            .channel_specs
            .iter()
            .map(|spec| {
                let mut channel = new_channel(spec);
                if let Some(snapshot) = tuple.checkpoint.channel_snapshots.get(&spec.name) {
                    channel.restore(snapshot.clone());
                }
                (spec.name.clone(), channel)
            })
            .collect();

        let mut resume_values = tuple.checkpoint.resume_values.clone();
        resume_values.insert(interrupt_id, resume_value);

        let versions_seen = VersionsSeen {
            by_node: tuple.checkpoint.versions_seen.clone(),
        };

        // The interrupted task was planned against the checkpoint *before*
        // the superstep that raised it, not the one that recorded the
        // interrupt itself: resuming must hand the planner that same parent
        // id back so it recomputes the identical task id.
        let replan_checkpoint_id = tuple.checkpoint.parent_id.clone().unwrap_or(tuple.checkpoint.id);

        self.run_loop(
            channels,
            config,
            replan_checkpoint_id,
            versions_seen,
            tuple.checkpoint.pending_sends,
            resume_values,
            false,
        )
        .await
    }

    async fn run_loop(
        &self,
        mut channels: FxHashMap<String, Box<dyn Channel>>,
        config: RunConfig,
        mut checkpoint_id: String,
        mut versions_seen: VersionsSeen,
        mut pending_sends: Vec<ControlSend>,
        resume_values: FxHashMap<String, Value>,
        is_fresh_start: bool,
    ) -> Result<RunOutcome, GraphError> {
        let mut superstep: u64 = 0;

        loop {
            if config.is_cancelled() {
                return Err(GraphError::Cancelled);
            }
            if superstep as u32 >= config.recursion_limit {
                return Err(GraphError::RecursionLimit {
                    limit: config.recursion_limit,
                    supersteps: superstep as u32,
                });
            }

            let planner = Planner::new(&self.graph, self.saver.is_some());
            let tasks = planner.plan(
                &checkpoint_id,
                &channels,
                &versions_seen,
                std::mem::take(&mut pending_sends),
                &resume_values,
            );

            if tasks.is_empty() {
                let values = channels
                    .iter()
                    .filter_map(|(name, ch)| ch.get().ok().map(|v| (name.clone(), v)))
                    .collect();
                return Ok(RunOutcome::Done(values));
            }

            let mut task_inputs: FxHashMap<String, FxHashMap<String, Value>> = FxHashMap::default();
            let mut task_meta: Vec<(String, String, Vec<String>)> = Vec::new();
            for task in &tasks {
                task_inputs.insert(task.id.clone(), task.input_snapshot.clone());
                task_meta.push((task.id.clone(), task.node.encode(), task.triggers.clone()));
            }

            // `interrupt_before` pauses ahead of execution: nothing has run
            // yet and no checkpoint changed, so the next `invoke` on this
            // thread replans the exact same tasks from the same persisted
            // checkpoint.
            if !config.interrupt_before.is_empty() {
                let mut before_nodes: Vec<String> = task_meta
                    .iter()
                    .map(|(_, node, _)| node.clone())
                    .filter(|node| matches_interrupt_set(&config.interrupt_before, node))
                    .collect();
                before_nodes.sort();
                before_nodes.dedup();
                if !before_nodes.is_empty() {
                    return Ok(RunOutcome::Paused {
                        checkpoint_id: checkpoint_id.clone(),
                        nodes: before_nodes,
                        phase: PausePhase::Before,
                    });
                }
            }

            let mut results = self.scheduler.run_superstep(tasks, config.signal.clone()).await;

            if let Some(idx) = results.iter().position(|r| r.outcome.is_err()) {
                let failed = results.remove(idx);
                return Err(failed.outcome.unwrap_err());
            }

            let new_checkpoint_id = self.id_generator.generate();
            let (new_channels, mut outcome) = apply_superstep(
                superstep,
                &checkpoint_id,
                std::mem::take(&mut channels),
                results,
                new_checkpoint_id.clone(),
                &self.graph,
                &task_inputs,
            );
            channels = new_channels;

            if let Some((_, err)) = outcome.node_errors.into_iter().next() {
                return Err(err);
            }

            // A task that interrupted must stay "unseen" so replanning (on
            // the next loop iteration, or after a later `resume()`) derives
            // the same deterministic task id and lands back at the same
            // call site.
            let interrupted_task_ids: FxHashSet<String> = outcome
                .checkpoint
                .pending_interrupts
                .values()
                .map(|pi| pi.task_id.clone())
                .collect();
            for (task_id, node_name, triggers) in &task_meta {
                if interrupted_task_ids.contains(task_id) {
                    continue;
                }
                for trigger in triggers {
                    if let Some(channel) = channels.get(trigger) {
                        versions_seen.record(node_name, trigger, channel.version());
                    }
                }
            }
            outcome.checkpoint.versions_seen = versions_seen.by_node.clone();
            outcome.checkpoint.resume_values = resume_values.clone();
            if is_fresh_start && superstep == 0 {
                outcome.checkpoint.metadata.source = Some(CheckpointSource::Input);
            }

            if let Some((interrupt_id, interrupt)) = outcome.checkpoint.pending_interrupts.iter().next() {
                let interrupt_id = interrupt_id.clone();
                let value = interrupt.value.clone();
                if let Some(saver) = &self.saver {
                    saver
                        .put(&config.thread_id, &config.checkpoint_ns, outcome.checkpoint)
                        .await?;
                }
                return Ok(RunOutcome::Interrupted {
                    checkpoint_id: new_checkpoint_id,
                    interrupt_id,
                    value,
                });
            }

            if let Some(saver) = &self.saver {
                saver
                    .put(&config.thread_id, &config.checkpoint_ns, outcome.checkpoint)
                    .await?;
            }

            // `interrupt_after` pauses once a matching node's superstep has
            // already committed; the checkpoint is already durable, so the
            // next `invoke` simply continues the loop from here.
            if !config.interrupt_after.is_empty() {
                let mut after_nodes: Vec<String> = task_meta
                    .iter()
                    .map(|(_, node, _)| node.clone())
                    .filter(|node| matches_interrupt_set(&config.interrupt_after, node))
                    .collect();
                after_nodes.sort();
                after_nodes.dedup();
                if !after_nodes.is_empty() {
                    return Ok(RunOutcome::Paused {
                        checkpoint_id: new_checkpoint_id,
                        nodes: after_nodes,
                        phase: PausePhase::After,
                    });
                }
            }

            pending_sends = outcome.pending_sends;
            checkpoint_id = new_checkpoint_id;
            superstep += 1;
        }
    }
}

fn channels_seed(
    channels: &mut FxHashMap<String, Box<dyn Channel>>,
    initial_input: FxHashMap<String, Value>,
) -> FxHashMap<String, Box<dyn Channel>> {
    for (name, value) in initial_input {
        if let Some(channel) = channels.get_mut(&name) {
            let _ = channel.update(
                &[crate::channels::TaggedWrite {
                    writer: crate::graph::START.to_string(),
                    value,
                }],
                0,
            );
        }
    }
    std::mem::take(channels)
}
