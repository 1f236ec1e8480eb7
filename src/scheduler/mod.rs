//! Bounded-parallelism execution of one superstep's tasks, with
//! cooperative cancellation and per-task retry.

pub mod retry;

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::error::GraphError;
use crate::node::{NodeOutput, NodeRegistry};
use crate::task::Task;

pub use retry::RetryPolicy;

/// The outcome of running a single task to completion (after any retries).
pub struct TaskResult {
    pub task_id: String,
    pub node: String,
    pub outcome: Result<NodeOutput, GraphError>,
}

/// Runs a batch of tasks concurrently, honoring each task's own retry policy
/// and a shared shutdown signal. Mirrors the graceful-shutdown pattern used
/// by the event bus's broadcast workers: a `watch::Receiver<bool>` flips to
/// `true` to request cancellation, and in-flight tasks observe it both while
/// waiting out a retry backoff and while a node is running. A fatal task
/// error flips a second, superstep-local `watch` so every sibling still in
/// flight cancels too, instead of being polled to completion for no reason.
pub struct Scheduler {
    registry: Arc<NodeRegistry>,
    max_concurrency: usize,
}

impl Scheduler {
    pub fn new(registry: Arc<NodeRegistry>, max_concurrency: usize) -> Self {
        Self {
            registry,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn run_superstep(
        &self,
        tasks: Vec<Task>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<TaskResult> {
        let mut pending = tasks.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut results = Vec::new();
        let (cancel_siblings, cancel_rx) = watch::channel(false);

        for _ in 0..self.max_concurrency {
            if let Some(task) = pending.next() {
                in_flight.push(self.run_one(task, shutdown.clone(), cancel_rx.clone()));
            } else {
                break;
            }
        }

        while let Some(result) = in_flight.next().await {
            let is_fatal = result.outcome.is_err();
            results.push(result);

            if is_fatal {
                // Ask every sibling still in flight to cancel and return
                // without polling the rest of `in_flight` further: dropping
                // it here abandons those futures instead of running them to
                // completion for a result the caller is about to discard.
                let _ = cancel_siblings.send(true);
                break;
            }

            if let Some(task) = pending.next() {
                in_flight.push(self.run_one(task, shutdown.clone(), cancel_rx.clone()));
            }
        }

        results
    }

    async fn run_one(
        &self,
        task: Task,
        mut shutdown: watch::Receiver<bool>,
        mut cancel: watch::Receiver<bool>,
    ) -> TaskResult {
        let node_name = task.node.encode();
        let node = match self.registry.get(&task.node) {
            Some(node) => node,
            None => {
                return TaskResult {
                    task_id: task.id,
                    node: node_name,
                    outcome: Err(GraphError::Node {
                        node: node_name.clone(),
                        source: format!("no node registered for {node_name}").into(),
                    }),
                }
            }
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if *shutdown.borrow() || *cancel.borrow() {
                return TaskResult {
                    task_id: task.id,
                    node: node_name,
                    outcome: Err(GraphError::Cancelled),
                };
            }

            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => None,
                _ = cancel.changed() => None,
                result = node.run(&task) => Some(result),
            };

            let outcome = match outcome {
                Some(outcome) => outcome,
                None => {
                    return TaskResult {
                        task_id: task.id,
                        node: node_name,
                        outcome: Err(GraphError::Cancelled),
                    }
                }
            };

            match outcome {
                Ok(output) => {
                    // A node that finishes without interrupting must have
                    // consulted every resume value it was handed this
                    // attempt — fewer `interrupt::call` invocations than
                    // resume values means its control flow took a different
                    // path than the one that produced those values, which
                    // would silently desynchronize future interrupt ids.
                    if output.interrupt.is_none() {
                        let made = task.interrupt_calls_made() as usize;
                        let available = task.resume_values.len();
                        if made < available {
                            return TaskResult {
                                task_id: task.id,
                                node: node_name.clone(),
                                outcome: Err(GraphError::NondeterministicResume {
                                    node: node_name,
                                    expected: available,
                                    actual: made,
                                }),
                            };
                        }
                    }
                    return TaskResult {
                        task_id: task.id,
                        node: node_name,
                        outcome: Ok(output),
                    }
                }
                Err(err) if task.retry_policy.should_retry(attempt, &err) => {
                    let backoff = task.retry_policy.backoff_for(attempt);
                    tokio::select! {
                        _ = sleep(backoff) => continue,
                        _ = shutdown.changed() => {
                            return TaskResult {
                                task_id: task.id,
                                node: node_name,
                                outcome: Err(GraphError::Cancelled),
                            }
                        }
                        _ = cancel.changed() => {
                            return TaskResult {
                                task_id: task.id,
                                node: node_name,
                                outcome: Err(GraphError::Cancelled),
                            }
                        }
                    }
                }
                Err(err) => {
                    return TaskResult {
                        task_id: task.id,
                        node: node_name,
                        outcome: Err(err),
                    }
                }
            }
        }
    }
}
