//! Shared fixture nodes and helpers for the integration test suite.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::watch;

use stepgraph::error::GraphError;
use stepgraph::interrupt::{self, CallError};
use stepgraph::node::{Node, NodeOutput, NodeRegistry};
use stepgraph::task::Task;

/// Does nothing; used where a node needs to exist to satisfy graph
/// compilation but a test only cares about channel state fed externally.
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(&self, _task: &Task) -> Result<NodeOutput, GraphError> {
        Ok(NodeOutput::default())
    }
}

/// Writes a fixed value to `channel` every time it runs.
pub struct WriteNode {
    pub channel: String,
    pub value: Value,
}

#[async_trait]
impl Node for WriteNode {
    async fn run(&self, _task: &Task) -> Result<NodeOutput, GraphError> {
        Ok(NodeOutput::write(self.channel.clone(), self.value.clone()))
    }
}

/// Reads an integer off `input_channel` (defaulting to 0 if absent) and
/// writes `input + 1` to `output_channel`.
pub struct IncrementNode {
    pub input_channel: String,
    pub output_channel: String,
}

#[async_trait]
impl Node for IncrementNode {
    async fn run(&self, task: &Task) -> Result<NodeOutput, GraphError> {
        let current = task
            .input_snapshot
            .get(&self.input_channel)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(NodeOutput::write(self.output_channel.clone(), Value::from(current + 1)))
    }
}

/// Reads `input_channel`'s current value (if any) and writes it unchanged to
/// `output_channel` — used to feed a reducer channel through a real node's
/// output instead of seeding it directly from invocation input.
pub struct AppendNode {
    pub input_channel: String,
    pub output_channel: String,
}

#[async_trait]
impl Node for AppendNode {
    async fn run(&self, task: &Task) -> Result<NodeOutput, GraphError> {
        let value = task
            .input_snapshot
            .get(&self.input_channel)
            .cloned()
            .unwrap_or(Value::Null);
        Ok(NodeOutput::write(self.output_channel.clone(), value))
    }
}

/// Calls `interrupt::call` once per attempt; on resume, writes the resumed
/// value to `channel`.
pub struct ApproveNode {
    pub namespace: String,
    pub prompt: Value,
    pub channel: String,
}

#[async_trait]
impl Node for ApproveNode {
    async fn run(&self, task: &Task) -> Result<NodeOutput, GraphError> {
        match interrupt::call(task, self.namespace.clone(), self.prompt.clone()) {
            Ok(resumed) => Ok(NodeOutput::write(self.channel.clone(), resumed)),
            Err(CallError::Interrupted(output)) => Ok(output),
            Err(CallError::MissingCheckpointer) => Err(GraphError::MissingCheckpointer),
        }
    }
}

/// Calls `interrupt::call` twice in one body to collect two separate
/// approvals, writing both (in call order) to `channel` as a JSON array once
/// both are available.
pub struct DoubleApproveNode {
    pub namespace: String,
    pub channel: String,
}

#[async_trait]
impl Node for DoubleApproveNode {
    async fn run(&self, task: &Task) -> Result<NodeOutput, GraphError> {
        let first = match interrupt::call(task, self.namespace.clone(), Value::from("first?")) {
            Ok(v) => v,
            Err(CallError::Interrupted(output)) => return Ok(output),
            Err(CallError::MissingCheckpointer) => return Err(GraphError::MissingCheckpointer),
        };
        let second = match interrupt::call(task, self.namespace.clone(), Value::from("second?")) {
            Ok(v) => v,
            Err(CallError::Interrupted(output)) => return Ok(output),
            Err(CallError::MissingCheckpointer) => return Err(GraphError::MissingCheckpointer),
        };
        Ok(NodeOutput::write(self.channel.clone(), Value::Array(vec![first, second])))
    }
}

/// Writes whatever payload a `Send` carried (or `Value::Null` if this task
/// was triggered by a channel instead) to `channel`.
pub struct SendPayloadNode {
    pub channel: String,
}

#[async_trait]
impl Node for SendPayloadNode {
    async fn run(&self, task: &Task) -> Result<NodeOutput, GraphError> {
        let payload = task.send_payload.clone().unwrap_or(Value::Null);
        Ok(NodeOutput::write(self.channel.clone(), payload))
    }
}

pub fn registry(nodes: Vec<(&str, Arc<dyn Node>)>) -> Arc<NodeRegistry> {
    let mut reg = NodeRegistry::new();
    for (name, node) in nodes {
        reg.insert(name, node);
    }
    Arc::new(reg)
}

pub fn signal() -> watch::Receiver<bool> {
    // Leaked on purpose: tests only care that the channel stays open and
    // reports `false`, never that it's cleanly shut down.
    let (tx, rx) = watch::channel(false);
    std::mem::forget(tx);
    rx
}

pub fn input(pairs: Vec<(&str, Value)>) -> FxHashMap<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
