//! The unit of user logic: a [`Node`] reads its task's input snapshot and
//! returns writes, explicit `Send`s, or a `Command`, normalized into a
//! single [`NodeOutput`].

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::control::{Command, Send as ControlSend};
use crate::error::GraphError;
use crate::interrupt::GraphInterrupt;
use crate::task::Task;
use crate::types::NodeKind;

/// Everything a node can hand back to the runtime in one return value.
/// An interrupt is carried here rather than as an `Err`: an interrupt is
/// control flow, not a failure, so it must not trip retry policies or
/// error-channel writers.
#[derive(Debug, Clone, Default)]
pub struct NodeOutput {
    /// Channel name -> value to write this superstep.
    pub writes: Vec<(String, Value)>,
    pub sends: Vec<ControlSend>,
    pub command: Option<Command>,
    pub interrupt: Option<GraphInterrupt>,
}

impl NodeOutput {
    pub fn write(channel: impl Into<String>, value: Value) -> Self {
        Self {
            writes: vec![(channel.into(), value)],
            ..Self::default()
        }
    }

    pub fn send(send: ControlSend) -> Self {
        Self {
            sends: vec![send],
            ..Self::default()
        }
    }

    pub fn command(command: Command) -> Self {
        Self {
            command: Some(command),
            ..Self::default()
        }
    }

    pub fn interrupt(interrupt: GraphInterrupt) -> Self {
        Self {
            interrupt: Some(interrupt),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, task: &Task) -> Result<NodeOutput, GraphError>;
}

/// Convenience adapter letting a plain async closure act as a [`Node`].
#[async_trait]
impl<F, Fut> Node for F
where
    F: Fn(FxHashMap<String, Value>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<NodeOutput, GraphError>> + Send,
{
    async fn run(&self, task: &Task) -> Result<NodeOutput, GraphError> {
        self(task.input_snapshot.clone()).await
    }
}

/// Maps compiled node names to their runtime implementation.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: FxHashMap<String, std::sync::Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, node: std::sync::Arc<dyn Node>) {
        self.nodes.insert(name.into(), node);
    }

    pub fn get(&self, node: &NodeKind) -> Option<std::sync::Arc<dyn Node>> {
        self.nodes.get(&node.encode()).cloned()
    }
}
