//! Control-flow values a node can return alongside its channel writes:
//! explicit fan-out (`Send`) and commands that redirect execution, including
//! up into a parent graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An explicit instruction to run `node` next superstep with `payload` as its
/// triggering input, bypassing the graph's static edges. Multiple `Send`s
/// from the same or different tasks in one superstep fan out in parallel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Send {
    pub node: String,
    pub payload: Value,
}

impl Send {
    pub fn new(node: impl Into<String>, payload: Value) -> Self {
        Self {
            node: node.into(),
            payload,
        }
    }
}

/// Where a `Command` should take effect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GraphTarget {
    /// The graph the emitting node belongs to (default).
    #[default]
    Current,
    /// The graph that invoked this one as a subgraph node. Resolving this at
    /// the top level (no parent) is a [`crate::error::GraphError::NoParentGraph`].
    Parent,
}

/// A node's combined instruction to update state and redirect control flow.
/// `graph: GraphTarget::Parent` lets a subgraph bubble a routing decision up
/// to its caller instead of resolving it locally.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Command {
    pub graph: GraphTarget,
    pub update: Vec<(String, Value)>,
    pub goto: Vec<Send>,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_update(mut self, channel: impl Into<String>, value: Value) -> Self {
        self.update.push((channel.into(), value));
        self
    }

    pub fn with_goto(mut self, send: Send) -> Self {
        self.goto.push(send);
        self
    }

    pub fn to_parent(mut self) -> Self {
        self.graph = GraphTarget::Parent;
        self
    }
}
