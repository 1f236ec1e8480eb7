use rustc_hash::{FxHashMap, FxHashSet};

use crate::channels::ChannelSpec;
use crate::types::RESERVED_CHARS;

use super::compile::GraphCompileError;
use super::edges::{ConditionalEdge, RouterFn};
use super::CompiledGraph;

/// Builds a graph by declaring nodes, edges, and data channels, then
/// validates and lowers it into a [`CompiledGraph`] ready to run.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: FxHashSet<String>,
    plain_edges: Vec<(String, String)>,
    conditional_edges: Vec<ConditionalEdge>,
    channels: Vec<ChannelSpec>,
    next_cond_id: u32,
    /// Declared possible `Command` destinations per node, used only for
    /// compile-time reachability/path-to-end validation — a node that routes
    /// dynamically via `Command::goto` has no static edge the compiler can
    /// otherwise see.
    node_ends: FxHashMap<String, Vec<String>>,
    node_metadata: FxHashMap<String, FxHashMap<String, serde_json::Value>>,
    deferred_nodes: FxHashSet<String>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> Result<&mut Self, GraphCompileError> {
        self.add_node_with(name, NodeOptions::default())
    }

    /// Like [`GraphBuilder::add_node`], but also declares `ends`: the set of
    /// node names (or [`super::END`]) a `Command` returned from this node may
    /// target via `goto`. Declaring `ends` lets the compiler validate
    /// reachability and path-to-end for destinations that only exist as
    /// dynamic `Command` routing, never as a static edge.
    pub fn add_node_with(
        &mut self,
        name: impl Into<String>,
        options: NodeOptions,
    ) -> Result<&mut Self, GraphCompileError> {
        let name = name.into();
        if has_reserved_char(&name) {
            return Err(GraphCompileError::ReservedCharacter { name });
        }
        if !self.nodes.insert(name.clone()) {
            return Err(GraphCompileError::DuplicateNode { name });
        }
        if !options.ends.is_empty() {
            self.node_ends.insert(name.clone(), options.ends);
        }
        if !options.metadata.is_empty() {
            self.node_metadata.insert(name.clone(), options.metadata);
        }
        if options.defer {
            self.deferred_nodes.insert(name.clone());
        }
        Ok(self)
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.plain_edges.push((from.into(), to.into()));
        self
    }

    pub fn add_conditional_edges(
        &mut self,
        from: impl Into<String>,
        router: RouterFn,
        path_map: Option<FxHashMap<String, String>>,
    ) -> &mut Self {
        let cond_id = self.next_cond_id;
        self.next_cond_id += 1;
        self.conditional_edges.push(ConditionalEdge {
            from: from.into(),
            cond_id: cond_id.to_string(),
            router,
            path_map,
        });
        self
    }

    /// Declares a channel carrying real graph data (as opposed to the
    /// internal ephemeral completion channels edges generate automatically).
    pub fn add_channel(&mut self, spec: ChannelSpec) -> &mut Self {
        self.channels.push(spec);
        self
    }

    pub fn compile(self) -> Result<CompiledGraph, GraphCompileError> {
        super::compile_graph(
            self.nodes,
            self.plain_edges,
            self.conditional_edges,
            self.channels,
            self.node_ends,
            self.node_metadata,
            self.deferred_nodes,
        )
    }
}

fn has_reserved_char(name: &str) -> bool {
    name.chars().any(|c| RESERVED_CHARS.contains(&c))
}

/// Optional per-node declarations accepted by [`GraphBuilder::add_node_with`].
#[derive(Default, Clone)]
pub struct NodeOptions {
    /// Possible `Command::goto` destinations this node may route to.
    pub ends: Vec<String>,
    pub metadata: FxHashMap<String, serde_json::Value>,
    /// Marks this node as deferred: held back by the planner whenever any
    /// non-deferred node is also schedulable for the same superstep, so it
    /// only runs once nothing else is left to schedule and always sees its
    /// siblings' writes from that superstep rather than racing them.
    pub defer: bool,
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ends(mut self, ends: Vec<String>) -> Self {
        self.ends = ends;
        self
    }

    pub fn with_metadata(mut self, metadata: FxHashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn deferred(mut self) -> Self {
        self.defer = true;
        self
    }
}

