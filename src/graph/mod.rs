//! The graph builder and compiler: declare nodes and edges, validate
//! the result, and lower it into trigger channels the planner can schedule
//! against.

pub mod builder;
pub mod compile;
pub mod edges;

pub use builder::GraphBuilder;
pub use compile::GraphCompileError;
pub use edges::{ConditionalEdge, RouteDecision, RouterFn};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::channels::ChannelSpec;

pub const START: &str = "__start__";
pub const END: &str = "__end__";

/// A validated, lowered graph ready to run.
pub struct CompiledGraph {
    nodes: FxHashSet<String>,
    /// node name -> channel names whose advance should schedule it.
    triggers: FxHashMap<String, Vec<String>>,
    /// the ephemeral edge channels the planner/writer must create, one per
    /// plain edge.
    pub channel_specs: Vec<ChannelSpec>,
    /// from-node -> its conditional edges, consulted by the run loop after a
    /// node produces output to append resolved `Send`s.
    pub conditional: FxHashMap<String, Vec<ConditionalEdge>>,
    /// from-node -> its plain-edge successors, so the writer knows which
    /// edge channels to mark once that node's task completes.
    pub outgoing_edges: FxHashMap<String, Vec<String>>,
    /// Declared `Command::goto` destinations per node, consulted only at
    /// compile time for reachability/path-to-end validation.
    pub node_ends: FxHashMap<String, Vec<String>>,
    pub node_metadata: FxHashMap<String, FxHashMap<String, serde_json::Value>>,
    /// Nodes that should only run once no other node is schedulable in the
    /// same superstep.
    pub deferred_nodes: FxHashSet<String>,
}

impl CompiledGraph {
    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    pub fn node_triggers(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.triggers.iter()
    }

    pub fn is_deferred(&self, node: &str) -> bool {
        self.deferred_nodes.contains(node)
    }

    /// The plain-edge channel a node should write a completion marker to so
    /// its successor becomes schedulable.
    pub fn edge_channel_name(from: &str, to: &str) -> String {
        format!("edge:{from}:{to}")
    }
}

pub(crate) fn compile_graph(
    mut nodes: FxHashSet<String>,
    plain_edges: Vec<(String, String)>,
    conditional_edges: Vec<ConditionalEdge>,
    extra_channels: Vec<ChannelSpec>,
    node_ends: FxHashMap<String, Vec<String>>,
    node_metadata: FxHashMap<String, FxHashMap<String, serde_json::Value>>,
    deferred_nodes: FxHashSet<String>,
) -> Result<CompiledGraph, GraphCompileError> {
    nodes.insert(START.to_string());
    nodes.insert(END.to_string());

    for (from, to) in &plain_edges {
        if !nodes.contains(from) {
            return Err(GraphCompileError::UnknownNode { name: from.clone() });
        }
        if !nodes.contains(to) {
            return Err(GraphCompileError::UnknownNode { name: to.clone() });
        }
    }

    for edge in &conditional_edges {
        if !nodes.contains(&edge.from) {
            return Err(GraphCompileError::UnknownNode {
                name: edge.from.clone(),
            });
        }
        if let Some(path_map) = &edge.path_map {
            for target in path_map.values() {
                if !nodes.contains(target) {
                    return Err(GraphCompileError::UnknownNode {
                        name: target.clone(),
                    });
                }
            }
        }
    }

    for (node, ends) in &node_ends {
        if !nodes.contains(node) {
            return Err(GraphCompileError::UnknownNode { name: node.clone() });
        }
        for end in ends {
            if end != END && !nodes.contains(end) {
                return Err(GraphCompileError::UnknownNode { name: end.clone() });
            }
        }
    }

    check_ambiguous_routes(&conditional_edges, &nodes)?;

    let mut triggers: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut outgoing_edges: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut channel_specs = extra_channels;

    for (from, to) in &plain_edges {
        let channel_name = CompiledGraph::edge_channel_name(from, to);
        channel_specs.push(ChannelSpec::ephemeral(channel_name.clone()));
        triggers.entry(to.clone()).or_default().push(channel_name);
        outgoing_edges.entry(from.clone()).or_default().push(to.clone());
    }

    let has_entry_point = plain_edges.iter().any(|(from, _)| from == START)
        || conditional_edges.iter().any(|e| e.from == START);
    if !has_entry_point {
        return Err(GraphCompileError::MissingEntryPoint);
    }

    validate_reachability(&nodes, &plain_edges, &conditional_edges, &node_ends)?;
    validate_paths_to_end(&nodes, &plain_edges, &conditional_edges, &node_ends)?;

    let mut conditional: FxHashMap<String, Vec<ConditionalEdge>> = FxHashMap::default();
    for edge in conditional_edges {
        conditional.entry(edge.from.clone()).or_default().push(edge);
    }

    Ok(CompiledGraph {
        nodes,
        triggers,
        channel_specs,
        conditional,
        outgoing_edges,
        node_ends,
        node_metadata,
        deferred_nodes,
    })
}

fn check_ambiguous_routes(
    conditional_edges: &[ConditionalEdge],
    nodes: &FxHashSet<String>,
) -> Result<(), GraphCompileError> {
    for edge in conditional_edges {
        if let Some(path_map) = &edge.path_map {
            for (label, target) in path_map {
                // A label that resolves to a real node name which is *also*
                // reachable as a literal (unmapped) label from the same
                // router is the ambiguity the compiler rejects: the caller
                // can't tell whether `target` came from the mapping or was
                // passed straight through.
                if label != target && nodes.contains(label) && path_map.get(label) != Some(label) {
                    return Err(GraphCompileError::AmbiguousRoute {
                        from: edge.from.clone(),
                        label: label.clone(),
                        resolved: target.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn validate_reachability(
    nodes: &FxHashSet<String>,
    plain_edges: &[(String, String)],
    conditional_edges: &[ConditionalEdge],
    node_ends: &FxHashMap<String, Vec<String>>,
) -> Result<(), GraphCompileError> {
    let mut reachable: FxHashSet<String> = FxHashSet::default();
    let mut frontier = vec![START.to_string()];
    reachable.insert(START.to_string());

    while let Some(current) = frontier.pop() {
        for (from, to) in plain_edges {
            if from == &current && reachable.insert(to.clone()) {
                frontier.push(to.clone());
            }
        }
        for edge in conditional_edges {
            if edge.from == current {
                let targets: Vec<String> = match &edge.path_map {
                    Some(map) => map.values().cloned().collect(),
                    None => nodes.iter().cloned().collect(),
                };
                for target in targets {
                    if reachable.insert(target.clone()) {
                        frontier.push(target);
                    }
                }
            }
        }
        if let Some(ends) = node_ends.get(&current) {
            for end in ends {
                if end != END && reachable.insert(end.clone()) {
                    frontier.push(end.clone());
                }
            }
        }
    }

    for node in nodes {
        if !reachable.contains(node) {
            return Err(GraphCompileError::UnreachableNode { name: node.clone() });
        }
    }
    Ok(())
}

fn validate_paths_to_end(
    nodes: &FxHashSet<String>,
    plain_edges: &[(String, String)],
    conditional_edges: &[ConditionalEdge],
    node_ends: &FxHashMap<String, Vec<String>>,
) -> Result<(), GraphCompileError> {
    let mut can_reach_end: FxHashSet<String> = FxHashSet::default();
    can_reach_end.insert(END.to_string());

    let mut changed = true;
    while changed {
        changed = false;
        for (from, to) in plain_edges {
            if can_reach_end.contains(to) && can_reach_end.insert(from.clone()) {
                changed = true;
            }
        }
        for edge in conditional_edges {
            let targets_reach_end = match &edge.path_map {
                Some(map) => map.values().any(|t| can_reach_end.contains(t)),
                None => true, // an unconstrained router could target anything, including END
            };
            if targets_reach_end && can_reach_end.insert(edge.from.clone()) {
                changed = true;
            }
        }
        for (node, ends) in node_ends {
            let ends_reach_end = ends.iter().any(|e| e == END || can_reach_end.contains(e));
            if ends_reach_end && can_reach_end.insert(node.clone()) {
                changed = true;
            }
        }
    }

    for node in nodes {
        if node != END && !can_reach_end.contains(node) {
            return Err(GraphCompileError::NoPathToEnd { name: node.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_linear_graph_compiles() {
        let mut builder = GraphBuilder::new();
        builder.add_node("a").unwrap();
        builder.add_node("b").unwrap();
        builder.add_edge(START, "a");
        builder.add_edge("a", "b");
        builder.add_edge("b", END);
        let graph = builder.compile().unwrap();
        assert!(graph.contains_node("a"));
        assert!(graph
            .node_triggers()
            .any(|(node, _)| node == "b"));
    }

    #[test]
    fn an_unreachable_node_fails_compilation() {
        let mut builder = GraphBuilder::new();
        builder.add_node("a").unwrap();
        builder.add_node("orphan").unwrap();
        builder.add_edge(START, "a");
        builder.add_edge("a", END);
        let err = builder.compile().unwrap_err();
        assert_eq!(
            err,
            GraphCompileError::UnreachableNode {
                name: "orphan".into()
            }
        );
    }

    #[test]
    fn a_node_with_no_path_to_end_fails_compilation() {
        let mut builder = GraphBuilder::new();
        builder.add_node("a").unwrap();
        builder.add_node("dead_end").unwrap();
        builder.add_edge(START, "a");
        builder.add_edge("a", "dead_end");
        let err = builder.compile().unwrap_err();
        assert_eq!(
            err,
            GraphCompileError::NoPathToEnd {
                name: "dead_end".into()
            }
        );
    }

    #[test]
    fn reserved_characters_in_node_names_are_rejected() {
        let mut builder = GraphBuilder::new();
        let err = builder.add_node("a:b").unwrap_err();
        assert_eq!(err, GraphCompileError::ReservedCharacter { name: "a:b".into() });
    }
}
