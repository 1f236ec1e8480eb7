use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum GraphCompileError {
    #[error("node {name:?} is used in an edge but was never added")]
    #[diagnostic(code(stepgraph::graph::unknown_node))]
    UnknownNode { name: String },

    #[error("node {name:?} was added more than once")]
    #[diagnostic(code(stepgraph::graph::duplicate_node))]
    DuplicateNode { name: String },

    #[error("node {name:?} uses a reserved character (':' or '|')")]
    #[diagnostic(code(stepgraph::graph::reserved_character))]
    ReservedCharacter { name: String },

    #[error("no edge from __start__: the graph has no entry point")]
    #[diagnostic(code(stepgraph::graph::missing_entry_point))]
    MissingEntryPoint,

    #[error("node {name:?} is not reachable from the start node")]
    #[diagnostic(code(stepgraph::graph::unreachable_node))]
    UnreachableNode { name: String },

    #[error("node {name:?} has no path to __end__")]
    #[diagnostic(code(stepgraph::graph::no_path_to_end))]
    NoPathToEnd { name: String },

    #[error(
        "route label {label:?} on node {from:?} resolves to {resolved:?}, which collides with an explicit Send target of the same name"
    )]
    #[diagnostic(
        code(stepgraph::graph::ambiguous_route),
        help("rename the conditional edge's path_map target or the node a Send targets directly")
    )]
    AmbiguousRoute {
        from: String,
        label: String,
        resolved: String,
    },
}
