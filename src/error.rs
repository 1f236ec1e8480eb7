//! Unified error taxonomy for the runtime.
//!
//! Each subsystem defines its own error enum close to where it is raised;
//! this module folds them into one top-level [`GraphError`] that callers of
//! [`crate::run`] actually see. Interrupts are *not* part of this enum —
//! they are a distinct, non-error control-flow signal (see
//! [`crate::interrupt`]).

use miette::Diagnostic;
use thiserror::Error;

use crate::channels::ChannelError;
use crate::checkpoint::SaverError;
use crate::graph::GraphCompileError;
use crate::store::StoreError;

/// Top-level error returned by the scheduler/runner to the caller of a run.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// Read of a channel that has never been written and was not restored
    /// from a checkpoint.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Channel(#[from] ChannelError),

    /// Misconfiguration caught at graph-compile time.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] GraphCompileError),

    /// Durable checkpoint storage failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Saver(#[from] SaverError),

    /// Store backend failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    /// More than `recursion_limit` supersteps ran without the graph
    /// terminating. The last checkpoint before this error is preserved.
    #[error("recursion limit ({limit}) exceeded after {supersteps} supersteps")]
    #[diagnostic(
        code(stepgraph::run::recursion_limit),
        help("Raise RunConfig::recursion_limit if more supersteps are genuinely expected, \
              or check for a node that never reaches an End write.")
    )]
    RecursionLimit { limit: u32, supersteps: u32 },

    /// `interrupt()` was called without a configured checkpoint saver.
    #[error("interrupt() requires a configured checkpoint saver")]
    #[diagnostic(
        code(stepgraph::run::missing_checkpointer),
        help("Attach a Saver via RunConfig/GraphRunner before calling interrupt() from a node.")
    )]
    MissingCheckpointer,

    /// A node returned a `Command` targeting the parent graph, but this run
    /// has no parent to bubble up to.
    #[error("Command targeted the parent graph, but this run has no parent")]
    #[diagnostic(code(stepgraph::run::no_parent))]
    NoParentGraph,

    /// A node's resume-value replay didn't match its interrupt-call count;
    /// indicates the node body is not deterministic across resumes.
    #[error(
        "node `{node}` issued {actual} interrupt calls on resume but only {expected} resume \
         values were available — the node body must be deterministic across resumes"
    )]
    #[diagnostic(code(stepgraph::run::nondeterministic_resume))]
    NondeterministicResume {
        node: String,
        expected: usize,
        actual: usize,
    },

    /// A transient external failure exhausted its retry budget.
    #[error("task `{task_id}` failed after {attempts} attempts: {message}")]
    #[diagnostic(code(stepgraph::run::retries_exhausted))]
    RetriesExhausted {
        task_id: String,
        attempts: u32,
        message: String,
    },

    /// A non-retriable external failure; cancels sibling tasks in the
    /// superstep and propagates.
    #[error("fatal external failure in task `{task_id}`: {message}")]
    #[diagnostic(code(stepgraph::run::fatal_external))]
    FatalExternal { task_id: String, message: String },

    /// The run was cancelled via its `signal` before completing.
    #[error("run cancelled")]
    #[diagnostic(code(stepgraph::run::cancelled))]
    Cancelled,

    /// A node body returned an error of its own.
    #[error("node `{node}` failed: {source}")]
    #[diagnostic(code(stepgraph::run::node))]
    Node {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Classifies an error for the default retry predicate: HTTP-style 4xx
/// status codes other than 408 (timeout) and 429 (rate limit) are treated
/// as non-retriable by default; everything else is retriable.
pub fn default_is_retriable(err: &GraphError) -> bool {
    match err {
        GraphError::FatalExternal { .. } => false,
        GraphError::RetriesExhausted { .. } => false,
        GraphError::Cancelled => false,
        GraphError::MissingCheckpointer => false,
        _ => true,
    }
}

/// Extracts an HTTP-style status code from a `GraphError::Node` source, if
/// the underlying error carries one. Used by [`default_is_retriable`]-style
/// predicates supplied by callers who know their node bodies make HTTP
/// calls; the core retry predicate above does not assume this shape.
pub fn node_status_code(err: &GraphError) -> Option<u16> {
    if let GraphError::Node { source, .. } = err {
        let msg = source.to_string();
        // Best-effort extraction; node bodies that care about status codes
        // should prefer RetriableExternal/FatalExternal directly.
        msg.split_whitespace()
            .find_map(|tok| tok.parse::<u16>().ok().filter(|c| (100..600).contains(c)))
    } else {
        None
    }
}
