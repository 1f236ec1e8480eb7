//! # stepgraph: a Pregel-style stateful graph execution runtime
//!
//! Graphs run as a sequence of supersteps: the planner decides which nodes
//! are schedulable, the scheduler runs them concurrently with retry, and
//! the writer applies their outputs to versioned channels and persists a
//! checkpoint — repeating until the planner finds nothing left to run.
//!
//! ## Core concepts
//!
//! - **Channels** ([`channels`]) — named, versioned storage cells with one
//!   of five update rules (last-value, reducer, ephemeral, topic, barrier).
//! - **Graph** ([`graph`]) — declare nodes and edges, compile into trigger
//!   channels with [`graph::GraphBuilder`].
//! - **Checkpoint** ([`checkpoint`]) — durable snapshots between supersteps,
//!   written through the [`checkpoint::Saver`] trait.
//! - **Planner/Scheduler/Writer** ([`planner`], [`scheduler`], [`writer`]) —
//!   the superstep loop itself, tied together by [`run::GraphRuntime`].
//! - **Interrupt/Resume** ([`interrupt`]) — pausing a run mid-superstep and
//!   continuing it later from a checkpoint.
//! - **Store** ([`store`]) — cross-thread key/value storage, independent of
//!   checkpointing.
//!
//! ## Quick start
//!
//! ```
//! use stepgraph::graph::GraphBuilder;
//! use stepgraph::channels::ChannelSpec;
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_node("greet").unwrap();
//! builder.add_edge(stepgraph::graph::START, "greet");
//! builder.add_edge("greet", stepgraph::graph::END);
//! builder.add_channel(ChannelSpec::last_value("greeting"));
//! let graph = builder.compile().unwrap();
//! assert!(graph.contains_node("greet"));
//! ```
//!
//! ## Module guide
//!
//! - [`types`] - node identity and channel versions
//! - [`error`] - the top-level error type
//! - [`channels`] - versioned channel storage
//! - [`checkpoint`] - durable checkpoint records and storage
//! - [`task`] - one node's scheduled unit of work
//! - [`planner`] - decides what runs next
//! - [`scheduler`] - runs tasks concurrently with retry
//! - [`writer`] - applies task outputs to channels
//! - [`interrupt`] - pausing and resuming a run
//! - [`graph`] - the graph builder and compiler
//! - [`store`] - cross-thread key/value storage
//! - [`config`] - per-run configuration
//! - [`node`] - the node trait nodes implement
//! - [`control`] - `Send` and `Command` control-flow values
//! - [`run`] - top-level orchestration
//! - [`event_bus`] - broadcasting execution events to sinks
//! - [`telemetry`] - rendering events for sinks

pub mod channels;
pub mod checkpoint;
pub mod config;
pub mod control;
pub mod error;
pub mod event_bus;
pub mod graph;
pub mod interrupt;
pub mod node;
pub mod planner;
pub mod run;
pub mod scheduler;
pub mod store;
pub mod task;
pub mod telemetry;
pub mod types;
pub mod writer;

pub use error::GraphError;
