//! A node built with `NodeOptions::deferred()` is held back by the planner
//! until no other node is schedulable in the same superstep.

mod common;

use std::sync::Arc;

use stepgraph::channels::ChannelSpec;
use stepgraph::checkpoint::MemorySaver;
use stepgraph::config::RunConfig;
use stepgraph::graph::builder::NodeOptions;
use stepgraph::graph::{GraphBuilder, END, START};
use stepgraph::node::Node;
use stepgraph::run::{GraphRuntime, RunOutcome};

use common::{input, registry, signal, IncrementNode, WriteNode};

fn build_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("worker").unwrap();
    builder
        .add_node_with("gate", NodeOptions::new().deferred())
        .unwrap();
    builder.add_edge(START, "worker");
    builder.add_edge(START, "gate");
    builder.add_edge("worker", END);
    builder.add_edge("gate", END);
    builder.add_channel(ChannelSpec::last_value("worker_seen"));
    builder.add_channel(ChannelSpec::last_value("gate_saw"));
    builder.compile().unwrap()
}

#[tokio::test]
async fn a_deferred_node_waits_for_its_sibling_to_run_first() {
    let graph = build_graph();
    let reg = registry(vec![
        (
            "worker",
            Arc::new(WriteNode {
                channel: "worker_seen".into(),
                value: serde_json::json!(41),
            }) as Arc<dyn Node>,
        ),
        (
            "gate",
            Arc::new(IncrementNode {
                input_channel: "worker_seen".into(),
                output_channel: "gate_saw".into(),
            }) as Arc<dyn Node>,
        ),
    ]);
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg, saver, 4);

    // Both "worker" and "gate" fire off the same entry edge in superstep 0.
    // If "gate" ran alongside "worker" it would see "worker_seen" still
    // absent (its input snapshot is taken before that superstep's writes
    // commit) and write 1. Because "gate" is deferred, it's held back until
    // a later superstep where "worker"'s write has already committed, so it
    // sees 41 and writes 42.
    let outcome = runtime.invoke(input(vec![]), RunConfig::new("t1", signal())).await.unwrap();
    let RunOutcome::Done(values) = outcome else {
        panic!("expected completion")
    };
    assert_eq!(values.get("worker_seen"), Some(&serde_json::json!(41)));
    assert_eq!(values.get("gate_saw"), Some(&serde_json::json!(42)));
}
