//! Fan-out via explicit `Send`s: a router hands back several `Send`s in one
//! superstep, each scheduling its own task against the same target node.

mod common;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use stepgraph::channels::spec::append_reduce;
use stepgraph::channels::ChannelSpec;
use stepgraph::checkpoint::MemorySaver;
use stepgraph::config::RunConfig;
use stepgraph::control::Send as ControlSend;
use stepgraph::graph::{GraphBuilder, RouteDecision, END, START};
use stepgraph::node::Node;
use stepgraph::run::{GraphRuntime, RunOutcome};

use common::{input, registry, signal, NoopNode, SendPayloadNode};

fn build_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("dispatch").unwrap();
    builder.add_node("worker").unwrap();
    builder.add_edge(START, "dispatch");
    builder.add_edge("worker", END);

    builder.add_conditional_edges(
        "dispatch",
        Arc::new(|_snapshot: &FxHashMap<String, serde_json::Value>| {
            RouteDecision::Sends(vec![
                ControlSend::new("worker", serde_json::json!(1)),
                ControlSend::new("worker", serde_json::json!(2)),
                ControlSend::new("worker", serde_json::json!(3)),
            ])
        }),
        None,
    );

    builder.add_channel(ChannelSpec::reducer("results", serde_json::json!([]), append_reduce()));
    builder.compile().unwrap()
}

#[tokio::test]
async fn fan_out_sends_schedule_one_task_per_send() {
    let graph = build_graph();
    let reg = registry(vec![
        ("dispatch", Arc::new(NoopNode) as Arc<dyn Node>),
        (
            "worker",
            Arc::new(SendPayloadNode { channel: "results".into() }) as Arc<dyn Node>,
        ),
    ]);
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg, saver, 4);

    let outcome = runtime.invoke(input(vec![]), RunConfig::new("t1", signal())).await.unwrap();
    let RunOutcome::Done(values) = outcome else {
        panic!("expected completion")
    };

    let mut results: Vec<i64> = values
        .get("results")
        .and_then(|v| v.as_array())
        .expect("results channel should have been written")
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    results.sort_unstable();
    assert_eq!(results, vec![1, 2, 3], "exactly one task per Send, each payload written once");
}
