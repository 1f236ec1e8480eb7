//! Two-step reducer: invoking the same thread twice accumulates into a
//! reducer channel rather than resetting it.

mod common;

use std::sync::Arc;

use stepgraph::channels::spec::append_reduce;
use stepgraph::channels::ChannelSpec;
use stepgraph::checkpoint::{ListFilter, MemorySaver, Saver};
use stepgraph::config::RunConfig;
use stepgraph::graph::{GraphBuilder, END, START};
use stepgraph::node::Node;
use stepgraph::run::{GraphRuntime, RunOutcome};

use common::{input, registry, signal, AppendNode};

fn build_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("add").unwrap();
    builder.add_edge(START, "add");
    builder.add_edge("add", END);
    builder.add_channel(ChannelSpec::last_value("new_message"));
    builder.add_channel(ChannelSpec::reducer(
        "messages",
        serde_json::json!([]),
        append_reduce(),
    ));
    builder.compile().unwrap()
}

#[tokio::test]
async fn accumulates_across_two_invocations() {
    let graph = build_graph();
    let reg = registry(vec![(
        "add",
        Arc::new(AppendNode {
            input_channel: "new_message".into(),
            output_channel: "messages".into(),
        }) as Arc<dyn Node>,
    )]);
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg, saver.clone(), 4);

    let first = runtime
        .invoke(
            input(vec![("new_message", serde_json::json!("a"))]),
            RunConfig::new("t1", signal()),
        )
        .await
        .unwrap();
    let RunOutcome::Done(values) = first else {
        panic!("expected completion")
    };
    assert_eq!(values.get("messages"), Some(&serde_json::json!(["a"])));

    let second = runtime
        .invoke(
            input(vec![("new_message", serde_json::json!("b"))]),
            RunConfig::new("t1", signal()),
        )
        .await
        .unwrap();
    let RunOutcome::Done(values) = second else {
        panic!("expected completion")
    };
    assert_eq!(values.get("messages"), Some(&serde_json::json!(["a", "b"])));

    let checkpoints = saver
        .list(ListFilter {
            thread_id: "t1".into(),
            checkpoint_ns: None,
            before: None,
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(checkpoints.len(), 2, "one checkpoint per invocation");
}
