//! `RunConfig::interrupt_before`/`interrupt_after`: pausing a run for
//! external approval around a node's execution, independent of any
//! node-requested `interrupt::call`.

mod common;

use std::sync::Arc;

use stepgraph::channels::ChannelSpec;
use stepgraph::checkpoint::MemorySaver;
use stepgraph::config::RunConfig;
use stepgraph::graph::{GraphBuilder, END, START};
use stepgraph::node::Node;
use stepgraph::run::{GraphRuntime, PausePhase, RunOutcome};

use common::{input, registry, signal, WriteNode};

fn build_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("a").unwrap();
    builder.add_node("b").unwrap();
    builder.add_edge(START, "a");
    builder.add_edge("a", "b");
    builder.add_edge("b", END);
    builder.add_channel(ChannelSpec::last_value("seen_a"));
    builder.add_channel(ChannelSpec::last_value("seen_b"));
    builder.compile().unwrap()
}

fn reg() -> Arc<stepgraph::node::NodeRegistry> {
    registry(vec![
        (
            "a",
            Arc::new(WriteNode {
                channel: "seen_a".into(),
                value: serde_json::json!(true),
            }) as Arc<dyn Node>,
        ),
        (
            "b",
            Arc::new(WriteNode {
                channel: "seen_b".into(),
                value: serde_json::json!(true),
            }) as Arc<dyn Node>,
        ),
    ])
}

#[tokio::test]
async fn interrupt_before_pauses_ahead_of_the_matching_node() {
    let graph = build_graph();
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg(), saver, 4);

    let config = RunConfig::new("t1", signal()).interrupt_before(vec!["b".to_string()]);
    let paused = runtime.invoke(input(vec![]), config).await.unwrap();
    let RunOutcome::Paused { nodes, phase, .. } = paused else {
        panic!("expected a pause before `b`")
    };
    assert_eq!(nodes, vec!["b".to_string()]);
    assert_eq!(phase, PausePhase::Before);

    // `a` already ran and committed before the pause; resuming continues
    // from the same checkpoint and lets `b` run.
    let config_no_pause = RunConfig::new("t1", signal());
    let done = runtime.invoke(input(vec![]), config_no_pause).await.unwrap();
    let RunOutcome::Done(values) = done else {
        panic!("expected completion")
    };
    assert_eq!(values.get("seen_a"), Some(&serde_json::json!(true)));
    assert_eq!(values.get("seen_b"), Some(&serde_json::json!(true)));
}

#[tokio::test]
async fn interrupt_after_pauses_once_the_matching_node_has_committed() {
    let graph = build_graph();
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg(), saver, 4);

    let config = RunConfig::new("t1", signal()).interrupt_after(vec!["a".to_string()]);
    let paused = runtime.invoke(input(vec![]), config).await.unwrap();
    let RunOutcome::Paused { nodes, phase, .. } = paused else {
        panic!("expected a pause after `a`")
    };
    assert_eq!(nodes, vec!["a".to_string()]);
    assert_eq!(phase, PausePhase::After);

    let done = runtime
        .invoke(input(vec![]), RunConfig::new("t1", signal()))
        .await
        .unwrap();
    let RunOutcome::Done(values) = done else {
        panic!("expected completion")
    };
    assert_eq!(values.get("seen_b"), Some(&serde_json::json!(true)));
}

#[tokio::test]
async fn wildcard_interrupt_before_matches_every_node() {
    let graph = build_graph();
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg(), saver, 4);

    let config = RunConfig::new("t1", signal()).interrupt_before(vec!["*".to_string()]);
    let paused = runtime.invoke(input(vec![]), config).await.unwrap();
    let RunOutcome::Paused { nodes, .. } = paused else {
        panic!("expected a pause before the first node")
    };
    assert_eq!(nodes, vec!["a".to_string()]);
}
