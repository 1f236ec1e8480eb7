//! Conditional routing: a router reads the pre-run input snapshot and
//! directs execution to exactly one of two branches.

mod common;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use stepgraph::channels::spec::append_reduce;
use stepgraph::channels::ChannelSpec;
use stepgraph::checkpoint::MemorySaver;
use stepgraph::config::RunConfig;
use stepgraph::graph::{GraphBuilder, RouteDecision, END, START};
use stepgraph::node::Node;
use stepgraph::run::{GraphRuntime, RunOutcome};

use common::{input, registry, signal, NoopNode, WriteNode};

fn build_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("a").unwrap();
    builder.add_node("b").unwrap();
    builder.add_node("c").unwrap();
    builder.add_edge(START, "a");
    builder.add_edge("b", END);
    builder.add_edge("c", END);

    let mut path_map = FxHashMap::default();
    path_map.insert("b".to_string(), "b".to_string());
    path_map.insert("c".to_string(), "c".to_string());
    builder.add_conditional_edges(
        "a",
        Arc::new(|snapshot: &FxHashMap<String, serde_json::Value>| {
            let choice = snapshot.get("choice").and_then(serde_json::Value::as_str).unwrap_or("b");
            RouteDecision::Label(choice.to_string())
        }),
        Some(path_map),
    );

    builder.add_channel(ChannelSpec::last_value("choice"));
    builder.add_channel(ChannelSpec::reducer("visited", serde_json::json!([]), append_reduce()));
    builder.compile().unwrap()
}

async fn run_with_choice(choice: &str) -> FxHashMap<String, serde_json::Value> {
    let graph = build_graph();
    let reg = registry(vec![
        ("a", Arc::new(NoopNode) as Arc<dyn Node>),
        (
            "b",
            Arc::new(WriteNode {
                channel: "visited".into(),
                value: serde_json::json!("b"),
            }) as Arc<dyn Node>,
        ),
        (
            "c",
            Arc::new(WriteNode {
                channel: "visited".into(),
                value: serde_json::json!("c"),
            }) as Arc<dyn Node>,
        ),
    ]);
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg, saver, 4);

    let outcome = runtime
        .invoke(input(vec![("choice", serde_json::json!(choice))]), RunConfig::new(format!("thread-{choice}"), signal()))
        .await
        .unwrap();
    let RunOutcome::Done(values) = outcome else {
        panic!("expected completion")
    };
    values
}

#[tokio::test]
async fn routes_to_b_when_the_router_picks_b() {
    let values = run_with_choice("b").await;
    assert_eq!(values.get("visited"), Some(&serde_json::json!(["b"])));
}

#[tokio::test]
async fn routes_to_c_when_the_router_picks_c() {
    let values = run_with_choice("c").await;
    assert_eq!(values.get("visited"), Some(&serde_json::json!(["c"])));
}
