//! A node that keeps re-triggering itself trips the run's recursion limit
//! rather than looping forever, with the last checkpoint before the error
//! preserved.

mod common;

use std::sync::Arc;

use stepgraph::checkpoint::{ListFilter, MemorySaver, Saver};
use stepgraph::config::RunConfig;
use stepgraph::error::GraphError;
use stepgraph::graph::{GraphBuilder, END, START};
use stepgraph::node::Node;
use stepgraph::run::GraphRuntime;

use common::{input, registry, signal, NoopNode};

fn build_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("loop").unwrap();
    builder.add_edge(START, "loop");
    builder.add_edge("loop", "loop");
    builder.add_edge("loop", END);
    builder.compile().unwrap()
}

#[tokio::test]
async fn a_self_triggering_node_hits_the_recursion_limit() {
    let graph = build_graph();
    let reg = registry(vec![("loop", Arc::new(NoopNode) as Arc<dyn Node>)]);
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg, saver.clone(), 4);

    let config = RunConfig::new("t1", signal()).with_recursion_limit(5);
    let err = runtime.invoke(input(vec![]), config).await.unwrap_err();

    match err {
        GraphError::RecursionLimit { limit, supersteps } => {
            assert_eq!(limit, 5);
            assert_eq!(supersteps, 5);
        }
        other => panic!("expected a recursion limit error, got {other:?}"),
    }

    let checkpoints = saver
        .list(ListFilter {
            thread_id: "t1".into(),
            checkpoint_ns: None,
            before: None,
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(checkpoints.len(), 5, "one checkpoint per completed superstep before the limit tripped");
}
