//! Interrupt and resume: a node pauses mid-run for external input and the
//! caller drives it forward with `GraphRuntime::resume`, including a node
//! that pauses twice in a single body before completing.

mod common;

use std::sync::Arc;

use stepgraph::channels::ChannelSpec;
use stepgraph::checkpoint::MemorySaver;
use stepgraph::config::RunConfig;
use stepgraph::error::GraphError;
use stepgraph::graph::{GraphBuilder, END, START};
use stepgraph::node::Node;
use stepgraph::run::{GraphRuntime, RunOutcome};

use common::{input, registry, signal, ApproveNode, DoubleApproveNode};

fn single_approve_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("approve").unwrap();
    builder.add_edge(START, "approve");
    builder.add_edge("approve", END);
    builder.add_channel(ChannelSpec::last_value("approval"));
    builder.compile().unwrap()
}

fn double_approve_graph() -> stepgraph::graph::CompiledGraph {
    let mut builder = GraphBuilder::new();
    builder.add_node("approve").unwrap();
    builder.add_edge(START, "approve");
    builder.add_edge("approve", END);
    builder.add_channel(ChannelSpec::last_value("result"));
    builder.compile().unwrap()
}

#[tokio::test]
async fn a_single_interrupt_pauses_and_resume_completes_it() {
    let graph = single_approve_graph();
    let reg = registry(vec![(
        "approve",
        Arc::new(ApproveNode {
            namespace: "approve-ns".into(),
            prompt: serde_json::json!("approve?"),
            channel: "approval".into(),
        }) as Arc<dyn Node>,
    )]);
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg, saver, 4);

    let paused = runtime.invoke(input(vec![]), RunConfig::new("t1", signal())).await.unwrap();
    let RunOutcome::Interrupted { interrupt_id, value, .. } = paused else {
        panic!("expected an interrupt")
    };
    assert_eq!(value, serde_json::json!("approve?"));

    let done = runtime
        .resume(interrupt_id, serde_json::json!("yes"), RunConfig::new("t1", signal()))
        .await
        .unwrap();
    let RunOutcome::Done(values) = done else {
        panic!("expected completion after resume")
    };
    assert_eq!(values.get("approval"), Some(&serde_json::json!("yes")));
}

#[tokio::test]
async fn two_sequential_interrupts_in_one_body_resume_in_order() {
    let graph = double_approve_graph();
    let reg = registry(vec![(
        "approve",
        Arc::new(DoubleApproveNode {
            namespace: "approve-ns".into(),
            channel: "result".into(),
        }) as Arc<dyn Node>,
    )]);
    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, reg, saver, 4);

    let first_pause = runtime.invoke(input(vec![]), RunConfig::new("t1", signal())).await.unwrap();
    let RunOutcome::Interrupted { interrupt_id: first_id, value: first_value, .. } = first_pause else {
        panic!("expected the first interrupt")
    };
    assert_eq!(first_value, serde_json::json!("first?"));

    let second_pause = runtime
        .resume(first_id, serde_json::json!("answer-one"), RunConfig::new("t1", signal()))
        .await
        .unwrap();
    let RunOutcome::Interrupted { interrupt_id: second_id, value: second_value, .. } = second_pause else {
        panic!("expected the second interrupt")
    };
    assert_eq!(second_value, serde_json::json!("second?"));

    let done = runtime
        .resume(second_id, serde_json::json!("answer-two"), RunConfig::new("t1", signal()))
        .await
        .unwrap();
    let RunOutcome::Done(values) = done else {
        panic!("expected completion after both resumes")
    };
    assert_eq!(
        values.get("result"),
        Some(&serde_json::json!(["answer-one", "answer-two"]))
    );
}

#[tokio::test]
async fn interrupting_without_a_checkpointer_fails_instead_of_parking() {
    let graph = single_approve_graph();
    let reg = registry(vec![(
        "approve",
        Arc::new(ApproveNode {
            namespace: "approve-ns".into(),
            prompt: serde_json::json!("approve?"),
            channel: "approval".into(),
        }) as Arc<dyn Node>,
    )]);
    let runtime = GraphRuntime::without_checkpointer(graph, reg, 4);

    let err = runtime
        .invoke(input(vec![]), RunConfig::new("t1", signal()))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::MissingCheckpointer));
}

#[tokio::test]
async fn resume_without_a_checkpointer_fails() {
    let graph = single_approve_graph();
    let reg = registry(vec![(
        "approve",
        Arc::new(ApproveNode {
            namespace: "approve-ns".into(),
            prompt: serde_json::json!("approve?"),
            channel: "approval".into(),
        }) as Arc<dyn Node>,
    )]);
    let runtime = GraphRuntime::without_checkpointer(graph, reg, 4);

    let err = runtime
        .resume("bogus".into(), serde_json::json!("yes"), RunConfig::new("t1", signal()))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::MissingCheckpointer));
}
