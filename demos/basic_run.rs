//! A minimal end-to-end run: two nodes wired through a reducer channel,
//! observed over the event bus, driven to completion through
//! `GraphRuntime::invoke`.
//!
//! Run with: `cargo run --example basic_run`

use std::sync::Arc;

use async_trait::async_trait;
use miette::Result;
use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stepgraph::channels::spec::append_reduce;
use stepgraph::channels::ChannelSpec;
use stepgraph::checkpoint::MemorySaver;
use stepgraph::config::RunConfig;
use stepgraph::error::GraphError;
use stepgraph::event_bus::EventBus;
use stepgraph::graph::{GraphBuilder, END, START};
use stepgraph::node::{Node, NodeOutput, NodeRegistry};
use stepgraph::run::{GraphRuntime, RunOutcome};
use stepgraph::task::Task;

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("error,stepgraph=info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

struct GreetNode;

#[async_trait]
impl Node for GreetNode {
    async fn run(&self, _task: &Task) -> std::result::Result<NodeOutput, GraphError> {
        Ok(NodeOutput::write("log", json!("hello")))
    }
}

struct FarewellNode;

#[async_trait]
impl Node for FarewellNode {
    async fn run(&self, _task: &Task) -> std::result::Result<NodeOutput, GraphError> {
        Ok(NodeOutput::write("log", json!("goodbye")))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    miette::set_panic_hook();

    info!("basic_run: two-node graph accumulating into a reducer channel");

    let event_bus = EventBus::default();
    event_bus.listen_for_events();

    let mut builder = GraphBuilder::new();
    builder.add_node("greet").unwrap();
    builder.add_node("farewell").unwrap();
    builder.add_edge(START, "greet");
    builder.add_edge("greet", "farewell");
    builder.add_edge("farewell", END);
    builder.add_channel(ChannelSpec::reducer("log", json!([]), append_reduce()));
    let graph = builder.compile().expect("graph should compile");

    let mut registry = NodeRegistry::default();
    registry.insert("greet", Arc::new(GreetNode));
    registry.insert("farewell", Arc::new(FarewellNode));

    let saver = Arc::new(MemorySaver::new());
    let runtime = GraphRuntime::new(graph, Arc::new(registry), saver, 4);

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let config = RunConfig::new("demo-thread", shutdown_rx);

    let outcome = runtime
        .invoke(FxHashMap::default(), config)
        .await
        .expect("run should complete");

    match outcome {
        RunOutcome::Done(values) => {
            info!("final channel values: {:?}", values.get("log"));
        }
        RunOutcome::Interrupted { .. } | RunOutcome::Paused { .. } => {
            info!("run did not reach completion in one invoke call");
        }
    }

    event_bus.stop_listener().await;
    Ok(())
}
