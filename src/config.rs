//! Per-invocation run configuration: defaults that make sense out of the
//! box, with environment-variable overrides for dev-time knobs via
//! `dotenvy`.

use std::env;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub const DEFAULT_RECURSION_LIMIT: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// Emit the full channel state after each superstep.
    Values,
    /// Emit only the channels that changed in each superstep.
    Updates,
    /// Emit node-level message events as they're produced.
    Messages,
    /// Emit internal scheduling/debug events in addition to state.
    Debug,
}

/// Identifies and bounds one run of a compiled graph.
#[derive(Clone)]
pub struct RunConfig {
    pub thread_id: String,
    pub checkpoint_ns: String,
    /// Resume from this checkpoint instead of the thread's latest.
    pub checkpoint_id: Option<String>,
    pub recursion_limit: u32,
    pub stream_mode: StreamMode,
    pub interrupt_before: Vec<String>,
    pub interrupt_after: Vec<String>,
    pub signal: watch::Receiver<bool>,
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>, signal: watch::Receiver<bool>) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_ns: String::new(),
            checkpoint_id: None,
            recursion_limit: recursion_limit_from_env(),
            stream_mode: StreamMode::Values,
            interrupt_before: Vec::new(),
            interrupt_after: Vec::new(),
            signal,
        }
    }

    pub fn with_checkpoint_ns(mut self, ns: impl Into<String>) -> Self {
        self.checkpoint_ns = ns.into();
        self
    }

    pub fn with_resume_from(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_stream_mode(mut self, mode: StreamMode) -> Self {
        self.stream_mode = mode;
        self
    }

    pub fn interrupt_before(mut self, nodes: impl IntoIterator<Item = String>) -> Self {
        self.interrupt_before = nodes.into_iter().collect();
        self
    }

    pub fn interrupt_after(mut self, nodes: impl IntoIterator<Item = String>) -> Self {
        self.interrupt_after = nodes.into_iter().collect();
        self
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }
}

/// Reads `STEPGRAPH_RECURSION_LIMIT` from the environment (loaded from a
/// `.env` file in dev via `dotenvy`, same as the rest of the process), or
/// falls back to the compiled-in default.
fn recursion_limit_from_env() -> u32 {
    let _ = dotenvy::dotenv();
    env::var("STEPGRAPH_RECURSION_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RECURSION_LIMIT)
}
