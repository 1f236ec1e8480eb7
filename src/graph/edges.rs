use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::control::Send as ControlSend;

/// What a conditional edge's router decided for one invocation: a single
/// label, several labels (fan-out), or literal `Send`s that bypass label
/// resolution entirely.
pub enum RouteDecision {
    Label(String),
    Labels(Vec<String>),
    Sends(Vec<ControlSend>),
}

pub type RouterFn = Arc<dyn Fn(&FxHashMap<String, Value>) -> RouteDecision + Send + Sync>;

/// A compiled conditional edge: `router` inspects the node's resolved
/// channel view and returns a [`RouteDecision`]; string labels resolve
/// through `path_map` when present, else are taken as literal node names.
#[derive(Clone)]
pub struct ConditionalEdge {
    pub from: String,
    pub cond_id: String,
    pub router: RouterFn,
    pub path_map: Option<FxHashMap<String, String>>,
}

impl ConditionalEdge {
    /// The channel name this edge would use if it were a plain trigger edge.
    /// Not backed by a live [`crate::channels::Channel`] — it exists so
    /// validation and telemetry have a stable name for "this route" that
    /// can't collide with a real node or channel name.
    pub fn branch_channel_name(&self, dst: &str) -> String {
        format!("branch:{}:{}:{}", self.from, self.cond_id, dst)
    }

    pub fn resolve_label(&self, label: &str) -> String {
        match &self.path_map {
            Some(map) => map.get(label).cloned().unwrap_or_else(|| label.to_string()),
            None => label.to_string(),
        }
    }
}

impl std::fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("cond_id", &self.cond_id)
            .field("path_map", &self.path_map)
            .finish_non_exhaustive()
    }
}
