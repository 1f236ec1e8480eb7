//! Static, per-channel configuration fixed at graph-compile time.
//!
//! A [`ChannelSpec`] never changes after compilation; the mutable part of a
//! channel (its current value, version, availability) lives in the
//! corresponding [`super::ChannelState`], which is what gets checkpointed.
//! Splitting the two mirrors the compiled-graph/checkpoint split the runtime
//! uses everywhere else: configuration is static, state is checkpointed.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde_json::Value;

/// A pure, associative-in-batch combine function: `reduce(current, next)`.
pub type ReduceFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum ChannelKind {
    LastValue,
    Reducer { reduce: ReduceFn, default: Value },
    Ephemeral,
    Topic { dedupe: bool },
    Barrier { writers: FxHashSet<String> },
}

impl std::fmt::Debug for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::LastValue => write!(f, "LastValue"),
            ChannelKind::Reducer { default, .. } => {
                write!(f, "Reducer {{ default: {default} }}")
            }
            ChannelKind::Ephemeral => write!(f, "Ephemeral"),
            ChannelKind::Topic { dedupe } => write!(f, "Topic {{ dedupe: {dedupe} }}"),
            ChannelKind::Barrier { writers } => write!(f, "Barrier {{ writers: {writers:?} }}"),
        }
    }
}

/// Declares one named channel in a compiled graph.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub name: String,
    pub kind: ChannelKind,
}

impl ChannelSpec {
    pub fn last_value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::LastValue,
        }
    }

    pub fn reducer(name: impl Into<String>, default: Value, reduce: ReduceFn) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Reducer { reduce, default },
        }
    }

    pub fn ephemeral(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Ephemeral,
        }
    }

    pub fn topic(name: impl Into<String>, dedupe: bool) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Topic { dedupe },
        }
    }

    pub fn barrier(name: impl Into<String>, writers: FxHashSet<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Barrier { writers },
        }
    }
}

/// A built-in reducer that shallow-merges JSON objects, keyed last-write-wins
/// per top-level field. Convenient default for "extra data" style channels.
pub fn shallow_merge_reduce() -> ReduceFn {
    Arc::new(|current, next| {
        let mut merged = match current {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        if let Value::Object(next_map) = next {
            for (k, v) in next_map {
                merged.insert(k.clone(), v.clone());
            }
        }
        Value::Object(merged)
    })
}

/// A built-in reducer that appends to a JSON array.
pub fn append_reduce() -> ReduceFn {
    Arc::new(|current, next| {
        let mut items = match current {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        };
        items.push(next.clone());
        Value::Array(items)
    })
}
