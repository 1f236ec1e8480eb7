//! Long-term, cross-thread key/value storage independent of checkpointing.
//! Interface only: no concrete backend ships in this crate.

pub mod batched;
pub mod filter;

pub use batched::BatchedStore;
pub use filter::{Filter, FilterOp};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

/// A namespaced item: `namespace` is a path of segments (e.g.
/// `["users", "123"]`), `key` identifies it within that namespace.
/// `score` is set on items returned from a `Search` whose `query` was
/// non-empty; `None` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub namespace: Vec<String>,
    pub key: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score: Option<f64>,
}

impl Item {
    pub fn new(namespace: Vec<String>, key: impl Into<String>, value: Value, now: DateTime<Utc>) -> Self {
        Self {
            namespace,
            key: key.into(),
            value,
            created_at: now,
            updated_at: now,
            score: None,
        }
    }
}

/// How a `Put`'s value should be indexed for later `Search`. `Default` uses
/// whatever fields a backend declares indexable out of the box; `Disabled`
/// suppresses indexing entirely; `Paths` overrides with an explicit set of
/// embedded-field paths.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOption {
    Default,
    Disabled,
    Paths(Vec<String>),
}

#[derive(Debug, Clone)]
pub enum StoreOp {
    Get {
        namespace: Vec<String>,
        key: String,
    },
    /// `value: None` deletes the item; this mirrors the wire protocol's
    /// single `put` operation, but the distinct [`StoreOp::Delete`] variant
    /// below stays available for callers that want delete-as-a-type rather
    /// than a put with a null payload.
    Put {
        namespace: Vec<String>,
        key: String,
        value: Option<Value>,
        index: IndexOption,
    },
    Delete {
        namespace: Vec<String>,
        key: String,
    },
    Search {
        namespace_prefix: Vec<String>,
        filter: Option<Filter>,
        /// Free-text relevance query; when set, matching items carry a
        /// `score` and results are ordered by it descending.
        query: Option<String>,
        limit: usize,
        offset: usize,
    },
    ListNamespaces {
        /// A namespace pattern where `*` matches exactly one segment and
        /// `**` matches any number of segments (including zero).
        pattern: Vec<String>,
        max_depth: Option<usize>,
        limit: usize,
        offset: usize,
    },
}

impl StoreOp {
    pub const DEFAULT_SEARCH_LIMIT: usize = 10;
    pub const DEFAULT_NAMESPACE_LIMIT: usize = 100;

    pub fn search(namespace_prefix: Vec<String>) -> Self {
        StoreOp::Search {
            namespace_prefix,
            filter: None,
            query: None,
            limit: Self::DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }

    pub fn list_namespaces(pattern: Vec<String>) -> Self {
        StoreOp::ListNamespaces {
            pattern,
            max_depth: None,
            limit: Self::DEFAULT_NAMESPACE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreResult {
    Item(Option<Item>),
    Items(Vec<Item>),
    Namespaces(Vec<Vec<String>>),
    Ack,
}

#[derive(Debug, Error, Diagnostic, Clone)]
pub enum StoreError {
    #[error("store backend error: {message}")]
    #[diagnostic(code(stepgraph::store::backend))]
    Backend { message: String },

    #[error("malformed namespace pattern: {pattern:?}")]
    #[diagnostic(code(stepgraph::store::bad_pattern))]
    BadPattern { pattern: Vec<String> },
}

/// Storage contract. Implementations execute a batch of operations as a
/// unit so callers needn't round-trip once per operation; ordering within a
/// batch is caller-visible (a `Get` after a `Put` on the same key in the
/// same batch sees the put).
#[async_trait]
pub trait Store: Send + Sync {
    async fn batch(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreResult>, StoreError>;
}
