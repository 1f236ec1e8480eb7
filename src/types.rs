//! Core identifiers shared across the runtime: node names and channel
//! versions.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved sentinel characters that may not appear in user-supplied node or
/// channel names, since they are used to build internal names (e.g.
/// `branch:<src>:<cond>:<dst>`).
pub const RESERVED_CHARS: &[char] = &[':', '|'];

/// Identity of a node in a compiled graph.
///
/// `Start` and `End` are the reserved graph entry/exit sentinels; every
/// other node is a user-supplied name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Start,
    End,
    Custom(String),
}

impl NodeKind {
    pub fn custom(name: impl Into<String>) -> Self {
        NodeKind::Custom(name.into())
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::End)
    }

    /// Stable string encoding used for persistence and channel naming.
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "__start__".to_string(),
            NodeKind::End => "__end__".to_string(),
            NodeKind::Custom(name) => name.clone(),
        }
    }

    /// Inverse of [`NodeKind::encode`]; unknown reserved-looking strings fall
    /// back to `Custom` so forward-compatible data round-trips.
    pub fn decode(s: &str) -> Self {
        match s {
            "__start__" => NodeKind::Start,
            "__end__" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Start => write!(f, "START"),
            NodeKind::End => write!(f, "END"),
            NodeKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A channel's monotonic version.
///
/// Most channels use a plain integer counter. Reducer channels fed by more
/// than one writer in the same superstep bump to a dot-segmented string
/// (`"<superstep>.<writer-sequence>"`) so each writer's contribution is
/// individually ordered without losing the total order across supersteps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Version {
    Int(u64),
    Str(String),
}

impl Default for Version {
    fn default() -> Self {
        Version::Int(0)
    }
}

impl Version {
    pub fn zero() -> Self {
        Version::Int(0)
    }

    /// Bump to the next plain integer version. Only meaningful when the
    /// current version is `Int`; a dotted version bumps its leading segment.
    pub fn bump(&self) -> Version {
        match self {
            Version::Int(n) => Version::Int(n + 1),
            Version::Str(s) => {
                let leading = leading_segment_value(s).unwrap_or(0);
                Version::Int(leading + 1)
            }
        }
    }

    /// Construct the dotted form used when multiple writers land on a
    /// reducer channel within one superstep.
    pub fn dotted(superstep: u64, writer_seq: u64) -> Version {
        Version::Str(format!("{superstep}.{writer_seq}"))
    }

    fn segments(&self) -> Vec<String> {
        match self {
            Version::Int(n) => vec![n.to_string()],
            Version::Str(s) => s.split('.').map(|p| p.to_string()).collect(),
        }
    }
}

fn leading_segment_value(s: &str) -> Option<u64> {
    s.split('.').next()?.parse::<u64>().ok()
}

/// Compares one segment: a numeric prefix compares numerically, then any
/// non-numeric remainder compares lexicographically.
fn compare_segment(a: &str, b: &str) -> Ordering {
    let (a_num, a_rest) = split_numeric_prefix(a);
    let (b_num, b_rest) = split_numeric_prefix(b);
    match (a_num, b_num) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a_rest.cmp(b_rest)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

fn split_numeric_prefix(s: &str) -> (Option<u64>, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        (None, s)
    } else {
        (s[..end].parse::<u64>().ok(), &s[end..])
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.segments();
        let b = other.segments();
        for (sa, sb) in a.iter().zip(b.iter()) {
            let ord = compare_segment(sa, sb);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.len().cmp(&b.len())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Int(n) => write!(f, "{n}"),
            Version::Str(s) => write!(f, "{s}"),
        }
    }
}
