use miette::Diagnostic;
use thiserror::Error;

/// Errors raised directly by a [`super::Channel`] implementation.
#[derive(Debug, Error, Diagnostic, Clone)]
pub enum ChannelError {
    /// `get()` was called on a channel that has never accepted a write (and
    /// was not restored from a checkpoint).
    #[error("channel `{name}` has no value yet")]
    #[diagnostic(
        code(stepgraph::channel::empty),
        help("Call is_available() before get(), or ensure a prior superstep wrote this channel.")
    )]
    EmptyChannel { name: String },

    /// A write batch violated the channel variant's update rule (e.g. two
    /// writes to a last-value channel in one superstep, or a Send to END).
    #[error("invalid update to channel `{name}`: {reason}")]
    #[diagnostic(code(stepgraph::channel::invalid_update))]
    InvalidUpdate { name: String, reason: String },
}
