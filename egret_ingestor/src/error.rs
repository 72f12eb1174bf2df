use egret_core::topology::TopologyError;
use snafu::Snafu;

use crate::transport::TransportError;

/// Import pipeline error types.
///
/// Errors are fanned out to every reply channel of the bucket they affect,
/// so they must be cheap to clone and carry enough context (index, field,
/// shard) for partial-success reporting across a whole-dataset import.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum ImportError {
    /// Validation error.
    ///
    /// A precondition on the write request was not met.
    #[snafu(display("validation error: {message}"))]
    Validation { message: String },
    /// A record was routed into a bucket it does not belong to.
    ///
    /// This is a programmer error and is never retried or coerced.
    #[snafu(display("record mismatch: {message}"))]
    RecordMismatch { message: String },
    /// Topology error.
    #[snafu(display("topology error: {message}"))]
    Topology {
        message: &'static str,
        source: TopologyError,
    },
    /// The transport kept failing after removing the dead nodes.
    #[snafu(display("dispatch failed after {attempts} attempts"))]
    RetriesExhausted {
        attempts: u32,
        source: TransportError,
    },
    /// The server rejected the import. Not retried: resending a rejected
    /// payload would be rejected again.
    #[snafu(display("server rejected import: status {status}: {message}"))]
    Server { status: u16, message: String },
    /// Reply channel closed.
    #[snafu(display("reply channel closed"))]
    ReplyChannelClosed,
    /// Internal error.
    #[snafu(display("internal error: {message}"))]
    Internal { message: String },
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
