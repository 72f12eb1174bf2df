//! Bulk-ingest pipeline for the Egret bitmap-index database.
//!
//! ## Data flow
//!
//! **Batcher**: [`Record`](egret_core::Record) stream -> [`SealedBucket`].
//!
//! **Encoder**: [`SealedBucket`] -> [`ImportRequest`].
//!
//! **Dispatcher**: [`ImportRequest`] -> the cluster node owning the shard.

pub mod batcher;
pub mod bucket;
pub mod dispatcher;
pub mod error;
pub mod ingestor;
pub mod transport;
pub mod write;

pub use bucket::{ImportRequest, SealedBucket, ShardBucket};
pub use dispatcher::{BackoffPolicy, ConstantBackoff, ExponentialBackoff, ImportDispatcher};
pub use error::{ImportError, Result};
pub use ingestor::{PendingImport, RecordIngestor, RecordIngestorClient, run_background_ingestor};
pub use transport::{HttpImportTransport, ImportTransport, TransportError};
pub use write::{ImportInfo, WriteRecordRequest};
