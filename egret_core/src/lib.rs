//! Core types for the Egret bitmap-index database client.
//!
//! This crate holds the pieces shared by the client crates: the resource
//! model (indexes and fields), the record model used for bulk ingest, the
//! protobuf wire messages, and the cluster topology collaborator.

pub mod options;
pub mod pb;
pub mod record;
pub mod resources;
pub mod topology;

pub use options::{FlushStrategy, ImportOptions, SHARD_WIDTH};
pub use record::{ColumnId, Record, RecordKind, RowId, SetRecord, ValueRecord};
pub use resources::{
    Field, FieldKind, FieldName, FieldOptions, FieldRef, Index, IndexName, IndexOptions, IndexRef,
};
pub use topology::{ClusterTopology, InMemoryClusterTopology, NodeAddress, TopologyError};
