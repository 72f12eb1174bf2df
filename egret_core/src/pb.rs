//! Protobuf wire messages for the import endpoints.
//!
//! The messages are maintained by hand; they must stay field-for-field
//! compatible with the server's import protocol.
//!
//! Both messages use parallel arrays: exactly one of the ID/key arrays is
//! populated per axis, and all populated arrays have equal length.

/// The payload of a set-record import.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImportRequest {
    /// The target index.
    #[prost(string, tag = "1")]
    pub index: ::prost::alloc::string::String,
    /// The target field.
    #[prost(string, tag = "2")]
    pub field: ::prost::alloc::string::String,
    /// The shard the columns belong to.
    #[prost(uint64, tag = "3")]
    pub shard: u64,
    /// Row IDs, parallel to the column array. Empty when the field is keyed.
    #[prost(uint64, repeated, tag = "4")]
    pub row_ids: ::prost::alloc::vec::Vec<u64>,
    /// Column IDs, parallel to the row array. Empty when the index is keyed.
    #[prost(uint64, repeated, tag = "5")]
    pub column_ids: ::prost::alloc::vec::Vec<u64>,
    /// Per-record timestamps, zero when unset.
    #[prost(int64, repeated, tag = "6")]
    pub timestamps: ::prost::alloc::vec::Vec<i64>,
    /// Row keys, populated instead of `row_ids` when the field is keyed.
    #[prost(string, repeated, tag = "7")]
    pub row_keys: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Column keys, populated instead of `column_ids` when the index is keyed.
    #[prost(string, repeated, tag = "8")]
    pub column_keys: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

/// The payload of a value-record import.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImportValueRequest {
    /// The target index.
    #[prost(string, tag = "1")]
    pub index: ::prost::alloc::string::String,
    /// The target field.
    #[prost(string, tag = "2")]
    pub field: ::prost::alloc::string::String,
    /// The shard the columns belong to.
    #[prost(uint64, tag = "3")]
    pub shard: u64,
    /// Column IDs, parallel to `values`. Empty when the index is keyed.
    #[prost(uint64, repeated, tag = "5")]
    pub column_ids: ::prost::alloc::vec::Vec<u64>,
    /// The signed integer values, parallel to the column array.
    #[prost(int64, repeated, tag = "6")]
    pub values: ::prost::alloc::vec::Vec<i64>,
    /// Column keys, populated instead of `column_ids` when the index is keyed.
    #[prost(string, repeated, tag = "7")]
    pub column_keys: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
