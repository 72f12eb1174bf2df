//! Shard buckets and wire encoding.
//!
//! A [`ShardBucket`] accumulates the records of one `(field, shard)` pair.
//! Sealing it sorts the records into import order and freezes them; a
//! [`SealedBucket`] can then be encoded into a wire-ready [`ImportRequest`]
//! without further mutation. Appends are only possible before sealing, so a
//! bucket can never be mutated concurrently with serialization.

use bytes::Bytes;
use egret_core::{
    pb,
    record::{ColumnId, Record, RecordKind, RowId, sort_for_import},
    resources::{FieldKind, FieldRef, IndexName, IndexRef},
};
use prost::Message;
use roaring::RoaringTreemap;

use crate::{
    error::{ImportError, InternalSnafu, RecordMismatchSnafu, Result},
    write::{ReplyWithError, WriteReplySender},
};

/// The media type of both import payload encodings.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";

/// The protocol-version marker sent with every import request.
pub const VERSION_HEADER: (&str, &str) = ("x-egret-version", "1");

const IMPORT_HEADERS: [(&str, &str); 3] = [
    ("content-type", CONTENT_TYPE_PROTOBUF),
    ("accept", CONTENT_TYPE_PROTOBUF),
    VERSION_HEADER,
];

/// A wire-ready import for one shard of one field.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// The destination path on the owning node.
    pub path: String,
    /// The serialized payload.
    pub body: Bytes,
}

impl ImportRequest {
    /// The headers to send with the request.
    pub fn headers(&self) -> &'static [(&'static str, &'static str)] {
        &IMPORT_HEADERS
    }
}

/// A bucket accumulating the records of one shard of one field.
#[derive(Debug)]
pub struct ShardBucket {
    index: IndexRef,
    field: FieldRef,
    shard: u64,
    shard_width: u64,
    clear: bool,
    records: Vec<Record>,
    replies: Vec<WriteReplySender>,
}

impl ShardBucket {
    /// Create an empty bucket for the given shard of the field.
    pub fn new(index: IndexRef, field: FieldRef, shard: u64, shard_width: u64, clear: bool) -> Self {
        Self {
            index,
            field,
            shard,
            shard_width,
            clear,
            records: Vec::new(),
            replies: Vec::new(),
        }
    }

    /// The number of records in the bucket.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record to the bucket.
    ///
    /// The record must map to this bucket's shard; routing a record into the
    /// wrong bucket is a programmer error and fails immediately.
    pub fn append(
        &mut self,
        record: Record,
        reply: WriteReplySender,
    ) -> std::result::Result<(), ReplyWithError> {
        let record_shard = record.shard(self.shard_width);
        if record_shard != self.shard {
            let error = ImportError::RecordMismatch {
                message: format!(
                    "record for shard {record_shard} routed into bucket for {} shard {}",
                    self.field.name, self.shard,
                ),
            };
            return Err(ReplyWithError { reply, error });
        }

        self.records.push(record);
        self.replies.push(reply);
        Ok(())
    }

    /// Seal the bucket: sort the records into import order and freeze them.
    ///
    /// Sorting happens exactly once, here. The sort is stable, so records
    /// with equal column identifiers keep their submission order.
    pub fn seal(mut self) -> SealedBucket {
        sort_for_import(&mut self.records);

        SealedBucket {
            index: self.index,
            field: self.field,
            shard: self.shard,
            shard_width: self.shard_width,
            clear: self.clear,
            records: self.records,
            replies: self.replies,
        }
    }
}

/// A sealed bucket: records sorted into import order, no further appends.
#[derive(Debug)]
pub struct SealedBucket {
    index: IndexRef,
    field: FieldRef,
    shard: u64,
    shard_width: u64,
    clear: bool,
    records: Vec<Record>,
    replies: Vec<WriteReplySender>,
}

impl SealedBucket {
    /// The shard the bucket belongs to.
    pub fn shard(&self) -> u64 {
        self.shard
    }

    /// The name of the index the bucket belongs to.
    pub fn index_name(&self) -> &IndexName {
        &self.index.name
    }

    /// The number of records in the bucket.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the bucket, returning the reply channels of its records.
    pub fn into_replies(self) -> Vec<WriteReplySender> {
        self.replies
    }

    /// Whether the bucket encodes to the roaring-bitmap wire format.
    ///
    /// Roaring is used only for set records over pure-integer identifiers:
    /// the server's on-disk fragment representation for those fields is
    /// already a bitmap container, so a pre-encoded bitmap skips a
    /// server-side re-encode. Every keyed combination falls back to the
    /// parallel-array protobuf encoding.
    pub fn uses_roaring(&self) -> bool {
        self.field.kind == FieldKind::Set && !self.index.keys && !self.field.keys
    }

    /// Serialize the bucket into a wire-ready import request.
    ///
    /// Pure and idempotent: the records were sorted at seal time.
    pub fn to_import_request(&self) -> Result<ImportRequest> {
        let roaring = self.uses_roaring();

        let body = if roaring {
            self.encode_roaring()?
        } else {
            match self.field.kind {
                FieldKind::Set => Bytes::from(self.encode_set_message()?.encode_to_vec()),
                FieldKind::Int => Bytes::from(self.encode_value_message()?.encode_to_vec()),
            }
        };

        Ok(ImportRequest {
            path: self.import_path(roaring),
            body,
        })
    }

    fn import_path(&self, roaring: bool) -> String {
        let index = self.index.name.id();
        let field = self.field.name.id();

        let mut path = if roaring {
            format!("/index/{index}/field/{field}/import-roaring/{}", self.shard)
        } else {
            format!("/index/{index}/field/{field}/import")
        };

        if self.clear {
            path.push_str("?clear=true");
        }

        path
    }

    fn encode_roaring(&self) -> Result<Bytes> {
        let mut bitmap = RoaringTreemap::new();

        for record in &self.records {
            let (row, column) = match record {
                Record::Set(set) => match (&set.row, &set.column) {
                    (RowId::Id(row), ColumnId::Id(column)) => (*row, *column),
                    _ => {
                        return RecordMismatchSnafu {
                            message: format!(
                                "keyed record in roaring bucket for {}",
                                self.field.name
                            ),
                        }
                        .fail();
                    }
                },
                Record::Value(_) => {
                    return RecordMismatchSnafu {
                        message: format!("value record in set bucket for {}", self.field.name),
                    }
                    .fail();
                }
            };

            bitmap.insert(row * self.shard_width + column % self.shard_width);
        }

        let mut buf = Vec::with_capacity(bitmap.serialized_size());
        bitmap
            .serialize_into(&mut buf)
            .map_err(|err| ImportError::Internal {
                message: format!("failed to serialize roaring bitmap: {err}"),
            })?;

        Ok(Bytes::from(buf))
    }

    fn encode_set_message(&self) -> Result<pb::ImportRequest> {
        let mut message = pb::ImportRequest {
            index: self.index.name.id().to_string(),
            field: self.field.name.id().to_string(),
            shard: self.shard,
            ..Default::default()
        };

        for record in &self.records {
            let Record::Set(set) = record else {
                return RecordMismatchSnafu {
                    message: format!("value record in set bucket for {}", self.field.name),
                }
                .fail();
            };

            match &set.row {
                RowId::Id(id) => message.row_ids.push(*id),
                RowId::Key(key) => message.row_keys.push(key.clone()),
            }
            match &set.column {
                ColumnId::Id(id) => message.column_ids.push(*id),
                ColumnId::Key(key) => message.column_keys.push(key.clone()),
            }
            message.timestamps.push(set.timestamp);
        }

        ensure_parallel(
            message.row_ids.len() + message.row_keys.len(),
            message.column_ids.len() + message.column_keys.len(),
            self.records.len(),
        )?;

        Ok(message)
    }

    fn encode_value_message(&self) -> Result<pb::ImportValueRequest> {
        let mut message = pb::ImportValueRequest {
            index: self.index.name.id().to_string(),
            field: self.field.name.id().to_string(),
            shard: self.shard,
            ..Default::default()
        };

        for record in &self.records {
            let Record::Value(value) = record else {
                return RecordMismatchSnafu {
                    message: format!("set record in value bucket for {}", self.field.name),
                }
                .fail();
            };

            match &value.column {
                ColumnId::Id(id) => message.column_ids.push(*id),
                ColumnId::Key(key) => message.column_keys.push(key.clone()),
            }
            message.values.push(value.value);
        }

        ensure_parallel(
            message.values.len(),
            message.column_ids.len() + message.column_keys.len(),
            self.records.len(),
        )?;

        Ok(message)
    }
}

// Validation and per-bucket routing keep each axis homogeneous; a mixed
// bucket indicates a bug upstream, not bad user input.
fn ensure_parallel(rows: usize, columns: usize, expected: usize) -> Result<()> {
    if rows != expected || columns != expected {
        return InternalSnafu {
            message: format!(
                "parallel arrays diverged: {rows} rows, {columns} columns, {expected} records"
            ),
        }
        .fail();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use egret_core::{
        SHARD_WIDTH,
        resources::{Field, FieldKind, FieldName, FieldOptions, Index, IndexName, IndexOptions},
    };
    use tokio::sync::oneshot;

    use super::*;

    fn setup(index_keys: bool, field_options: FieldOptions) -> (IndexRef, FieldRef) {
        let index_name = IndexName::new_unchecked("repository");
        let field_name = FieldName::new_unchecked("stargazer", index_name.clone());
        (
            Arc::new(Index::new(
                index_name,
                IndexOptions::new().with_keys(index_keys),
            )),
            Arc::new(Field::new(field_name, field_options)),
        )
    }

    fn bucket_with(
        index_keys: bool,
        field_options: FieldOptions,
        clear: bool,
        records: Vec<Record>,
    ) -> SealedBucket {
        let (index, field) = setup(index_keys, field_options);
        let mut bucket = ShardBucket::new(index, field, 0, SHARD_WIDTH, clear);
        for record in records {
            let (tx, _rx) = oneshot::channel();
            bucket.append(record, tx).expect("append");
        }
        bucket.seal()
    }

    #[test]
    fn test_roaring_selected_only_for_unkeyed_set_buckets() {
        let cases = [
            (false, FieldKind::Set, false, true),
            (true, FieldKind::Set, false, false),
            (false, FieldKind::Set, true, false),
            (true, FieldKind::Set, true, false),
            (false, FieldKind::Int, false, false),
        ];

        for (index_keys, kind, field_keys, expect_roaring) in cases {
            let bucket = bucket_with(
                index_keys,
                FieldOptions::new().with_kind(kind).with_keys(field_keys),
                false,
                vec![],
            );
            assert_eq!(
                bucket.uses_roaring(),
                expect_roaring,
                "index_keys={index_keys} kind={kind:?} field_keys={field_keys}"
            );
        }
    }

    #[test]
    fn test_roaring_encoding_and_path() {
        let bucket = bucket_with(
            false,
            FieldOptions::new(),
            false,
            vec![
                Record::set(1u64, 10u64),
                Record::set(5u64, 20u64),
                Record::set(3u64, 41u64),
            ],
        );

        let request = bucket.to_import_request().expect("encode");
        assert_eq!(request.path, "/index/repository/field/stargazer/import-roaring/0");

        let bitmap = RoaringTreemap::deserialize_from(&request.body[..]).expect("decode");
        let expected: Vec<u64> = vec![
            SHARD_WIDTH + 10,
            3 * SHARD_WIDTH + 41,
            5 * SHARD_WIDTH + 20,
        ];
        assert_eq!(bitmap.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_csv_encoding_sorts_by_column_and_keeps_ties_stable() {
        let bucket = bucket_with(
            false,
            FieldOptions::new().with_kind(FieldKind::Int),
            false,
            vec![
                Record::value(10u64, 5),
                Record::value(5u64, 7),
                Record::value(5u64, 3),
            ],
        );

        let request = bucket.to_import_request().expect("encode");
        assert_eq!(request.path, "/index/repository/field/stargazer/import");

        let message = pb::ImportValueRequest::decode(&request.body[..]).expect("decode");
        assert_eq!(message.column_ids, vec![5, 5, 10]);
        assert_eq!(message.values, vec![7, 3, 5]);
        assert!(message.column_keys.is_empty());
    }

    #[test]
    fn test_keyed_set_bucket_uses_csv_with_parallel_keys() {
        let bucket = bucket_with(
            true,
            FieldOptions::new().with_keys(true),
            false,
            vec![
                Record::set("alice", "cart"),
                Record::set("bob", "apple"),
            ],
        );

        assert!(!bucket.uses_roaring());
        let request = bucket.to_import_request().expect("encode");

        let message = pb::ImportRequest::decode(&request.body[..]).expect("decode");
        assert_eq!(message.column_keys, vec!["apple", "cart"]);
        assert_eq!(message.row_keys, vec!["bob", "alice"]);
        assert!(message.row_ids.is_empty());
        assert!(message.column_ids.is_empty());
        assert_eq!(message.timestamps, vec![0, 0]);
    }

    #[test]
    fn test_clear_flag_appends_query_parameter() {
        let roaring_bucket = bucket_with(
            false,
            FieldOptions::new(),
            true,
            vec![Record::set(1u64, 10u64)],
        );
        let request = roaring_bucket.to_import_request().expect("encode");
        assert_eq!(
            request.path,
            "/index/repository/field/stargazer/import-roaring/0?clear=true"
        );

        let csv_bucket = bucket_with(
            false,
            FieldOptions::new().with_kind(FieldKind::Int),
            true,
            vec![Record::value(10u64, 1)],
        );
        let request = csv_bucket.to_import_request().expect("encode");
        assert_eq!(
            request.path,
            "/index/repository/field/stargazer/import?clear=true"
        );
    }

    #[test]
    fn test_append_rejects_record_for_other_shard() {
        let (index, field) = setup(false, FieldOptions::new());
        let mut bucket = ShardBucket::new(index, field, 0, SHARD_WIDTH, false);

        let (tx, mut rx) = oneshot::channel();
        let err = bucket
            .append(Record::set(1u64, SHARD_WIDTH + 1), tx)
            .unwrap_err();
        assert!(matches!(err.error, ImportError::RecordMismatch { .. }));

        err.send();
        let reply = rx.try_recv().expect("reply");
        assert!(reply.is_err());
    }

    #[test]
    fn test_headers() {
        let bucket = bucket_with(false, FieldOptions::new(), false, vec![Record::set(0u64, 0u64)]);
        let request = bucket.to_import_request().expect("encode");

        let headers = request.headers();
        assert!(headers.contains(&("content-type", "application/x-protobuf")));
        assert!(headers.contains(&("accept", "application/x-protobuf")));
        assert!(headers.contains(&("x-egret-version", "1")));
    }
}
