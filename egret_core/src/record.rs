//! The record model for bulk ingest.
//!
//! ## Data flow
//!
//! **Batcher**: [`Record`] sequence -> shard buckets.
//!
//! **Encoder**: sorted shard bucket -> wire-ready import request.
//!
//! Records come in two variants: [`SetRecord`] associates a row with a
//! column (a bit), [`ValueRecord`] assigns a signed integer value to a
//! column. Both carry either numeric identifiers or string keys on each
//! axis, and both map to a shard through [`Record::shard`].

use std::cmp::Ordering;

/// A row identifier: numeric ID or string key, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
    Id(u64),
    Key(String),
}

impl Default for RowId {
    fn default() -> Self {
        RowId::Id(0)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        RowId::Id(id)
    }
}

impl From<&str> for RowId {
    fn from(key: &str) -> Self {
        RowId::Key(key.to_string())
    }
}

/// A column identifier: numeric ID or string key, never both.
///
/// The derived ordering (numeric IDs before keys, then by value) is the
/// import order: shard buckets are sorted by column identifier only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnId {
    Id(u64),
    Key(String),
}

impl Default for ColumnId {
    fn default() -> Self {
        ColumnId::Id(0)
    }
}

impl From<u64> for ColumnId {
    fn from(id: u64) -> Self {
        ColumnId::Id(id)
    }
}

impl From<&str> for ColumnId {
    fn from(key: &str) -> Self {
        ColumnId::Key(key.to_string())
    }
}

/// A record associating a row with a column.
///
/// The `Default` value is the distinguished "no value" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetRecord {
    /// The row identifier.
    pub row: RowId,
    /// The column identifier.
    pub column: ColumnId,
    /// The timestamp of the association, zero when unset.
    pub timestamp: i64,
}

/// A record assigning an integer value to a column.
///
/// The `Default` value is the distinguished "no value" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueRecord {
    /// The column identifier.
    pub column: ColumnId,
    /// The signed integer value.
    pub value: i64,
}

/// The kind of an ingest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Set,
    Value,
}

/// A single unit of ingest data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Set(SetRecord),
    Value(ValueRecord),
}

impl Record {
    /// Create a set record from numeric row and column IDs.
    pub fn set(row: impl Into<RowId>, column: impl Into<ColumnId>) -> Self {
        Record::Set(SetRecord {
            row: row.into(),
            column: column.into(),
            timestamp: 0,
        })
    }

    /// Create a set record with a timestamp.
    pub fn set_with_timestamp(
        row: impl Into<RowId>,
        column: impl Into<ColumnId>,
        timestamp: i64,
    ) -> Self {
        Record::Set(SetRecord {
            row: row.into(),
            column: column.into(),
            timestamp,
        })
    }

    /// Create a value record.
    pub fn value(column: impl Into<ColumnId>, value: i64) -> Self {
        Record::Value(ValueRecord {
            column: column.into(),
            value,
        })
    }

    /// The kind of the record.
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Set(_) => RecordKind::Set,
            Record::Value(_) => RecordKind::Value,
        }
    }

    /// The column identifier of the record.
    pub fn column(&self) -> &ColumnId {
        match self {
            Record::Set(record) => &record.column,
            Record::Value(record) => &record.column,
        }
    }

    /// The shard the record belongs to.
    ///
    /// Shards partition the column-identifier space in fixed-width slices.
    /// String-keyed columns cannot be partitioned client-side (the server
    /// owns key translation) and collapse to logical shard 0.
    pub fn shard(&self, shard_width: u64) -> u64 {
        match self.column() {
            ColumnId::Id(id) => id / shard_width,
            ColumnId::Key(_) => 0,
        }
    }

    /// Compare two records by their import order.
    ///
    /// The import order looks at the column identifier only; combined with a
    /// stable sort, records with equal columns keep their submission order.
    pub fn import_cmp(&self, other: &Record) -> Ordering {
        self.column().cmp(other.column())
    }
}

/// Sort records into import order.
///
/// Stable: ties on the column identifier preserve the original order.
pub fn sort_for_import(records: &mut [Record]) {
    records.sort_by(|a, b| a.import_cmp(b));
}
