use egret_core::{
    record::{ColumnId, Record, RecordKind, RowId},
    resources::{FieldKind, FieldRef, IndexRef},
};
use tokio::sync::oneshot;

use crate::error::{ImportError, Result, ValidationSnafu};

/// A request to ingest one record into a field.
#[derive(Debug, Clone)]
pub struct WriteRecordRequest {
    pub index: IndexRef,
    pub field: FieldRef,
    pub record: Record,
}

/// Confirmation that the batch containing a record reached the cluster.
#[derive(Debug, Clone)]
pub struct ImportInfo {
    /// The shard the record was imported into.
    pub shard: u64,
    /// The number of records in the dispatched batch.
    pub records: u32,
}

pub type WriteReplySender = oneshot::Sender<Result<ImportInfo>>;

/// A write queued into the ingestor, carrying its reply channel.
#[derive(Debug)]
pub struct WriteRecordWithReply {
    pub request: WriteRecordRequest,
    pub reply: WriteReplySender,
}

/// An error that should be returned to the caller of a write.
#[derive(Debug)]
pub struct ReplyWithError {
    /// The reply channel.
    pub reply: WriteReplySender,
    /// The error.
    pub error: ImportError,
}

impl ReplyWithError {
    pub fn send(self) {
        let _ = self.reply.send(Err(self.error));
    }
}

impl WriteRecordRequest {
    pub fn validate(&self) -> Result<()> {
        if self.field.name.parent() != &self.index.name {
            return ValidationSnafu {
                message: format!(
                    "field index {} does not match provided index {}",
                    self.field.name.parent(),
                    self.index.name
                ),
            }
            .fail();
        }

        match (self.record.kind(), self.field.kind) {
            (RecordKind::Set, FieldKind::Set) | (RecordKind::Value, FieldKind::Int) => {}
            (RecordKind::Set, FieldKind::Int) => {
                return ValidationSnafu {
                    message: format!("field {} stores values but got a set record", self.field.name),
                }
                .fail();
            }
            (RecordKind::Value, FieldKind::Set) => {
                return ValidationSnafu {
                    message: format!("field {} stores bits but got a value record", self.field.name),
                }
                .fail();
            }
        }

        if let Record::Set(record) = &self.record {
            let row_keyed = matches!(record.row, RowId::Key(_));
            if row_keyed != self.field.keys {
                return ValidationSnafu {
                    message: format!(
                        "field {} expects {} rows",
                        self.field.name,
                        if self.field.keys { "keyed" } else { "numeric" },
                    ),
                }
                .fail();
            }
        }

        let column_keyed = matches!(self.record.column(), ColumnId::Key(_));
        if column_keyed != self.index.keys {
            return ValidationSnafu {
                message: format!(
                    "index {} expects {} columns",
                    self.index.name,
                    if self.index.keys { "keyed" } else { "numeric" },
                ),
            }
            .fail();
        }

        Ok(())
    }
}
