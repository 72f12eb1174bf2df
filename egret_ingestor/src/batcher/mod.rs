//! Routing records into shard buckets and deciding when to flush them.

use std::collections::{HashMap, hash_map::Entry};

use egret_core::{options::FlushStrategy, resources::FieldName, ImportOptions};
use tokio_util::time::{DelayQueue, delay_queue};

use crate::{
    bucket::{SealedBucket, ShardBucket},
    write::{ReplyWithError, WriteRecordRequest, WriteReplySender},
};

/// The identity of a live bucket: one shard of one field.
///
/// A field name carries its parent index, so keys are unique across indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub field: FieldName,
    pub shard: u64,
}

/// A bucket flushed by the size trigger, with the timer entry to cancel.
#[derive(Debug)]
pub struct FlushedBucket {
    pub bucket: SealedBucket,
    pub timer_key: Option<delay_queue::Key>,
}

struct BucketEntry {
    bucket: ShardBucket,
    timer_key: Option<delay_queue::Key>,
}

/// Routes incoming records into shard buckets and seals full ones.
///
/// A bucket leaves the live map exactly once, either through the size
/// trigger here, through [`ShardBatcher::expire`] when its flush timer
/// fires, or through [`ShardBatcher::drain`] at end of stream. Whichever
/// trigger wins removes the bucket, so the losing trigger finds nothing to
/// flush.
pub struct ShardBatcher {
    options: ImportOptions,
    buckets: HashMap<BucketKey, BucketEntry>,
}

impl ShardBatcher {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            buckets: HashMap::new(),
        }
    }

    /// Route a record into its bucket, sealing the bucket if it is full.
    ///
    /// Under [`FlushStrategy::Timeout`] a newly created bucket also arms a
    /// flush timer keyed by the bucket's identity.
    pub fn write_record(
        &mut self,
        request: WriteRecordRequest,
        reply: WriteReplySender,
        flush_timer: &mut DelayQueue<BucketKey>,
    ) -> std::result::Result<Option<FlushedBucket>, ReplyWithError> {
        let WriteRecordRequest {
            index,
            field,
            record,
        } = request;

        let shard = record.shard(self.options.shard_width());
        let key = BucketKey {
            field: field.name.clone(),
            shard,
        };

        let entry = match self.buckets.entry(key.clone()) {
            Entry::Occupied(inner) => inner.into_mut(),
            Entry::Vacant(inner) => {
                let timer_key = match self.options.strategy {
                    FlushStrategy::Timeout => {
                        Some(flush_timer.insert(key.clone(), self.options.flush_interval))
                    }
                    FlushStrategy::Batch => None,
                };

                inner.insert(BucketEntry {
                    bucket: ShardBucket::new(
                        index,
                        field,
                        shard,
                        self.options.shard_width(),
                        self.options.clear,
                    ),
                    timer_key,
                })
            }
        };

        entry.bucket.append(record, reply)?;

        if entry.bucket.len() >= self.options.batch_size {
            let Some(entry) = self.buckets.remove(&key) else {
                return Ok(None);
            };

            return Ok(Some(FlushedBucket {
                bucket: entry.bucket.seal(),
                timer_key: entry.timer_key,
            }));
        }

        Ok(None)
    }

    /// Flush a bucket whose timer fired.
    ///
    /// Returns `None` if the bucket was already flushed by the size trigger.
    pub fn expire(&mut self, key: BucketKey) -> Option<SealedBucket> {
        let entry = self.buckets.remove(&key)?;
        Some(entry.bucket.seal())
    }

    /// Flush every remaining non-empty bucket, regardless of size or age.
    pub fn drain(&mut self) -> Vec<SealedBucket> {
        self.buckets
            .drain()
            .filter(|(_, entry)| !entry.bucket.is_empty())
            .map(|(_, entry)| entry.bucket.seal())
            .collect()
    }

    /// The number of live buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether there are no live buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
