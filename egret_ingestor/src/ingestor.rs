//! The background ingestor: a single consumer loop that routes records
//! into shard buckets and hands sealed buckets to a bounded set of
//! encode/dispatch workers.

use std::collections::VecDeque;

use egret_core::ImportOptions;
use futures_util::{StreamExt, stream::FuturesUnordered};
use tokio::sync::{mpsc, oneshot};
use tokio_util::{sync::CancellationToken, time::DelayQueue};
use tracing::debug;

use crate::{
    batcher::ShardBatcher,
    bucket::SealedBucket,
    dispatcher::ImportDispatcher,
    error::{ImportError, ReplyChannelClosedSnafu, Result},
    write::{ImportInfo, ReplyWithError, WriteRecordRequest, WriteRecordWithReply, WriteReplySender},
};

const INGEST_CHANNEL_SIZE: usize = 100;

/// The bulk-ingest pipeline for one import session.
pub struct RecordIngestor {
    tx: mpsc::Sender<WriteRecordWithReply>,
    rx: mpsc::Receiver<WriteRecordWithReply>,
    dispatcher: ImportDispatcher,
    options: ImportOptions,
}

/// A handle to submit records to a running [`RecordIngestor`].
#[derive(Clone)]
pub struct RecordIngestorClient {
    tx: mpsc::Sender<WriteRecordWithReply>,
}

/// A submitted record whose batch has not been dispatched yet.
#[derive(Debug)]
pub struct PendingImport {
    rx: oneshot::Receiver<Result<ImportInfo>>,
}

/// Run the ingestor until cancellation or until every client is dropped.
pub async fn run_background_ingestor(
    ingestor: RecordIngestor,
    ct: CancellationToken,
) -> Result<()> {
    ingestor.run(ct).await
}

impl RecordIngestor {
    pub fn new(dispatcher: ImportDispatcher, options: ImportOptions) -> Self {
        let (tx, rx) = mpsc::channel(INGEST_CHANNEL_SIZE);

        Self {
            tx,
            rx,
            dispatcher,
            options,
        }
    }

    pub fn client(&self) -> RecordIngestorClient {
        RecordIngestorClient {
            tx: self.tx.clone(),
        }
    }

    /// Run the ingest loop.
    ///
    /// The loop owns all bucket state; workers only ever see sealed
    /// buckets, so no lock is needed anywhere in the pipeline. At most
    /// `thread_count` encode/dispatch tasks are in flight; sealed buckets
    /// beyond that wait in a queue. When the last client is dropped the
    /// remaining buckets are flushed and the loop exits after every
    /// dispatch completes.
    pub async fn run(self, ct: CancellationToken) -> Result<()> {
        let RecordIngestor {
            tx,
            mut rx,
            dispatcher,
            options,
        } = self;

        // Close the loop's own sender so `recv` reports end-of-stream once
        // every client handle is gone.
        drop(tx);

        let max_in_flight = options.thread_count;
        let mut flush_timer = DelayQueue::new();
        let mut batcher = ShardBatcher::new(options);
        let mut dispatch_tasks = FuturesUnordered::new();
        let mut queued: VecDeque<SealedBucket> = VecDeque::new();

        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    return Ok(());
                }
                expired = flush_timer.next(), if !flush_timer.is_empty() => {
                    let Some(entry) = expired else {
                        continue;
                    };

                    // The size trigger may have flushed the bucket already.
                    let Some(sealed) = batcher.expire(entry.into_inner()) else {
                        continue;
                    };

                    debug!(shard = sealed.shard(), records = sealed.len(), "timeout flush");

                    if dispatch_tasks.len() < max_in_flight {
                        dispatch_tasks.push(dispatch_bucket(dispatcher.clone(), sealed));
                    } else {
                        queued.push_back(sealed);
                    }
                }
                task = dispatch_tasks.next(), if !dispatch_tasks.is_empty() => {
                    let Some(result) = task else {
                        continue;
                    };

                    finish_dispatch(result);

                    if let Some(next) = queued.pop_front() {
                        dispatch_tasks.push(dispatch_bucket(dispatcher.clone(), next));
                    }
                }
                write = rx.recv() => {
                    let Some(WriteRecordWithReply { request, reply }) = write else {
                        break;
                    };

                    match batcher.write_record(request, reply, &mut flush_timer) {
                        Ok(None) => {}
                        Ok(Some(flushed)) => {
                            if let Some(timer_key) = flushed.timer_key {
                                flush_timer.try_remove(&timer_key);
                            }

                            debug!(
                                shard = flushed.bucket.shard(),
                                records = flushed.bucket.len(),
                                "size flush",
                            );

                            if dispatch_tasks.len() < max_in_flight {
                                dispatch_tasks.push(dispatch_bucket(dispatcher.clone(), flushed.bucket));
                            } else {
                                queued.push_back(flushed.bucket);
                            }
                        }
                        Err(error) => {
                            error.send();
                        }
                    }
                }
            }
        }

        // End of stream: flush everything that is still accumulating and
        // wait for the in-flight and queued dispatches.
        queued.extend(batcher.drain());

        while !queued.is_empty() || !dispatch_tasks.is_empty() {
            while dispatch_tasks.len() < max_in_flight {
                let Some(next) = queued.pop_front() else {
                    break;
                };
                dispatch_tasks.push(dispatch_bucket(dispatcher.clone(), next));
            }

            tokio::select! {
                _ = ct.cancelled() => {
                    return Ok(());
                }
                task = dispatch_tasks.next() => {
                    let Some(result) = task else {
                        continue;
                    };
                    finish_dispatch(result);
                }
            }
        }

        Ok(())
    }
}

impl RecordIngestorClient {
    /// Submit a record and wait until its batch reaches the cluster.
    ///
    /// The reply only arrives when the record's bucket is flushed, so
    /// callers that want batches larger than one record must hold several
    /// writes in flight concurrently (or rely on the timeout flush).
    pub async fn write(&self, request: WriteRecordRequest) -> Result<ImportInfo> {
        self.submit(request).await?.wait().await
    }

    /// Submit a record without waiting for the dispatch.
    ///
    /// Returns a [`PendingImport`] that resolves when the record's batch
    /// has been dispatched, allowing a producer to pipeline submissions.
    pub async fn submit(&self, request: WriteRecordRequest) -> Result<PendingImport> {
        request.validate()?;

        let (tx, rx) = oneshot::channel();

        self.tx
            .send(WriteRecordWithReply { request, reply: tx })
            .await
            .or_else(|_| ReplyChannelClosedSnafu {}.fail())?;

        Ok(PendingImport { rx })
    }
}

impl PendingImport {
    /// Wait for the record's batch to be dispatched.
    pub async fn wait(self) -> Result<ImportInfo> {
        self.rx.await.or_else(|_| ReplyChannelClosedSnafu {}.fail())?
    }
}

struct CompletedImport {
    shard: u64,
    records: u32,
    replies: Vec<WriteReplySender>,
}

impl CompletedImport {
    fn send_replies(self) {
        for reply in self.replies {
            let _ = reply.send(Ok(ImportInfo {
                shard: self.shard,
                records: self.records,
            }));
        }
    }
}

async fn dispatch_bucket(
    dispatcher: ImportDispatcher,
    bucket: SealedBucket,
) -> std::result::Result<CompletedImport, Vec<ReplyWithError>> {
    let shard = bucket.shard();
    let index = bucket.index_name().clone();
    let records = bucket.len() as u32;

    let request = match bucket.to_import_request() {
        Ok(request) => request,
        Err(error) => return Err(fan_out(bucket.into_replies(), error)),
    };

    match dispatcher.dispatch(&request, &index, shard).await {
        Ok(()) => Ok(CompletedImport {
            shard,
            records,
            replies: bucket.into_replies(),
        }),
        Err(error) => Err(fan_out(bucket.into_replies(), error)),
    }
}

fn finish_dispatch(result: std::result::Result<CompletedImport, Vec<ReplyWithError>>) {
    match result {
        Ok(completed) => completed.send_replies(),
        Err(errors) => {
            for error in errors {
                error.send();
            }
        }
    }
}

fn fan_out(replies: Vec<WriteReplySender>, error: ImportError) -> Vec<ReplyWithError> {
    replies
        .into_iter()
        .map(|reply| ReplyWithError {
            reply,
            error: error.clone(),
        })
        .collect()
}
