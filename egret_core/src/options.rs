//! Configuration for an import session.

use std::time::Duration;

/// The width of a shard: the number of columns each shard covers.
///
/// Fixed by the server's storage layout and shared by every node in a
/// cluster.
pub const SHARD_WIDTH: u64 = 1 << 20;

/// When the batcher flushes a shard bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushStrategy {
    /// Flush when the bucket reaches the batch size.
    Batch,
    /// Flush when the bucket reaches the batch size or when the flush
    /// interval has elapsed since the bucket's first record, whichever
    /// comes first.
    #[default]
    Timeout,
}

/// Options for an import session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// The number of concurrent encode/dispatch workers.
    pub thread_count: usize,
    /// The number of records after which a shard bucket is flushed.
    pub batch_size: usize,
    /// The maximum age of a shard bucket before it is flushed.
    ///
    /// Only honored under [`FlushStrategy::Timeout`].
    pub flush_interval: Duration,
    /// The flush strategy.
    pub strategy: FlushStrategy,
    /// Whether the session removes bits/values instead of setting them.
    pub clear: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            thread_count: 1,
            batch_size: 10_000,
            flush_interval: Duration::from_millis(100),
            strategy: FlushStrategy::default(),
            clear: false,
        }
    }
}

impl ImportOptions {
    /// Create import options with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the number of concurrent encode/dispatch workers.
    ///
    /// # Panics
    ///
    /// Panics if `thread_count` is zero.
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        assert!(thread_count >= 1, "thread count must be at least 1");
        self.thread_count = thread_count;
        self
    }

    /// Change the number of records after which a shard bucket is flushed.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size >= 1, "batch size must be at least 1");
        self.batch_size = batch_size;
        self
    }

    /// Change the maximum age of a shard bucket before it is flushed.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Change the flush strategy.
    pub fn with_strategy(mut self, strategy: FlushStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Mark the session as a removal: dispatched batches clear bits/values
    /// instead of setting them.
    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// The width of a shard.
    pub fn shard_width(&self) -> u64 {
        SHARD_WIDTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ImportOptions::new();
        assert_eq!(options.thread_count, 1);
        assert_eq!(options.batch_size, 10_000);
        assert_eq!(options.flush_interval, Duration::from_millis(100));
        assert_eq!(options.strategy, FlushStrategy::Timeout);
        assert!(!options.clear);
        assert_eq!(options.shard_width(), 1_048_576);
    }

    #[test]
    #[should_panic(expected = "thread count must be at least 1")]
    fn test_zero_thread_count_panics() {
        ImportOptions::new().with_thread_count(0);
    }
}
