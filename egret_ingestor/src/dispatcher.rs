//! Dispatching import requests to the nodes that own their shards.
//!
//! The dispatcher resolves the owning node through the cluster topology,
//! POSTs the request, and runs a bounded retry loop around transport
//! failures. A node that fails at the transport level is removed from the
//! address pool before the retry, so the next resolution lands on a live
//! node. Application-level rejections are terminal.

use std::{sync::Arc, time::Duration};

use egret_core::{
    resources::IndexName,
    topology::{ClusterTopology, NodeAddress},
};
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::{
    bucket::ImportRequest,
    error::{Result, RetriesExhaustedSnafu, ServerSnafu, TopologySnafu},
    transport::{ImportTransport, TransportError},
};

/// The number of times a dispatch is retried after a transport failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// Trait for computing the delay before a retry attempt.
pub trait BackoffPolicy: Send + Sync + 'static {
    /// The delay before retry number `attempt` (zero-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Waits the same amount of time before every retry.
#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for ConstantBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF)
    }
}

impl BackoffPolicy for ConstantBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Doubles the delay on every retry, up to a maximum.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// An object to deliver import requests to the cluster.
#[derive(Clone)]
pub struct ImportDispatcher {
    topology: Arc<dyn ClusterTopology>,
    transport: Arc<dyn ImportTransport>,
    backoff: Arc<dyn BackoffPolicy>,
    max_retries: u32,
}

impl ImportDispatcher {
    /// Create a new dispatcher with the default retry policy.
    pub fn new(topology: Arc<dyn ClusterTopology>, transport: Arc<dyn ImportTransport>) -> Self {
        Self {
            topology,
            transport,
            backoff: Arc::new(ConstantBackoff::default()),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Change the number of retries after transport failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Change the backoff policy between retries.
    pub fn with_backoff(mut self, backoff: impl BackoffPolicy) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Deliver an import request to the node owning `(index, shard)`.
    ///
    /// Transport failures remove the dead address from the pool and retry
    /// against the next resolution, up to the configured retry count.
    /// Non-success responses from the server are terminal: the payload
    /// would be rejected again on a resend.
    pub async fn dispatch(
        &self,
        request: &ImportRequest,
        index: &IndexName,
        shard: u64,
    ) -> Result<()> {
        let mut attempt: u32 = 0;

        loop {
            let address = self
                .topology
                .shard_address(index, shard)
                .await
                .context(TopologySnafu {
                    message: "failed to resolve shard owner",
                })?;

            match self
                .transport
                .post(&address, &request.path, request.headers(), request.body.clone())
                .await
            {
                Ok(_) => {
                    debug!(%address, path = %request.path, "import dispatched");
                    return Ok(());
                }
                Err(TransportError::Status { status, message }) => {
                    return ServerSnafu { status, message }.fail();
                }
                Err(error @ TransportError::Connection { .. }) => {
                    warn!(%address, attempt, %error, "transport failure, removing node address");
                    self.remove_dead_address(&address).await;

                    if attempt >= self.max_retries {
                        return Err(error).context(RetriesExhaustedSnafu {
                            attempts: attempt + 1,
                        });
                    }

                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn remove_dead_address(&self, address: &NodeAddress) {
        self.topology.remove_address(address).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_caps_at_max() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(2));

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(4), Duration::from_millis(1600));
        assert_eq!(backoff.delay(5), Duration::from_secs(2));
        assert_eq!(backoff.delay(63), Duration::from_secs(2));
    }

    #[test]
    fn test_constant_backoff_ignores_attempt() {
        let backoff = ConstantBackoff::new(Duration::from_millis(50));
        assert_eq!(backoff.delay(0), backoff.delay(9));
    }
}
