//! Cluster topology.
//!
//! The topology maps a `(index, shard)` pair to the address of the node
//! that owns the shard, and lets the dispatcher remove an address once the
//! node behind it stops responding.

mod memory;

use async_trait::async_trait;
use snafu::Snafu;

use crate::resources::IndexName;

pub use self::memory::InMemoryClusterTopology;

/// The base URI of a cluster node, e.g. `http://10.0.0.1:10101`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    uri: String,
}

impl NodeAddress {
    /// Create a new node address from a base URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// The base URI of the node.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Errors returned by topology implementations.
#[derive(Debug, Clone, Snafu)]
pub enum TopologyError {
    /// Every known address has been removed from the pool.
    #[snafu(display("no available address for {index} shard {shard}"))]
    NoAvailableAddress { index: IndexName, shard: u64 },
    /// Internal topology error.
    #[snafu(display("topology error: {message}"))]
    Internal { message: String },
}

pub type Result<T, E = TopologyError> = std::result::Result<T, E>;

/// The cluster topology trait resolves shard ownership.
///
/// Implementations must tolerate the address pool shrinking between calls:
/// removal is idempotent, and resolution only ever considers the addresses
/// still in the pool.
#[async_trait]
pub trait ClusterTopology: Send + Sync {
    /// Return the address of the node owning the given shard of the index.
    async fn shard_address(&self, index: &IndexName, shard: u64) -> Result<NodeAddress>;

    /// Remove an address from the pool.
    ///
    /// Later resolutions will no longer return the address. Removing an
    /// address that is already gone is a no-op.
    async fn remove_address(&self, address: &NodeAddress);
}
