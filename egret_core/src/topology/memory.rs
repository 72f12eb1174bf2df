//! In-memory implementation of the cluster topology trait.
//!
//! Suitable for testing and for static clusters where the set of nodes is
//! known up front. Placement is deterministic: the same `(index, shard)`
//! pair resolves to the same address as long as the pool is unchanged.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::resources::IndexName;

use super::{ClusterTopology, NoAvailableAddressSnafu, NodeAddress, Result};

/// In-memory cluster topology over a fixed pool of addresses.
#[derive(Debug)]
pub struct InMemoryClusterTopology {
    addresses: RwLock<Vec<NodeAddress>>,
}

impl InMemoryClusterTopology {
    /// Create a new topology over the given addresses.
    pub fn new(addresses: impl IntoIterator<Item = NodeAddress>) -> Self {
        Self {
            addresses: RwLock::new(addresses.into_iter().collect()),
        }
    }

    /// The number of addresses currently in the pool.
    pub async fn len(&self) -> usize {
        self.addresses.read().await.len()
    }

    /// Whether the pool is empty.
    pub async fn is_empty(&self) -> bool {
        self.addresses.read().await.is_empty()
    }
}

#[async_trait]
impl ClusterTopology for InMemoryClusterTopology {
    async fn shard_address(&self, index: &IndexName, shard: u64) -> Result<NodeAddress> {
        let addresses = self.addresses.read().await;

        if addresses.is_empty() {
            return NoAvailableAddressSnafu {
                index: index.clone(),
                shard,
            }
            .fail();
        }

        let mut hasher = DefaultHasher::new();
        index.hash(&mut hasher);
        shard.hash(&mut hasher);
        let slot = (hasher.finish() % addresses.len() as u64) as usize;

        Ok(addresses[slot].clone())
    }

    async fn remove_address(&self, address: &NodeAddress) {
        let mut addresses = self.addresses.write().await;
        addresses.retain(|a| a != address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_node_topology() -> InMemoryClusterTopology {
        InMemoryClusterTopology::new([
            NodeAddress::new("http://node-a:10101"),
            NodeAddress::new("http://node-b:10101"),
            NodeAddress::new("http://node-c:10101"),
        ])
    }

    #[tokio::test]
    async fn test_resolution_is_deterministic() {
        let topology = three_node_topology();
        let index = IndexName::new_unchecked("repository");

        let first = topology.shard_address(&index, 7).await.unwrap();
        let second = topology.shard_address(&index, 7).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_removed_address_is_not_resolved_again() {
        let topology = three_node_topology();
        let index = IndexName::new_unchecked("repository");

        let owner = topology.shard_address(&index, 3).await.unwrap();
        topology.remove_address(&owner).await;
        // Idempotent removal.
        topology.remove_address(&owner).await;
        assert_eq!(topology.len().await, 2);

        let replacement = topology.shard_address(&index, 3).await.unwrap();
        assert_ne!(owner, replacement);
    }

    #[tokio::test]
    async fn test_empty_pool_errors() {
        let topology = InMemoryClusterTopology::new([]);
        let index = IndexName::new_unchecked("repository");

        let err = topology.shard_address(&index, 0).await.unwrap_err();
        assert!(matches!(
            err,
            crate::topology::TopologyError::NoAvailableAddress { .. }
        ));
    }
}
