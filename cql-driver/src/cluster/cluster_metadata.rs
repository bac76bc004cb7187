use std::net::SocketAddr;
use std::sync::Arc;

use crate::cluster::topology::Host;

/// Read-only view of the cluster consumed by load balancing policies. Implementations are shared
/// between concurrent requests and must be cheap to query.
pub trait ClusterMetadata: Send + Sync {
    /// Returns every known host, in canonical (stable) order.
    fn all_hosts(&self) -> Vec<Arc<Host>>;

    /// Returns the addresses of replicas owning the partition of given serialized routing key,
    /// primary replica first. An empty result means replicas are unknown.
    fn replicas(&self, keyspace: Option<&str>, routing_key: &[u8]) -> Vec<SocketAddr>;
}
