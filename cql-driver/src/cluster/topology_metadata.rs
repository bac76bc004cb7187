use arc_swap::ArcSwap;
use fxhash::FxHashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::*;

use crate::cluster::token_map::TokenMap;
use crate::cluster::topology::Host;
use crate::cluster::ClusterMetadata;
use crate::token::Murmur3Token;

const DEFAULT_REPLICATION_FACTOR: usize = 1;

#[derive(Clone, Debug, Default)]
struct Topology {
    hosts: Vec<Arc<Host>>,
    token_map: TokenMap,
    replication_factors: FxHashMap<String, usize>,
}

/// In-memory cluster metadata with a Murmur3 token ring. Replicas of a partition are the
/// distinct owners found walking the ring clockwise from the partition token, as many as the
/// keyspace replication factor. Updates replace the whole snapshot, so readers never block.
#[derive(Debug)]
pub struct TopologyMetadata {
    topology: ArcSwap<Topology>,
    default_replication_factor: usize,
}

impl TopologyMetadata {
    pub fn new(hosts: Vec<Arc<Host>>, default_replication_factor: usize) -> Self {
        let token_map = TokenMap::new(&hosts);
        TopologyMetadata {
            topology: ArcSwap::from_pointee(Topology {
                hosts,
                token_map,
                replication_factors: Default::default(),
            }),
            default_replication_factor,
        }
    }

    /// Creates metadata with hosts known only by address. Token-aware routing is not possible
    /// until hosts with tokens are added.
    pub fn with_contact_points(contact_points: impl IntoIterator<Item = SocketAddr>) -> Self {
        TopologyMetadata::new(
            contact_points
                .into_iter()
                .map(|address| Arc::new(Host::with_address(address)))
                .collect(),
            DEFAULT_REPLICATION_FACTOR,
        )
    }

    /// Finds a host by address.
    pub fn host(&self, address: SocketAddr) -> Option<Arc<Host>> {
        self.topology
            .load()
            .hosts
            .iter()
            .find(|host| host.address() == address)
            .cloned()
    }

    /// Adds a host, replacing an existing one with the same address.
    pub fn add_host(&self, host: Arc<Host>) {
        debug!(address = %host.address(), "Adding host.");

        self.topology.rcu(|topology| {
            let mut topology = Topology::clone(topology);
            topology.token_map = topology.token_map.clone_without_host(host.address());
            topology.hosts.retain(|existing| existing.address() != host.address());

            topology.token_map = topology.token_map.clone_with_host(host.clone());
            topology.hosts.push(host.clone());
            topology
        });
    }

    pub fn remove_host(&self, address: SocketAddr) {
        debug!(%address, "Removing host.");

        self.topology.rcu(|topology| {
            let mut topology = Topology::clone(topology);
            topology.token_map = topology.token_map.clone_without_host(address);
            topology.hosts.retain(|host| host.address() != address);
            topology
        });
    }

    /// Sets the replication factor used when computing replicas for given keyspace.
    pub fn set_replication_factor(&self, keyspace: impl Into<String>, replication_factor: usize) {
        let keyspace = keyspace.into();
        self.topology.rcu(|topology| {
            let mut topology = Topology::clone(topology);
            topology
                .replication_factors
                .insert(keyspace.clone(), replication_factor);
            topology
        });
    }

    fn replication_factor(&self, topology: &Topology, keyspace: Option<&str>) -> usize {
        keyspace
            .and_then(|keyspace| topology.replication_factors.get(keyspace))
            .copied()
            .unwrap_or(self.default_replication_factor)
    }
}

impl ClusterMetadata for TopologyMetadata {
    fn all_hosts(&self) -> Vec<Arc<Host>> {
        self.topology.load().hosts.clone()
    }

    fn replicas(&self, keyspace: Option<&str>, routing_key: &[u8]) -> Vec<SocketAddr> {
        let topology = self.topology.load();
        if topology.token_map.is_empty() {
            return vec![];
        }

        let replication_factor = self.replication_factor(&topology, keyspace);
        topology
            .token_map
            .replicas_for_token(Murmur3Token::generate(routing_key), replication_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn host(last_octet: u8, token: i64) -> Arc<Host> {
        Arc::new(Host::new(
            format!("127.0.0.{last_octet}:9042").parse().unwrap(),
            Some("dc1".into()),
            Some("rack1".into()),
            vec![Murmur3Token::new(token)],
        ))
    }

    fn metadata() -> TopologyMetadata {
        TopologyMetadata::new(
            vec![
                host(1, i64::MIN / 2),
                host(2, 0),
                host(3, i64::MAX / 2),
            ],
            2,
        )
    }

    #[test]
    fn should_return_replicas_in_ring_order() {
        let metadata = metadata();

        // "test" hashes to -6017608668500074083, just before the first token
        let replicas = metadata.replicas(None, b"test");
        assert_eq!(
            replicas,
            vec![
                "127.0.0.1:9042".parse::<SocketAddr>().unwrap(),
                "127.0.0.2:9042".parse().unwrap()
            ]
        );
    }

    #[test]
    fn should_use_keyspace_replication_factor() {
        let metadata = metadata();
        metadata.set_replication_factor("ks", 3);

        assert_eq!(metadata.replicas(Some("ks"), b"test").len(), 3);
        assert_eq!(metadata.replicas(Some("other"), b"test").len(), 2);
    }

    #[test]
    fn should_have_no_replicas_without_tokens() {
        let metadata =
            TopologyMetadata::with_contact_points(["127.0.0.1:9042".parse().unwrap()]);

        assert!(metadata.replicas(None, b"test").is_empty());
        assert_eq!(metadata.all_hosts().len(), 1);
    }

    #[test]
    fn should_replace_hosts() {
        let metadata = metadata();
        metadata.add_host(host(2, 1));
        metadata.remove_host("127.0.0.3:9042".parse().unwrap());

        let addresses = metadata
            .all_hosts()
            .iter()
            .map(|host| host.address().to_string())
            .collect_vec();
        assert_eq!(addresses, vec!["127.0.0.1:9042", "127.0.0.2:9042"]);
        assert_eq!(metadata.host(host(2, 1).address()).unwrap().tokens()[0].value, 1);
    }
}
