use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::cluster::topology::Host;
use crate::token::Murmur3Token;

/// Map of tokens to hosts, forming the token ring.
#[derive(Clone, Debug, Default)]
pub struct TokenMap {
    token_ring: BTreeMap<Murmur3Token, Arc<Host>>,
}

impl TokenMap {
    pub fn new<'a>(hosts: impl IntoIterator<Item = &'a Arc<Host>>) -> Self {
        TokenMap {
            token_ring: hosts
                .into_iter()
                .flat_map(|host| host.tokens().iter().map(move |token| (*token, host.clone())))
                .collect(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token_ring.is_empty()
    }

    /// Returns hosts starting at given token and going clockwise around the ring. A host owning
    /// several tokens appears once for each of them.
    pub fn hosts_for_token(&self, token: Murmur3Token) -> impl Iterator<Item = &Arc<Host>> + '_ {
        self.token_ring
            .range(token..)
            .chain(self.token_ring.iter())
            .take(self.token_ring.len())
            .map(|(_, host)| host)
    }

    /// Returns up to `replica_count` distinct owners of the token, in ring order.
    pub fn replicas_for_token(&self, token: Murmur3Token, replica_count: usize) -> Vec<SocketAddr> {
        let mut replicas: Vec<SocketAddr> = Vec::with_capacity(replica_count);
        for host in self.hosts_for_token(token) {
            if replicas.len() == replica_count {
                break;
            }

            if !replicas.contains(&host.address()) {
                replicas.push(host.address());
            }
        }

        replicas
    }

    /// Creates a new map with a new host inserted.
    pub fn clone_with_host(&self, host: Arc<Host>) -> Self {
        let mut map = self.clone();
        for token in host.tokens() {
            map.token_ring.insert(*token, host.clone());
        }

        map
    }

    /// Creates a new map with a host removed.
    pub fn clone_without_host(&self, address: SocketAddr) -> Self {
        let token_ring = self
            .token_ring
            .iter()
            .filter(|(_, host)| host.address() != address)
            .map(|(token, host)| (*token, host.clone()))
            .collect();

        TokenMap { token_ring }
    }
}
