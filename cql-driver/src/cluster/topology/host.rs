use atomic::Atomic;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::*;

use crate::cluster::topology::HostState;
use crate::token::Murmur3Token;

/// A single node of the cluster. Hosts are shared between the cluster metadata, query plans and
/// the connection pool; their state is updated atomically by the pool.
#[derive(Debug)]
pub struct Host {
    address: SocketAddr,
    datacenter: Option<String>,
    rack: Option<String>,
    tokens: Vec<Murmur3Token>,
    state: Atomic<HostState>,
    created: Instant,
    // milliseconds since `created`
    avoided_until: AtomicU64,
}

impl Host {
    pub fn new(
        address: SocketAddr,
        datacenter: Option<String>,
        rack: Option<String>,
        tokens: Vec<Murmur3Token>,
    ) -> Self {
        Host {
            address,
            datacenter,
            rack,
            tokens,
            state: Atomic::new(HostState::Up),
            created: Instant::now(),
            avoided_until: AtomicU64::new(0),
        }
    }

    /// Creates a host with no topology information, e.g. a contact point.
    pub fn with_address(address: SocketAddr) -> Self {
        Host::new(address, None, None, vec![])
    }

    /// Creates a host in the given datacenter, with no rack or token information.
    pub fn with_datacenter(address: SocketAddr, datacenter: impl Into<String>) -> Self {
        Host::new(address, Some(datacenter.into()), None, vec![])
    }

    #[inline]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    #[inline]
    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter.as_deref()
    }

    #[inline]
    pub fn rack(&self) -> Option<&str> {
        self.rack.as_deref()
    }

    #[inline]
    pub fn tokens(&self) -> &[Murmur3Token] {
        &self.tokens
    }

    #[inline]
    pub fn state(&self) -> HostState {
        self.state.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.state() == HostState::Up
    }

    /// Checks if the host is up and not temporarily avoided after it reported being overloaded or
    /// bootstrapping.
    pub fn is_considerably_up(&self) -> bool {
        self.is_up() && self.elapsed_millis() >= self.avoided_until.load(Ordering::Relaxed)
    }

    /// Keeps the host out of query plans for the given time, without marking it down.
    pub fn avoid_for(&self, duration: Duration) {
        let until = self
            .elapsed_millis()
            .saturating_add(duration.as_millis() as u64);
        self.avoided_until.fetch_max(until, Ordering::Relaxed);

        debug!(address = %self.address, ?duration, "Avoiding host.");
    }

    /// Marks the host down, returning if it was up before. Normally done by the connection pool.
    pub fn set_down(&self) -> bool {
        self.state.swap(HostState::Down, Ordering::Relaxed) == HostState::Up
    }

    /// Marks the host up and stops avoiding it.
    pub fn set_up(&self) {
        self.avoided_until.store(0, Ordering::Relaxed);
        self.state.store(HostState::Up, Ordering::Relaxed);
    }

    fn elapsed_millis(&self) -> u64 {
        Instant::now()
            .saturating_duration_since(self.created)
            .as_millis() as u64
    }
}
