use futures::{future, stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cluster::topology::{Host, HostDistance};
use crate::cluster::ClusterMetadata;
use crate::load_balancing::{rotate, LoadBalancingPolicy, QueryPlan};
use crate::statement::Statement;

/// Simple round-robin load balancing. Every plan starts at the next host in line, followed by
/// the rest of the cluster. All hosts are considered local.
#[derive(Debug)]
pub struct RoundRobinPolicy {
    index: AtomicUsize,
}

impl RoundRobinPolicy {
    pub fn new() -> Self {
        RoundRobinPolicy {
            // start at a random host, so multiple clients don't hit the same hosts at once
            index: AtomicUsize::new(rand::random::<u64>() as usize),
        }
    }
}

impl Default for RoundRobinPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancingPolicy for RoundRobinPolicy {
    fn new_query_plan(
        &self,
        _statement: Option<&Statement>,
        cluster: &dyn ClusterMetadata,
    ) -> QueryPlan {
        let offset = self.index.fetch_add(1, Ordering::Relaxed);
        let hosts = rotate(cluster.all_hosts(), offset);

        stream::iter(hosts)
            .filter(|host| future::ready(host.is_considerably_up()))
            .boxed()
    }

    #[inline]
    fn distance(&self, _host: &Host, _cluster: &dyn ClusterMetadata) -> HostDistance {
        HostDistance::Local
    }
}
