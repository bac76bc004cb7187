use futures::{future, stream, StreamExt};
use itertools::Itertools;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cluster::topology::{Host, HostDistance};
use crate::cluster::ClusterMetadata;
use crate::load_balancing::{rotate, LoadBalancingPolicy, QueryPlan};
use crate::statement::Statement;

/// Datacenter-aware round-robin load balancing. Plans contain hosts of the local datacenter in
/// round-robin order, followed by the available ones among the first `used_hosts_per_remote_dc` hosts of every
/// remote datacenter. Hosts with unknown datacenter are treated as local.
#[derive(Debug)]
pub struct DcAwareRoundRobinPolicy {
    local_dc: String,
    used_hosts_per_remote_dc: usize,
    index: AtomicUsize,
}

impl DcAwareRoundRobinPolicy {
    /// Creates a new policy. Setting `used_hosts_per_remote_dc` to 0 disables remote failover.
    pub fn new(local_dc: impl Into<String>, used_hosts_per_remote_dc: usize) -> Self {
        DcAwareRoundRobinPolicy {
            local_dc: local_dc.into(),
            used_hosts_per_remote_dc,
            index: AtomicUsize::new(rand::random::<u64>() as usize),
        }
    }

    #[inline]
    pub fn local_dc(&self) -> &str {
        &self.local_dc
    }

    #[inline]
    pub fn used_hosts_per_remote_dc(&self) -> usize {
        self.used_hosts_per_remote_dc
    }

    fn is_local(&self, host: &Host) -> bool {
        host.datacenter()
            .map(|dc| dc == self.local_dc)
            .unwrap_or(true)
    }

    /// Remote hosts usable for failover: the first `used_hosts_per_remote_dc` ones of each remote
    /// datacenter, in canonical order.
    fn usable_remote_hosts<'a>(
        &'a self,
        hosts: &'a [Arc<Host>],
    ) -> impl Iterator<Item = (&'a str, Vec<Arc<Host>>)> + 'a {
        hosts
            .iter()
            .filter_map(|host| {
                host.datacenter()
                    .filter(|dc| *dc != self.local_dc)
                    .map(|dc| (dc, host.clone()))
            })
            .into_group_map()
            .into_iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(dc, hosts)| {
                (
                    dc,
                    hosts
                        .into_iter()
                        .take(self.used_hosts_per_remote_dc)
                        .collect_vec(),
                )
            })
    }
}

impl LoadBalancingPolicy for DcAwareRoundRobinPolicy {
    fn new_query_plan(
        &self,
        _statement: Option<&Statement>,
        cluster: &dyn ClusterMetadata,
    ) -> QueryPlan {
        let offset = self.index.fetch_add(1, Ordering::Relaxed);
        let hosts = cluster.all_hosts();

        let local = rotate(
            hosts
                .iter()
                .filter(|host| self.is_local(host))
                .cloned()
                .collect_vec(),
            offset,
        );

        // eligibility follows the canonical host list, so a down remote host is not replaced
        let remote = self
            .usable_remote_hosts(&hosts)
            .flat_map(|(_, hosts)| rotate(hosts, offset))
            .collect_vec();

        stream::iter(local.into_iter().chain(remote))
            .filter(|host| future::ready(host.is_considerably_up()))
            .boxed()
    }

    fn distance(&self, host: &Host, cluster: &dyn ClusterMetadata) -> HostDistance {
        if self.is_local(host) {
            return HostDistance::Local;
        }

        if self.used_hosts_per_remote_dc == 0 {
            return HostDistance::Ignored;
        }

        let hosts = cluster.all_hosts();
        let is_usable = self
            .usable_remote_hosts(&hosts)
            .filter(|(dc, _)| Some(*dc) == host.datacenter())
            .any(|(_, hosts)| {
                hosts
                    .iter()
                    .any(|remote| remote.address() == host.address())
            });

        if is_usable {
            HostDistance::Remote
        } else {
            HostDistance::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use itertools::Itertools;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use crate::cluster::topology::{Host, HostDistance};
    use crate::cluster::TopologyMetadata;
    use crate::load_balancing::{DcAwareRoundRobinPolicy, LoadBalancingPolicy};

    fn address(last_octet: u8) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, last_octet], 9042))
    }

    // hosts 1-3 in dc1, 4-6 in dc2, 7-8 in dc3
    fn cluster() -> TopologyMetadata {
        TopologyMetadata::new(
            (1..=8)
                .map(|i| {
                    let dc = match i {
                        1..=3 => "dc1",
                        4..=6 => "dc2",
                        _ => "dc3",
                    };
                    Arc::new(Host::with_datacenter(address(i), dc))
                })
                .collect(),
            1,
        )
    }

    async fn plan_addresses(
        policy: &DcAwareRoundRobinPolicy,
        cluster: &TopologyMetadata,
    ) -> Vec<SocketAddr> {
        policy
            .new_query_plan(None, cluster)
            .map(|host| host.address())
            .collect()
            .await
    }

    #[tokio::test]
    async fn should_put_local_hosts_first() {
        let cluster = cluster();
        let policy = DcAwareRoundRobinPolicy::new("dc1", 2);

        for _ in 0..6 {
            let plan = plan_addresses(&policy, &cluster).await;
            assert_eq!(plan.len(), 3 + 2 + 2);

            assert_eq!(
                plan[..3].iter().sorted().collect_vec(),
                vec![&address(1), &address(2), &address(3)]
            );

            let dc2 = plan[3..5].iter().sorted().collect_vec();
            assert_eq!(dc2, vec![&address(4), &address(5)]);

            let dc3 = plan[5..].iter().sorted().collect_vec();
            assert_eq!(dc3, vec![&address(7), &address(8)]);
        }
    }

    #[tokio::test]
    async fn should_rotate_local_hosts() {
        let cluster = cluster();
        let policy = DcAwareRoundRobinPolicy::new("dc1", 0);

        let mut first_hosts = vec![];
        for _ in 0..3 {
            first_hosts.push(plan_addresses(&policy, &cluster).await[0]);
        }

        assert_eq!(first_hosts.iter().unique().count(), 3);
    }

    #[tokio::test]
    async fn should_ignore_remote_hosts_without_failover() {
        let cluster = cluster();
        let policy = DcAwareRoundRobinPolicy::new("dc1", 0);

        let plan = plan_addresses(&policy, &cluster).await;
        assert_eq!(plan.len(), 3);

        let remote = cluster.host(address(4)).unwrap();
        assert_eq!(policy.distance(&remote, &cluster), HostDistance::Ignored);
    }

    #[test]
    fn should_compute_distance() {
        let cluster = cluster();
        let policy = DcAwareRoundRobinPolicy::new("dc1", 2);

        let distance = |i| policy.distance(&cluster.host(address(i)).unwrap(), &cluster);

        assert_eq!(distance(1), HostDistance::Local);
        assert_eq!(distance(4), HostDistance::Remote);
        assert_eq!(distance(5), HostDistance::Remote);
        assert_eq!(distance(6), HostDistance::Ignored);
        assert_eq!(distance(8), HostDistance::Remote);

        let unknown_dc = Host::with_address(address(9));
        assert_eq!(policy.distance(&unknown_dc, &cluster), HostDistance::Local);
    }

    #[tokio::test]
    async fn should_skip_down_local_hosts() {
        let cluster = cluster();
        cluster.host(address(1)).unwrap().set_down();

        let policy = DcAwareRoundRobinPolicy::new("dc1", 1);
        let plan = plan_addresses(&policy, &cluster).await;

        assert_eq!(plan.len(), 2 + 1 + 1);
        assert!(!plan.contains(&address(1)));
    }

    #[tokio::test]
    async fn should_only_yield_non_ignored_hosts_when_remote_host_is_down() {
        let cluster = cluster();
        cluster.host(address(4)).unwrap().set_down();

        let policy = DcAwareRoundRobinPolicy::new("dc1", 1);

        for _ in 0..4 {
            let plan = plan_addresses(&policy, &cluster).await;

            assert!(!plan.contains(&address(4)));
            assert!(!plan.contains(&address(5)));
            assert_eq!(plan.len(), 3 + 1);

            for address in plan {
                let host = cluster.host(address).unwrap();
                assert_ne!(policy.distance(&host, &cluster), HostDistance::Ignored);
            }
        }
    }
}
