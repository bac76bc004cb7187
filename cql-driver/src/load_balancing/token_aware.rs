use fxhash::{FxHashMap, FxHashSet};
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::cluster::topology::{Host, HostDistance};
use crate::cluster::ClusterMetadata;
use crate::load_balancing::{LoadBalancingPolicy, QueryPlan};
use crate::statement::Statement;

/// Token-aware load balancing decorator. Prioritizes local replicas of the partition targeted by
/// the statement routing key, in replica order, followed by the child plan. Local hosts of the
/// child plan come before non-local ones, while their relative order is preserved. Statements
/// without routing key, or with unknown replicas, use the child plan directly.
pub struct TokenAwarePolicy {
    child: Box<dyn LoadBalancingPolicy + Send + Sync>,
}

impl TokenAwarePolicy {
    pub fn new(child: Box<dyn LoadBalancingPolicy + Send + Sync>) -> Self {
        TokenAwarePolicy { child }
    }

    fn replicas(&self, statement: &Statement, cluster: &dyn ClusterMetadata) -> Vec<Arc<Host>> {
        let Some(routing_key) = &statement.routing_key else {
            return vec![];
        };

        let replicas = cluster.replicas(statement.keyspace(), routing_key);
        if replicas.is_empty() {
            return vec![];
        }

        let hosts: FxHashMap<SocketAddr, Arc<Host>> = cluster
            .all_hosts()
            .into_iter()
            .map(|host| (host.address(), host))
            .collect();

        replicas
            .iter()
            .filter_map(|address| hosts.get(address).cloned())
            .filter(|host| self.child.distance(host, cluster) == HostDistance::Local)
            .collect()
    }
}

struct TokenAwarePlan {
    replicas: VecDeque<Arc<Host>>,
    child_plan: QueryPlan,
    // child distances at plan creation
    distances: FxHashMap<SocketAddr, HostDistance>,
    non_local: VecDeque<Arc<Host>>,
    returned: FxHashSet<SocketAddr>,
}

impl TokenAwarePlan {
    async fn next_host(&mut self) -> Option<Arc<Host>> {
        while let Some(replica) = self.replicas.pop_front() {
            if replica.is_considerably_up() && self.returned.insert(replica.address()) {
                return Some(replica);
            }
        }

        while let Some(host) = self.child_plan.next().await {
            if self.returned.contains(&host.address()) {
                continue;
            }

            if self.distances.get(&host.address()) == Some(&HostDistance::Local) {
                self.returned.insert(host.address());
                return Some(host);
            }

            self.non_local.push_back(host);
        }

        while let Some(host) = self.non_local.pop_front() {
            if self.returned.insert(host.address()) {
                return Some(host);
            }
        }

        None
    }
}

impl LoadBalancingPolicy for TokenAwarePolicy {
    fn new_query_plan(
        &self,
        statement: Option<&Statement>,
        cluster: &dyn ClusterMetadata,
    ) -> QueryPlan {
        let replicas = statement
            .map(|statement| self.replicas(statement, cluster))
            .unwrap_or_default();

        let child_plan = self.child.new_query_plan(statement, cluster);
        if replicas.is_empty() {
            return child_plan;
        }

        let distances = cluster
            .all_hosts()
            .iter()
            .map(|host| (host.address(), self.child.distance(host, cluster)))
            .collect();

        let plan = TokenAwarePlan {
            replicas: replicas.into(),
            child_plan,
            distances,
            non_local: Default::default(),
            returned: Default::default(),
        };

        stream::unfold(plan, |mut plan| async move {
            plan.next_host().await.map(|host| (host, plan))
        })
        .boxed()
    }

    #[inline]
    fn distance(&self, host: &Host, cluster: &dyn ClusterMetadata) -> HostDistance {
        self.child.distance(host, cluster)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use crate::cluster::topology::Host;
    use crate::cluster::TopologyMetadata;
    use crate::load_balancing::{
        DcAwareRoundRobinPolicy, LoadBalancingPolicy, RoundRobinPolicy, TokenAwarePolicy,
    };
    use crate::statement::Statement;
    use crate::token::Murmur3Token;

    fn address(last_octet: u8) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, last_octet], 9042))
    }

    fn host(last_octet: u8, dc: &str, token: i64) -> Arc<Host> {
        Arc::new(Host::new(
            address(last_octet),
            Some(dc.into()),
            None,
            vec![Murmur3Token::new(token)],
        ))
    }

    // "test" hashes to -6017608668500074083, so replicas are 1 and 2 with rf 2
    fn cluster() -> TopologyMetadata {
        TopologyMetadata::new(
            vec![
                host(1, "dc1", i64::MIN / 2),
                host(2, "dc2", 0),
                host(3, "dc1", i64::MAX / 2),
                host(4, "dc1", i64::MAX / 4 * 3),
            ],
            2,
        )
    }

    fn statement() -> Statement {
        let mut statement = Statement::simple("SELECT * FROM t WHERE k = ?");
        statement.routing_key = Some(b"test".to_vec());
        statement
    }

    async fn plan_addresses(
        policy: &TokenAwarePolicy,
        statement: Option<&Statement>,
        cluster: &TopologyMetadata,
    ) -> Vec<SocketAddr> {
        policy
            .new_query_plan(statement, cluster)
            .map(|host| host.address())
            .collect()
            .await
    }

    #[tokio::test]
    async fn should_put_replicas_first() {
        let cluster = cluster();
        let policy = TokenAwarePolicy::new(Box::new(RoundRobinPolicy::new()));
        let statement = statement();

        for _ in 0..4 {
            let plan = plan_addresses(&policy, Some(&statement), &cluster).await;
            assert_eq!(plan.len(), 4);
            assert_eq!(&plan[..2], &[address(1), address(2)]);
        }
    }

    #[tokio::test]
    async fn should_skip_non_local_replicas() {
        let cluster = cluster();
        let policy =
            TokenAwarePolicy::new(Box::new(DcAwareRoundRobinPolicy::new("dc1", 1)));
        let statement = statement();

        for _ in 0..4 {
            let plan = plan_addresses(&policy, Some(&statement), &cluster).await;

            // local replica, other local hosts, then the remote failover host
            assert_eq!(plan.len(), 4);
            assert_eq!(plan[0], address(1));
            assert_eq!(plan[3], address(2));
        }
    }

    #[tokio::test]
    async fn should_skip_down_replicas() {
        let cluster = cluster();
        cluster.host(address(1)).unwrap().set_down();

        let policy = TokenAwarePolicy::new(Box::new(RoundRobinPolicy::new()));
        let plan = plan_addresses(&policy, Some(&statement()), &cluster).await;

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], address(2));
        assert!(!plan.contains(&address(1)));
    }

    #[tokio::test]
    async fn should_use_child_plan_without_routing_key() {
        let cluster = cluster();
        let policy = TokenAwarePolicy::new(Box::new(RoundRobinPolicy::new()));

        let first = plan_addresses(&policy, None, &cluster).await;
        let second = plan_addresses(
            &policy,
            Some(&Statement::simple("SELECT * FROM t")),
            &cluster,
        )
        .await;

        assert_eq!(first.len(), 4);
        assert_eq!(second, [&first[1..], &first[..1]].concat());
    }

    #[tokio::test]
    async fn should_use_child_plan_without_replicas() {
        let cluster = TopologyMetadata::with_contact_points([address(1), address(2)]);
        let policy = TokenAwarePolicy::new(Box::new(RoundRobinPolicy::new()));

        let plan = plan_addresses(&policy, Some(&statement()), &cluster).await;
        assert_eq!(plan.len(), 2);
    }
}
