//! Load balancing policies decide which hosts are contacted for a given request, and in which
//! order.
//!
//! A policy produces a [`QueryPlan`] per request: a lazily evaluated, single-pass sequence of
//! hosts. The request handler pulls hosts from the plan until one of them answers. Plans are
//! independent of the cluster metadata after creation, so topology changes never affect a request
//! in flight.

mod dc_aware_round_robin;
mod retrying_round_robin;
mod round_robin;
mod token_aware;

pub use self::dc_aware_round_robin::DcAwareRoundRobinPolicy;
pub use self::retrying_round_robin::{ReconnectionEvent, RetryingRoundRobinPolicy};
pub use self::round_robin::RoundRobinPolicy;
pub use self::token_aware::TokenAwarePolicy;

use std::sync::Arc;

use crate::cluster::topology::{Host, HostDistance};
use crate::cluster::ClusterMetadata;
use crate::future::BoxStream;
use crate::statement::Statement;

/// Lazily produced sequence of hosts to try for a single request.
pub type QueryPlan = BoxStream<'static, Arc<Host>>;

/// Load balancing policy, used for selecting target hosts of requests.
pub trait LoadBalancingPolicy {
    /// Returns query plan for given statement. If no statement is given, returns a generic plan
    /// for establishing connection(s) to host(s).
    fn new_query_plan(
        &self,
        statement: Option<&Statement>,
        cluster: &dyn ClusterMetadata,
    ) -> QueryPlan;

    /// Returns how the driver should treat given host.
    fn distance(&self, host: &Host, cluster: &dyn ClusterMetadata) -> HostDistance;
}

/// Rotates `hosts` left by `offset` modulo their count.
fn rotate<T>(mut hosts: Vec<T>, offset: usize) -> Vec<T> {
    if !hosts.is_empty() {
        let len = hosts.len();
        hosts.rotate_left(offset % len);
    }

    hosts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_rotate() {
        assert_eq!(rotate(vec![1, 2, 3], 4), vec![2, 3, 1]);
        assert!(rotate(Vec::<i32>::new(), 4).is_empty());
    }
}
