use derivative::Derivative;
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::cluster::topology::{Host, HostDistance};
use crate::cluster::ClusterMetadata;
use crate::load_balancing::{rotate, LoadBalancingPolicy, QueryPlan};
use crate::retry::{ReconnectionPolicy, ReconnectionSchedule};
use crate::statement::Statement;

/// Raised by [`RetryingRoundRobinPolicy`] plans when a full pass over the cluster found no
/// available host, instead of sleeping internally.
#[derive(Debug, Clone)]
pub struct ReconnectionEvent {
    /// Suggested delay before the plan is polled again.
    pub delay_ms: i64,
    /// Cancelling this token ends the plan.
    pub cancellation_token: CancellationToken,
}

/// Round-robin policy producing infinite plans: once a pass over the whole cluster yields no
/// available host, the plan waits according to a reconnection schedule and starts over. Plans end
/// only when the policy cancellation token is cancelled.
///
/// When a reconnection listener is registered, it receives a [`ReconnectionEvent`] instead of the
/// plan sleeping, and the listener is responsible for pacing.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RetryingRoundRobinPolicy {
    #[derivative(Debug = "ignore")]
    reconnection_policy: Arc<dyn ReconnectionPolicy + Send + Sync>,
    cancellation_token: CancellationToken,
    #[derivative(Debug = "ignore")]
    reconnection_listener: Option<Arc<dyn Fn(ReconnectionEvent) + Send + Sync>>,
    index: AtomicUsize,
}

impl RetryingRoundRobinPolicy {
    pub fn new(reconnection_policy: Arc<dyn ReconnectionPolicy + Send + Sync>) -> Self {
        RetryingRoundRobinPolicy {
            reconnection_policy,
            cancellation_token: CancellationToken::new(),
            reconnection_listener: None,
            index: AtomicUsize::new(rand::random::<u64>() as usize),
        }
    }

    /// Uses given token to end plans, instead of an internal one.
    #[must_use]
    pub fn with_cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    #[must_use]
    pub fn with_reconnection_listener(
        mut self,
        reconnection_listener: Arc<dyn Fn(ReconnectionEvent) + Send + Sync>,
    ) -> Self {
        self.reconnection_listener = Some(reconnection_listener);
        self
    }

    #[inline]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Ends all current and future plans.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }
}

struct RetryingPlan {
    hosts: Vec<Arc<Host>>,
    position: usize,
    found_in_pass: bool,
    schedule: Box<dyn ReconnectionSchedule + Send + Sync>,
    cancellation_token: CancellationToken,
    reconnection_listener: Option<Arc<dyn Fn(ReconnectionEvent) + Send + Sync>>,
}

impl RetryingPlan {
    async fn next_host(&mut self) -> Option<Arc<Host>> {
        loop {
            if self.cancellation_token.is_cancelled() {
                return None;
            }

            if let Some(host) = self.hosts.get(self.position) {
                self.position += 1;

                if host.is_considerably_up() {
                    self.found_in_pass = true;
                    return Some(host.clone());
                }

                continue;
            }

            self.position = 0;
            if !std::mem::take(&mut self.found_in_pass) && !self.back_off().await {
                return None;
            }
        }
    }

    // returns false if the plan was cancelled while waiting
    async fn back_off(&mut self) -> bool {
        let delay_ms = self.schedule.next_delay_ms();
        debug!(delay_ms, "No host available, waiting before next attempt.");

        if let Some(listener) = &self.reconnection_listener {
            listener(ReconnectionEvent {
                delay_ms,
                cancellation_token: self.cancellation_token.clone(),
            });

            tokio::task::yield_now().await;
            return !self.cancellation_token.is_cancelled();
        }

        let delay = Duration::from_millis(delay_ms.max(0) as u64);
        tokio::select! {
            _ = self.cancellation_token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

impl LoadBalancingPolicy for RetryingRoundRobinPolicy {
    fn new_query_plan(
        &self,
        _statement: Option<&Statement>,
        cluster: &dyn ClusterMetadata,
    ) -> QueryPlan {
        let offset = self.index.fetch_add(1, Ordering::Relaxed);

        let plan = RetryingPlan {
            hosts: rotate(cluster.all_hosts(), offset),
            position: 0,
            found_in_pass: false,
            schedule: self.reconnection_policy.new_schedule(),
            cancellation_token: self.cancellation_token.clone(),
            reconnection_listener: self.reconnection_listener.clone(),
        };

        stream::unfold(plan, |mut plan| async move {
            plan.next_host().await.map(|host| (host, plan))
        })
        .boxed()
    }

    #[inline]
    fn distance(&self, _host: &Host, _cluster: &dyn ClusterMetadata) -> HostDistance {
        HostDistance::Local
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::cluster::TopologyMetadata;
    use crate::load_balancing::{LoadBalancingPolicy, ReconnectionEvent, RetryingRoundRobinPolicy};
    use crate::retry::ConstantReconnectionPolicy;

    fn address(last_octet: u8) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, last_octet], 9042))
    }

    fn policy() -> RetryingRoundRobinPolicy {
        RetryingRoundRobinPolicy::new(Arc::new(ConstantReconnectionPolicy::new(100).unwrap()))
    }

    #[tokio::test]
    async fn should_cycle_indefinitely() {
        let cluster = TopologyMetadata::with_contact_points([address(1), address(2)]);
        let policy = policy();

        let plan: Vec<_> = policy
            .new_query_plan(None, &cluster)
            .take(6)
            .map(|host| host.address())
            .collect()
            .await;

        assert_eq!(plan.len(), 6);
        assert_ne!(plan[0], plan[1]);
        assert_eq!(plan[0], plan[2]);
        assert_eq!(plan[1], plan[5]);
    }

    #[tokio::test]
    async fn should_notify_listener_when_no_host_is_up() {
        let cluster = TopologyMetadata::with_contact_points([address(1)]);
        let host = cluster.host(address(1)).unwrap();
        host.set_down();

        let events = Arc::new(Mutex::new(vec![]));
        let listener_host = host.clone();
        let listener_events = events.clone();
        let policy = policy().with_reconnection_listener(Arc::new(
            move |event: ReconnectionEvent| {
                listener_events.lock().unwrap().push(event.delay_ms);
                listener_host.set_up();
            },
        ));

        let mut plan = policy.new_query_plan(None, &cluster);
        assert_eq!(plan.next().await.unwrap().address(), address(1));
        assert_eq!(*events.lock().unwrap(), vec![100]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_sleep_between_fruitless_passes() {
        let cluster = TopologyMetadata::with_contact_points([address(1)]);
        let host = cluster.host(address(1)).unwrap();
        host.set_down();

        let policy = policy();
        let mut plan = policy.new_query_plan(None, &cluster);

        let restorer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            host.set_up();
        });

        let start = tokio::time::Instant::now();
        assert_eq!(plan.next().await.unwrap().address(), address(1));
        assert!(start.elapsed() >= Duration::from_millis(250));

        restorer.await.unwrap();
    }

    #[tokio::test]
    async fn should_end_plan_on_cancellation() {
        let cluster = TopologyMetadata::with_contact_points([address(1)]);
        cluster.host(address(1)).unwrap().set_down();

        let calls = Arc::new(AtomicUsize::new(0));
        let listener_calls = calls.clone();
        let policy = policy().with_reconnection_listener(Arc::new(
            move |event: ReconnectionEvent| {
                if listener_calls.fetch_add(1, Ordering::SeqCst) == 2 {
                    event.cancellation_token.cancel();
                }
            },
        ));

        let mut plan = policy.new_query_plan(None, &cluster);
        assert!(plan.next().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn should_end_plan_when_cancelled_while_sleeping() {
        let cluster = TopologyMetadata::with_contact_points([address(1)]);
        cluster.host(address(1)).unwrap().set_down();

        let policy = RetryingRoundRobinPolicy::new(Arc::new(
            ConstantReconnectionPolicy::new(60_000).unwrap(),
        ));
        let token = policy.cancellation_token().clone();
        let mut plan = policy.new_query_plan(None, &cluster);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let next = tokio::time::timeout(Duration::from_secs(5), plan.next()).await;
        assert!(matches!(next, Ok(None)));
    }
}
