use futures::StreamExt;
use fxhash::FxHashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::*;

use crate::cluster::request_execution::RequestExecution;
use crate::cluster::topology::{Host, HostDistance};
use crate::cluster::{ClusterMetadata, ConnectionPool, QueryOptions, SessionConfig};
use crate::error::{Error, Result, TriedHosts};
use crate::frame::message_request::RequestBody;
use crate::frame::{Response, Version};
use crate::load_balancing::{LoadBalancingPolicy, QueryPlan};
use crate::retry::{ReconnectionPolicy, RetryPolicy};
use crate::speculative_execution::{SpeculativeExecutionPlan, SpeculativeExecutionPolicy};
use crate::statement::Statement;

const STATE_RUNNING: u8 = 0;
const STATE_COMPLETED: u8 = 1;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives a single statement to completion: walks the query plan, consults the retry policy on
/// server errors, fails over to further hosts on connection errors and, for idempotent
/// statements, starts speculative executions. The handler completes exactly once, either with
/// the first successful response, the error which ended the last running execution, or
/// [`Error::NoHostAvailable`] when the plan got exhausted.
pub struct RequestHandler {
    inner: Arc<HandlerInner>,
}

pub(crate) struct HandlerInner {
    pub(crate) statement: Statement,
    pub(crate) pool: Arc<dyn ConnectionPool>,
    pub(crate) retry_policy: Arc<dyn RetryPolicy + Send + Sync>,
    cluster: Arc<dyn ClusterMetadata>,
    load_balancing_policy: Arc<dyn LoadBalancingPolicy + Send + Sync>,
    reconnection_policy: Arc<dyn ReconnectionPolicy + Send + Sync>,
    speculative_execution_policy: Arc<dyn SpeculativeExecutionPolicy + Send + Sync>,
    query_options: QueryOptions,
    version: Version,
    plan: tokio::sync::Mutex<QueryPlan>,
    sent: AtomicBool,
    state: AtomicU8,
    running: AtomicUsize,
    result_sender: Mutex<Option<oneshot::Sender<Result<Response>>>>,
    executions: Mutex<Vec<AbortHandle>>,
    tried_hosts: Mutex<FxHashMap<SocketAddr, Error>>,
    last_error: Mutex<Option<Error>>,
    last_host: Mutex<Option<Arc<Host>>>,
}

impl RequestHandler {
    pub fn new(
        statement: Statement,
        config: &SessionConfig,
        cluster: Arc<dyn ClusterMetadata>,
        pool: Arc<dyn ConnectionPool>,
    ) -> Self {
        let policies = &config.policies;
        let plan = policies
            .load_balancing_policy
            .new_query_plan(Some(&statement), cluster.as_ref());

        RequestHandler {
            inner: Arc::new(HandlerInner {
                retry_policy: statement
                    .retry_policy
                    .clone()
                    .unwrap_or_else(|| policies.retry_policy.clone()),
                statement,
                pool,
                cluster,
                load_balancing_policy: policies.load_balancing_policy.clone(),
                reconnection_policy: policies.reconnection_policy.clone(),
                speculative_execution_policy: policies.speculative_execution_policy.clone(),
                query_options: config.query_options,
                version: config.protocol_version,
                plan: tokio::sync::Mutex::new(plan),
                sent: AtomicBool::new(false),
                state: AtomicU8::new(STATE_RUNNING),
                running: AtomicUsize::new(0),
                result_sender: Mutex::new(None),
                executions: Mutex::new(vec![]),
                tried_hosts: Default::default(),
                last_error: Mutex::new(None),
                last_host: Mutex::new(None),
            }),
        }
    }

    /// Sends the statement and waits for the outcome. The request is validated against the
    /// protocol version before any host is contacted. Dropping the returned future cancels all
    /// running executions.
    pub async fn send(&self) -> Result<Response> {
        let inner = &self.inner;
        let request = Arc::new(
            inner
                .statement
                .to_request(&inner.query_options, inner.version)?,
        );

        if inner.sent.swap(true, Ordering::AcqRel) {
            return Err(Error::General("Request has already been sent".into()));
        }

        let (sender, receiver) = oneshot::channel();
        *lock(&inner.result_sender) = Some(sender);

        if inner.is_completed() {
            return Err(Error::Cancelled);
        }

        let _guard = CancelOnDrop(inner);

        HandlerInner::start_execution(inner, request.clone());

        if inner.statement.is_idempotent() {
            let plan = inner
                .speculative_execution_policy
                .new_plan(inner.statement.keyspace(), &inner.statement);
            let handle = tokio::spawn(HandlerInner::run_speculative_executions(
                inner.clone(),
                request,
                plan,
            ));
            inner.register_task(handle.abort_handle());
        }

        receiver.await.unwrap_or(Err(Error::Cancelled))
    }

    /// Cancels the request. Has no effect if it has already completed.
    #[inline]
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }
}

struct CancelOnDrop<'a>(&'a HandlerInner);

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl HandlerInner {
    #[inline]
    pub(crate) fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_COMPLETED
    }

    fn start_execution(inner: &Arc<HandlerInner>, request: Arc<RequestBody>) {
        let running = inner.running.fetch_add(1, Ordering::AcqRel);
        let execution = RequestExecution::new(inner.clone(), (*request).clone());
        let handle = tokio::spawn(
            execution
                .run()
                .instrument(debug_span!("request_execution", running)),
        );

        inner.register_task(handle.abort_handle());
    }

    fn register_task(&self, handle: AbortHandle) {
        let mut executions = lock(&self.executions);

        // completion drains the list under the same lock
        if self.is_completed() {
            handle.abort();
        } else {
            executions.push(handle);
        }
    }

    async fn run_speculative_executions(
        inner: Arc<HandlerInner>,
        request: Arc<RequestBody>,
        mut plan: Box<dyn SpeculativeExecutionPlan + Send>,
    ) {
        loop {
            let last_host = lock(&inner.last_host).clone();
            let delay_ms = plan.next_execution(last_host.as_deref());
            if delay_ms <= 0 {
                return;
            }

            sleep(Duration::from_millis(delay_ms as u64)).await;

            if inner.is_completed() {
                return;
            }

            debug!(delay_ms, "Starting speculative execution.");
            HandlerInner::start_execution(&inner, request.clone());
        }
    }

    /// Returns the next host from the plan which is worth contacting, or `None` when the plan is
    /// exhausted or the handler completed.
    pub(crate) async fn next_host(&self) -> Option<Arc<Host>> {
        let mut plan = self.plan.lock().await;

        loop {
            if self.is_completed() {
                return None;
            }

            let host = plan.next().await?;
            if !host.is_considerably_up() {
                debug!(address = %host.address(), "Skipping host which is not up.");
                continue;
            }

            if self
                .load_balancing_policy
                .distance(&host, self.cluster.as_ref())
                == HostDistance::Ignored
            {
                continue;
            }

            *lock(&self.last_host) = Some(host.clone());
            return Some(host);
        }
    }

    /// Completes the handler. Returns `false` if it was already completed.
    pub(crate) fn complete(&self, result: Result<Response>) -> bool {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_COMPLETED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        if let Some(sender) = lock(&self.result_sender).take() {
            let _ = sender.send(result);
        }

        for handle in lock(&self.executions).drain(..) {
            handle.abort();
        }

        true
    }

    pub(crate) fn cancel(&self) {
        if self.complete(Err(Error::Cancelled)) {
            debug!("Request cancelled.");
        }
    }

    /// Remembers an error which made an execution move past given host.
    pub(crate) fn record_host_error(&self, host: &Host, error: Error) {
        debug!(address = %host.address(), %error, "Host failed.");
        lock(&self.tried_hosts).insert(host.address(), error);
    }

    /// Remembers an error which ended an execution. It becomes the handler outcome if no other
    /// execution succeeds.
    pub(crate) fn record_final_error(&self, error: Error) {
        *lock(&self.last_error) = Some(error);
    }

    /// Makes given host unused by new plans for a while, after it reported being unable to serve
    /// requests.
    pub(crate) fn avoid_host(&self, host: &Host) {
        let delay_ms = self.reconnection_policy.new_schedule().next_delay_ms();
        host.avoid_for(Duration::from_millis(delay_ms.max(0) as u64));
    }

    /// Called when an execution ends. The last execution to end completes the handler, unless
    /// it is completed already.
    pub(crate) fn execution_finished(&self) {
        if self.running.fetch_sub(1, Ordering::AcqRel) != 1 || self.is_completed() {
            return;
        }

        let error = lock(&self.last_error).take().unwrap_or_else(|| {
            Error::NoHostAvailable(TriedHosts(std::mem::take(&mut *lock(&self.tried_hosts))))
        });

        self.complete(Err(error));
    }
}
