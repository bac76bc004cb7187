use derivative::Derivative;
use std::sync::Arc;
use std::time::Duration;

use crate::cluster::PlainTextCredentials;
use crate::consistency::Consistency;
use crate::frame::Version;
use crate::load_balancing::{LoadBalancingPolicy, RoundRobinPolicy, TokenAwarePolicy};
use crate::retry::{
    DefaultRetryPolicy, ExponentialReconnectionPolicy, ReconnectionPolicy, RetryPolicy,
};
use crate::speculative_execution::{NoSpeculativeExecutionPolicy, SpeculativeExecutionPolicy};
use crate::types::CInt;

const DEFAULT_PAGE_SIZE: CInt = 5000;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
const DEFAULT_TRANSPORT_BUFFER_SIZE: usize = 1024;

/// Policies used by a session.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Policies {
    #[derivative(Debug = "ignore")]
    pub load_balancing_policy: Arc<dyn LoadBalancingPolicy + Send + Sync>,
    #[derivative(Debug = "ignore")]
    pub retry_policy: Arc<dyn RetryPolicy + Send + Sync>,
    #[derivative(Debug = "ignore")]
    pub reconnection_policy: Arc<dyn ReconnectionPolicy + Send + Sync>,
    #[derivative(Debug = "ignore")]
    pub speculative_execution_policy: Arc<dyn SpeculativeExecutionPolicy + Send + Sync>,
}

impl Default for Policies {
    /// Token-aware round-robin load balancing, default retries, exponential reconnection and no
    /// speculative executions.
    fn default() -> Self {
        Policies {
            load_balancing_policy: Arc::new(TokenAwarePolicy::new(Box::new(
                RoundRobinPolicy::new(),
            ))),
            retry_policy: Arc::new(DefaultRetryPolicy),
            reconnection_policy: Arc::new(ExponentialReconnectionPolicy::default()),
            speculative_execution_policy: Arc::new(NoSpeculativeExecutionPolicy),
        }
    }
}

/// Defaults applied to statements which don't specify own values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryOptions {
    pub consistency: Consistency,
    /// Sent only with protocol versions supporting serial consistency.
    pub serial_consistency: Consistency,
    /// Sent only with protocol versions supporting paging.
    pub page_size: CInt,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            consistency: Consistency::LocalOne,
            serial_consistency: Consistency::Serial,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketOptions {
    pub connect_timeout: Duration,
    /// Time to wait for a response, after which the request fails with a timeout.
    pub request_timeout: Duration,
    pub tcp_nodelay: bool,
    /// Number of requests which can be queued for writing on a single connection.
    pub transport_buffer_size: usize,
}

impl Default for SocketOptions {
    fn default() -> Self {
        SocketOptions {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tcp_nodelay: true,
            transport_buffer_size: DEFAULT_TRANSPORT_BUFFER_SIZE,
        }
    }
}

/// Session configuration. Use [`SessionConfigBuilder`] to create one.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub protocol_version: Version,
    pub policies: Policies,
    pub query_options: QueryOptions,
    pub socket_options: SocketOptions,
    pub credentials: Option<PlainTextCredentials>,
    /// Keyspace every connection switches to after startup.
    pub keyspace: Option<String>,
}

#[derive(Default, Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the protocol version used for all connections.
    #[must_use]
    pub fn with_protocol_version(mut self, version: Version) -> Self {
        self.config.protocol_version = version;
        self
    }

    #[must_use]
    pub fn with_load_balancing_policy(
        mut self,
        load_balancing_policy: Arc<dyn LoadBalancingPolicy + Send + Sync>,
    ) -> Self {
        self.config.policies.load_balancing_policy = load_balancing_policy;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy + Send + Sync>) -> Self {
        self.config.policies.retry_policy = retry_policy;
        self
    }

    #[must_use]
    pub fn with_reconnection_policy(
        mut self,
        reconnection_policy: Arc<dyn ReconnectionPolicy + Send + Sync>,
    ) -> Self {
        self.config.policies.reconnection_policy = reconnection_policy;
        self
    }

    #[must_use]
    pub fn with_speculative_execution_policy(
        mut self,
        speculative_execution_policy: Arc<dyn SpeculativeExecutionPolicy + Send + Sync>,
    ) -> Self {
        self.config.policies.speculative_execution_policy = speculative_execution_policy;
        self
    }

    #[must_use]
    pub fn with_query_options(mut self, query_options: QueryOptions) -> Self {
        self.config.query_options = query_options;
        self
    }

    #[must_use]
    pub fn with_socket_options(mut self, socket_options: SocketOptions) -> Self {
        self.config.socket_options = socket_options;
        self
    }

    /// Sets credentials for servers requiring password authentication.
    #[must_use]
    pub fn with_credentials(mut self, credentials: PlainTextCredentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.config.keyspace = Some(keyspace.into());
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}
