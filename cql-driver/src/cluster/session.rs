use derivative::Derivative;
use futures::StreamExt;
use fxhash::FxHashMap;
use std::sync::Arc;
use tracing::*;

use crate::cluster::topology::HostDistance;
use crate::cluster::{ClusterMetadata, ConnectionPool, RequestHandler, SessionConfig, TcpConnectionPool};
use crate::error::{Error, Result, TriedHosts};
use crate::frame::message_prepare::BodyReqPrepare;
use crate::frame::message_request::RequestBody;
use crate::frame::Response;
use crate::statement::{PreparedStatement, Statement};

/// Entry point for executing statements against a cluster.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Session {
    config: SessionConfig,
    #[derivative(Debug = "ignore")]
    cluster: Arc<dyn ClusterMetadata>,
    #[derivative(Debug = "ignore")]
    pool: Arc<dyn ConnectionPool>,
}

impl Session {
    /// Creates a session connecting to hosts with [`TcpConnectionPool`]. Connections are
    /// established lazily, when the first request reaches a host.
    pub fn new(config: SessionConfig, cluster: Arc<dyn ClusterMetadata>) -> Self {
        let pool = TcpConnectionPool::new(&config);
        Self::with_pool(config, cluster, pool)
    }

    pub fn with_pool(
        config: SessionConfig,
        cluster: Arc<dyn ClusterMetadata>,
        pool: Arc<dyn ConnectionPool>,
    ) -> Self {
        Session {
            config,
            cluster,
            pool,
        }
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn cluster(&self) -> &Arc<dyn ClusterMetadata> {
        &self.cluster
    }

    /// Creates a handler driving given statement. Useful when the request needs to be cancelled
    /// from elsewhere.
    pub fn request_handler(&self, statement: Statement) -> RequestHandler {
        RequestHandler::new(
            statement,
            &self.config,
            self.cluster.clone(),
            self.pool.clone(),
        )
    }

    /// Executes given statement.
    pub async fn execute(&self, statement: Statement) -> Result<Response> {
        self.request_handler(statement).send().await
    }

    /// Executes a query without values, with default options.
    pub async fn query(&self, query: impl Into<String>) -> Result<Response> {
        self.execute(Statement::simple(query)).await
    }

    /// Prepares given query on the first host of the query plan which is able to do it. The
    /// statement is prepared again transparently, if some host later reports not knowing it.
    pub async fn prepare(&self, query: impl Into<String>) -> Result<Arc<PreparedStatement>> {
        let query = query.into();
        let request = RequestBody::Prepare(BodyReqPrepare::new(query.clone(), None));
        let policy = &self.config.policies.load_balancing_policy;
        let mut plan = policy.new_query_plan(None, self.cluster.as_ref());
        let mut tried_hosts = FxHashMap::default();

        while let Some(host) = plan.next().await {
            if !host.is_considerably_up()
                || policy.distance(&host, self.cluster.as_ref()) == HostDistance::Ignored
            {
                continue;
            }

            let result = match self.pool.borrow_connection(&host).await {
                Ok(connection) => connection.send(&request).await,
                Err(error) => Err(error),
            };

            match result {
                Ok(response) => {
                    let opcode = response.opcode();
                    let prepared = response
                        .into_body()
                        .into_prepared()
                        .ok_or(Error::UnexpectedResponse(opcode))?;

                    debug!(address = %host.address(), %query, "Statement prepared.");

                    return Ok(Arc::new(PreparedStatement::new(
                        prepared.id,
                        prepared.result_metadata_id,
                        query,
                        self.config.keyspace.clone(),
                    )));
                }
                Err(error) if error.is_connection_level() => {
                    // preparing has no side effects, so any host will do
                    if matches!(error, Error::Io(_) | Error::ConnectionClosed(_)) {
                        self.pool.mark_down(&host);
                    }

                    debug!(address = %host.address(), %error, "Cannot prepare statement.");
                    tried_hosts.insert(host.address(), error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(Error::NoHostAvailable(TriedHosts(tried_hosts)))
    }
}
