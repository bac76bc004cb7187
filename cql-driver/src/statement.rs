//! Statements executed by a [`Session`](crate::cluster::Session).
//!
//! A [`Statement`] describes *what* to execute (a query string, a prepared statement or a batch)
//! together with per-statement options, which take precedence over the session-wide
//! [`QueryOptions`](crate::cluster::QueryOptions).

mod prepared_statement;
mod statement_builder;

pub use crate::statement::prepared_statement::PreparedStatement;
pub use crate::statement::statement_builder::StatementBuilder;

use derivative::Derivative;
use std::sync::Arc;

use crate::cluster::QueryOptions;
use crate::consistency::Consistency;
use crate::error::Result;
use crate::frame::message_batch::{BatchQuery, BatchQuerySubj, BatchType, BodyReqBatch};
use crate::frame::message_execute::BodyReqExecute;
use crate::frame::message_query::BodyReqQuery;
use crate::frame::message_request::RequestBody;
use crate::frame::{ProtocolFeature, Version};
use crate::query::{QueryParams, QueryValues};
use crate::retry::RetryPolicy;
use crate::types::{CBytes, CBytesShort, CInt, CLong};

/// Single entry of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatement {
    Simple {
        query: String,
        values: QueryValues,
    },
    Bound {
        prepared: Arc<PreparedStatement>,
        values: QueryValues,
    },
}

impl BatchStatement {
    pub fn simple(query: impl Into<String>) -> Self {
        BatchStatement::Simple {
            query: query.into(),
            values: QueryValues::SimpleValues(vec![]),
        }
    }

    fn to_batch_query(&self) -> BatchQuery {
        match self {
            BatchStatement::Simple { query, values } => {
                BatchQuery::new(BatchQuerySubj::QueryString(query.clone()), values.clone())
            }
            BatchStatement::Bound { prepared, values } => BatchQuery::new(
                BatchQuerySubj::PreparedId(prepared.id.clone()),
                values.clone(),
            ),
        }
    }
}

/// What a statement executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Simple {
        query: String,
        values: Option<QueryValues>,
    },
    Bound {
        prepared: Arc<PreparedStatement>,
        values: Option<QueryValues>,
    },
    Batch {
        batch_type: BatchType,
        statements: Vec<BatchStatement>,
    },
}

/// A statement with its execution options. Options left as `None` fall back to the session
/// defaults.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Statement {
    pub kind: StatementKind,
    pub consistency: Option<Consistency>,
    pub serial_consistency: Option<Consistency>,
    /// Is the statement idempotent. Unknown idempotence is treated as non-idempotent: such
    /// statements are never executed speculatively, nor retried after a write might have
    /// happened.
    pub is_idempotent: Option<bool>,
    /// Custom statement retry policy, overriding the session one.
    #[derivative(Debug = "ignore")]
    pub retry_policy: Option<Arc<dyn RetryPolicy + Send + Sync>>,
    /// Serialized partition key used for token-aware routing.
    pub routing_key: Option<Vec<u8>>,
    /// Statement keyspace. Used for routing, and sent with the request when the protocol
    /// version allows. Prepared statement keyspace is used when not set.
    pub keyspace: Option<String>,
    pub page_size: Option<CInt>,
    pub paging_state: Option<CBytes>,
    /// Default timestamp in microseconds since epoch.
    pub timestamp: Option<CLong>,
    pub tracing: bool,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Statement {
            kind,
            consistency: None,
            serial_consistency: None,
            is_idempotent: None,
            retry_policy: None,
            routing_key: None,
            keyspace: None,
            page_size: None,
            paging_state: None,
            timestamp: None,
            tracing: false,
        }
    }

    /// Creates a statement from query text, without values.
    pub fn simple(query: impl Into<String>) -> Self {
        Statement::new(StatementKind::Simple {
            query: query.into(),
            values: None,
        })
    }

    /// Creates a statement executing a prepared statement with given values.
    pub fn bound(prepared: Arc<PreparedStatement>, values: QueryValues) -> Self {
        Statement::new(StatementKind::Bound {
            prepared,
            values: Some(values),
        })
    }

    pub fn batch(batch_type: BatchType, statements: Vec<BatchStatement>) -> Self {
        Statement::new(StatementKind::Batch {
            batch_type,
            statements,
        })
    }

    /// Keyspace used for routing: the explicit one, or the one of the prepared statement.
    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref().or_else(|| match &self.kind {
            StatementKind::Bound { prepared, .. } => prepared.keyspace(),
            StatementKind::Batch { statements, .. } => {
                statements.iter().find_map(|statement| match statement {
                    BatchStatement::Bound { prepared, .. } => prepared.keyspace(),
                    BatchStatement::Simple { .. } => None,
                })
            }
            StatementKind::Simple { .. } => None,
        })
    }

    #[inline]
    pub fn is_idempotent(&self) -> bool {
        self.is_idempotent == Some(true)
    }

    /// Finds the prepared statement with given id, used by this statement.
    pub fn prepared_statement(&self, id: &CBytesShort) -> Option<&Arc<PreparedStatement>> {
        match &self.kind {
            StatementKind::Bound { prepared, .. } if prepared.id() == id => Some(prepared),
            StatementKind::Batch { statements, .. } => {
                statements.iter().find_map(|statement| match statement {
                    BatchStatement::Bound { prepared, .. } if prepared.id() == id => {
                        Some(prepared)
                    }
                    _ => None,
                })
            }
            _ => None,
        }
    }

    /// Builds the wire request. Session defaults are applied only where `version` can express
    /// them, while explicit statement options are always included, so an unsupported option
    /// results in an error.
    pub fn to_request(&self, options: &QueryOptions, version: Version) -> Result<RequestBody> {
        let consistency = self.consistency.unwrap_or(options.consistency);
        let serial_consistency = self.serial_consistency.or_else(|| {
            version
                .supports(ProtocolFeature::SerialConsistency)
                .then_some(options.serial_consistency)
        });

        let keyspace = self
            .keyspace
            .clone()
            .filter(|_| version.supports(ProtocolFeature::KeyspaceInRequest));

        let request = match &self.kind {
            StatementKind::Simple { query, values } => RequestBody::Query(BodyReqQuery::new(
                query.clone(),
                self.query_params(
                    consistency,
                    serial_consistency,
                    values.clone(),
                    keyspace,
                    options,
                    version,
                ),
            )),
            StatementKind::Bound { prepared, values } => {
                RequestBody::Execute(BodyReqExecute::new(
                    prepared.id.clone(),
                    prepared.result_metadata_id.clone(),
                    self.query_params(
                        consistency,
                        serial_consistency,
                        values.clone(),
                        // prepared statements are bound to their keyspace
                        None,
                        options,
                        version,
                    ),
                ))
            }
            StatementKind::Batch {
                batch_type,
                statements,
            } => {
                let mut batch = BodyReqBatch::new(
                    *batch_type,
                    statements
                        .iter()
                        .map(BatchStatement::to_batch_query)
                        .collect(),
                    consistency,
                    self.serial_consistency.or_else(|| {
                        version
                            .supports(ProtocolFeature::BatchFlags)
                            .then_some(options.serial_consistency)
                    }),
                    self.timestamp,
                    keyspace,
                    None,
                );
                batch.tracing = self.tracing;

                RequestBody::Batch(batch)
            }
        };

        request.check_version(version)?;
        Ok(request)
    }

    fn query_params(
        &self,
        consistency: Consistency,
        serial_consistency: Option<Consistency>,
        values: Option<QueryValues>,
        keyspace: Option<String>,
        options: &QueryOptions,
        version: Version,
    ) -> QueryParams {
        let page_size = self.page_size.or_else(|| {
            version
                .supports(ProtocolFeature::Paging)
                .then_some(options.page_size)
        });

        QueryParams {
            consistency,
            values,
            skip_metadata: false,
            page_size,
            paging_state: self.paging_state.clone(),
            serial_consistency,
            timestamp: self.timestamp,
            keyspace,
            now_in_seconds: None,
            tracing: self.tracing,
        }
    }
}

impl From<&str> for Statement {
    fn from(query: &str) -> Self {
        Statement::simple(query)
    }
}

impl From<String> for Statement {
    fn from(query: String) -> Self {
        Statement::simple(query)
    }
}
