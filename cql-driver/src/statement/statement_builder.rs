use derivative::Derivative;
use std::sync::Arc;

use crate::consistency::Consistency;
use crate::frame::message_batch::BatchType;
use crate::query::QueryValues;
use crate::retry::RetryPolicy;
use crate::statement::{BatchStatement, PreparedStatement, Statement, StatementKind};
use crate::types::{CBytes, CInt, CLong};

#[derive(Derivative)]
#[derivative(Debug)]
pub struct StatementBuilder {
    kind: StatementKind,
    consistency: Option<Consistency>,
    serial_consistency: Option<Consistency>,
    is_idempotent: Option<bool>,
    #[derivative(Debug = "ignore")]
    retry_policy: Option<Arc<dyn RetryPolicy + Send + Sync>>,
    routing_key: Option<Vec<u8>>,
    keyspace: Option<String>,
    page_size: Option<CInt>,
    paging_state: Option<CBytes>,
    timestamp: Option<CLong>,
    tracing: bool,
}

impl StatementBuilder {
    pub fn new(kind: StatementKind) -> StatementBuilder {
        StatementBuilder {
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

    pub fn simple(query: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Simple {
            query: query.into(),
            values: None,
        })
    }

    pub fn bound(prepared: Arc<PreparedStatement>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Bound {
            prepared,
            values: None,
        })
    }

    pub fn batch(batch_type: BatchType) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Batch {
            batch_type,
            statements: vec![],
        })
    }

    /// Sets statement values. Has no effect on batches, whose entries carry own values.
    #[must_use]
    pub fn with_values(mut self, new_values: QueryValues) -> Self {
        match &mut self.kind {
            StatementKind::Simple { values, .. } | StatementKind::Bound { values, .. } => {
                *values = Some(new_values);
            }
            StatementKind::Batch { .. } => {}
        }

        self
    }

    /// Adds a batch entry. Has no effect on non-batch statements.
    #[must_use]
    pub fn add_statement(mut self, statement: BatchStatement) -> Self {
        if let StatementKind::Batch { statements, .. } = &mut self.kind {
            statements.push(statement);
        }

        self
    }

    /// Sets new statement consistency.
    #[must_use]
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Sets new serial consistency, which must be one of the serial levels.
    #[must_use]
    pub fn with_serial_consistency(mut self, serial_consistency: Consistency) -> Self {
        self.serial_consistency = Some(serial_consistency);
        self
    }

    /// Marks the statement as idempotent or not.
    #[must_use]
    pub fn with_idempotent(mut self, is_idempotent: bool) -> Self {
        self.is_idempotent = Some(is_idempotent);
        self
    }

    /// Sets custom statement retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy + Send + Sync>) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    /// Sets the serialized partition key, used for token-aware routing.
    #[must_use]
    pub fn with_routing_key(mut self, routing_key: Vec<u8>) -> Self {
        self.routing_key = Some(routing_key);
        self
    }

    #[must_use]
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: CInt) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn with_paging_state(mut self, paging_state: CBytes) -> Self {
        self.paging_state = Some(paging_state);
        self
    }

    /// Sets the default timestamp, in microseconds since epoch.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: CLong) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    #[must_use]
    pub fn build(self) -> Statement {
        Statement {
            kind: self.kind,
            consistency: self.consistency,
            serial_consistency: self.serial_consistency,
            is_idempotent: self.is_idempotent,
            retry_policy: self.retry_policy,
            routing_key: self.routing_key,
            keyspace: self.keyspace,
            page_size: self.page_size,
            paging_state: self.paging_state,
            timestamp: self.timestamp,
            tracing: self.tracing,
        }
    }
}
