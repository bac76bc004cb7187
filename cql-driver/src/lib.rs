//! Async CQL driver core.
//!
//! ## Getting started
//!
//! This example connects to a single node using the default policies: token-aware round-robin
//! load balancing, the default retry policy and exponential reconnection backoff.
//!
//! ```no_run
//! use cql_driver::cluster::{Session, SessionConfigBuilder, TopologyMetadata};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cluster = Arc::new(TopologyMetadata::with_contact_points(["127.0.0.1:9042"
//!         .parse()
//!         .unwrap()]));
//!     let session = Session::new(SessionConfigBuilder::new().build(), cluster);
//!
//!     let create_ks = "CREATE KEYSPACE IF NOT EXISTS test_ks WITH REPLICATION = { \
//!                      'class' : 'SimpleStrategy', 'replication_factor' : 1 };";
//!     session
//!         .query(create_ks)
//!         .await
//!         .expect("Keyspace create error");
//! }
//! ```
//!
//! ## Request execution
//!
//! Every statement is driven by a [`RequestHandler`](crate::cluster::RequestHandler). The handler
//! asks the [load balancing policy](crate::load_balancing) for a query plan, sends the request to
//! the first usable host and, for idempotent statements, may start
//! [speculative executions](crate::speculative_execution) against further hosts. Server errors
//! are adjudicated by the [retry policy](crate::retry), while connection failures make the
//! handler fail over to the next host in the plan. The handler completes exactly once.

pub mod cluster;
pub mod frame_parser;
pub mod future;
pub mod load_balancing;
pub mod retry;
pub mod speculative_execution;
pub mod statement;
pub mod transport;

pub use cql_protocol::consistency;
pub use cql_protocol::error;
pub use cql_protocol::frame;
pub use cql_protocol::query;
pub use cql_protocol::token;
pub use cql_protocol::types;

pub type Error = error::Error;
pub type Result<T> = error::Result<T>;
