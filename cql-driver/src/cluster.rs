//! Cluster access: hosts and metadata, connections and their pooling, request execution and the
//! session tying it all together.

pub use crate::cluster::cluster_metadata::ClusterMetadata;
pub use crate::cluster::connection_manager::{startup, ConnectionManager, PlainTextCredentials};
pub use crate::cluster::connection_pool::ConnectionPool;
pub use crate::cluster::request_handler::RequestHandler;
pub use crate::cluster::session::Session;
pub use crate::cluster::session_config::{
    Policies, QueryOptions, SessionConfig, SessionConfigBuilder, SocketOptions,
};
pub use crate::cluster::tcp_connection_manager::TcpConnectionManager;
pub use crate::cluster::tcp_connection_pool::TcpConnectionPool;
pub use crate::cluster::token_map::TokenMap;
pub use crate::cluster::topology_metadata::TopologyMetadata;

mod cluster_metadata;
mod connection_manager;
mod connection_pool;
mod request_execution;
mod request_handler;
mod session;
mod session_config;
mod tcp_connection_manager;
mod tcp_connection_pool;
mod token_map;
pub mod topology;
mod topology_metadata;
