use futures::FutureExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::*;

use crate::cluster::connection_manager::{startup, ConnectionManager};
use crate::cluster::{PlainTextCredentials, SocketOptions};
use crate::error::{Error, Result};
use crate::frame::Version;
use crate::future::BoxFuture;
use crate::transport::{Connection, TransportTcp};

/// Establishes TCP connections and performs the protocol handshake on them.
#[derive(Debug, Clone)]
pub struct TcpConnectionManager {
    version: Version,
    socket_options: SocketOptions,
    credentials: Option<PlainTextCredentials>,
    keyspace: Option<String>,
}

impl TcpConnectionManager {
    pub fn new(
        version: Version,
        socket_options: SocketOptions,
        credentials: Option<PlainTextCredentials>,
        keyspace: Option<String>,
    ) -> Self {
        TcpConnectionManager {
            version,
            socket_options,
            credentials,
            keyspace,
        }
    }

    async fn establish_connection(&self, addr: SocketAddr) -> Result<TransportTcp> {
        let transport = timeout(
            self.socket_options.connect_timeout,
            TransportTcp::new(
                addr,
                self.version,
                self.socket_options.request_timeout,
                self.socket_options.transport_buffer_size,
                self.socket_options.tcp_nodelay,
            ),
        )
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "Cannot connect to {addr} within {:?}",
                self.socket_options.connect_timeout
            ))
        })??;

        startup(
            &transport,
            self.credentials.as_ref(),
            self.keyspace.as_deref(),
        )
        .await?;

        debug!(%addr, version = %self.version, "Connection established.");
        Ok(transport)
    }
}

impl ConnectionManager for TcpConnectionManager {
    fn connection<'a>(&'a self, addr: SocketAddr) -> BoxFuture<'a, Result<Arc<dyn Connection>>> {
        async move {
            self.establish_connection(addr)
                .await
                .map(|transport| Arc::new(transport) as Arc<dyn Connection>)
        }
        .boxed()
    }
}
