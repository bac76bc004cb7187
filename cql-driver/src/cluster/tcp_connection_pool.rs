use futures::FutureExt;
use fxhash::FxHashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::sleep;
use tracing::*;

use crate::cluster::connection_manager::ConnectionManager;
use crate::cluster::tcp_connection_manager::TcpConnectionManager;
use crate::cluster::topology::Host;
use crate::cluster::{ConnectionPool, SessionConfig};
use crate::error::Result;
use crate::future::BoxFuture;
use crate::retry::{ReconnectionPolicy, ReconnectionSchedule};
use crate::transport::Connection;

#[derive(Default)]
struct HostSlot {
    connection: tokio::sync::Mutex<Option<Arc<dyn Connection>>>,
    reconnecting: AtomicBool,
}

/// Connection pool holding a single multiplexed connection per host. Connections are established
/// lazily, on first use. When a host fails, it is marked down and reconnected in the background,
/// following the reconnection policy schedule, until a connection succeeds.
pub struct TcpConnectionPool {
    connection_manager: Arc<dyn ConnectionManager>,
    reconnection_policy: Arc<dyn ReconnectionPolicy + Send + Sync>,
    slots: Mutex<FxHashMap<SocketAddr, Arc<HostSlot>>>,
    this: Weak<TcpConnectionPool>,
}

impl TcpConnectionPool {
    pub fn new(config: &SessionConfig) -> Arc<Self> {
        Self::with_connection_manager(
            Arc::new(TcpConnectionManager::new(
                config.protocol_version,
                config.socket_options,
                config.credentials.clone(),
                config.keyspace.clone(),
            )),
            config.policies.reconnection_policy.clone(),
        )
    }

    pub fn with_connection_manager(
        connection_manager: Arc<dyn ConnectionManager>,
        reconnection_policy: Arc<dyn ReconnectionPolicy + Send + Sync>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| TcpConnectionPool {
            connection_manager,
            reconnection_policy,
            slots: Default::default(),
            this: this.clone(),
        })
    }

    fn slot(&self, addr: SocketAddr) -> Arc<HostSlot> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(addr)
            .or_default()
            .clone()
    }

    async fn connect(&self, host: &Arc<Host>) -> Result<Arc<dyn Connection>> {
        let slot = self.slot(host.address());

        // held while connecting, so concurrent requests wait for a single connection attempt
        let mut connection = slot.connection.lock().await;
        if let Some(connection) = connection.as_ref().filter(|c| !c.is_broken()) {
            return Ok(connection.clone());
        }

        match self.connection_manager.connection(host.address()).await {
            Ok(new_connection) => {
                *connection = Some(new_connection.clone());
                if !host.is_up() {
                    info!(address = %host.address(), "Host is up.");
                    host.set_up();
                }

                Ok(new_connection)
            }
            Err(error) => {
                *connection = None;
                drop(connection);

                warn!(address = %host.address(), %error, "Cannot connect to host.");
                self.mark_down(host);
                Err(error)
            }
        }
    }

    fn start_reconnecting(&self, host: Arc<Host>, slot: Arc<HostSlot>) {
        if slot.reconnecting.swap(true, Ordering::AcqRel) {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(Self::reconnect(
                    self.this.clone(),
                    host,
                    slot,
                    self.reconnection_policy.new_schedule(),
                ));
            }
            Err(_) => {
                warn!(address = %host.address(), "No runtime available for reconnection.");
                slot.reconnecting.store(false, Ordering::Release);
            }
        }
    }

    async fn reconnect(
        pool: Weak<TcpConnectionPool>,
        host: Arc<Host>,
        slot: Arc<HostSlot>,
        mut schedule: Box<dyn ReconnectionSchedule + Send + Sync>,
    ) {
        loop {
            let delay_ms = schedule.next_delay_ms();
            debug!(address = %host.address(), delay_ms, "Scheduling reconnection.");
            sleep(Duration::from_millis(delay_ms.max(0) as u64)).await;

            if host.is_up() {
                break;
            }

            let Some(pool) = pool.upgrade() else {
                return;
            };

            match pool.connection_manager.connection(host.address()).await {
                Ok(connection) => {
                    *slot.connection.lock().await = Some(connection);
                    info!(address = %host.address(), "Host reconnected.");
                    host.set_up();
                    break;
                }
                Err(error) => {
                    debug!(address = %host.address(), %error, "Reconnection failed.");
                }
            }
        }

        slot.reconnecting.store(false, Ordering::Release);
    }
}

impl ConnectionPool for TcpConnectionPool {
    fn borrow_connection<'a>(
        &'a self,
        host: &'a Arc<Host>,
    ) -> BoxFuture<'a, Result<Arc<dyn Connection>>> {
        self.connect(host).boxed()
    }

    fn mark_down(&self, host: &Arc<Host>) {
        if host.set_down() {
            warn!(address = %host.address(), "Host is down.");
        }

        let slot = self.slot(host.address());
        if let Ok(mut connection) = slot.connection.try_lock() {
            *connection = None;
        }

        self.start_reconnecting(host.clone(), slot);
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use std::io;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cluster::connection_manager::MockConnectionManager;
    use crate::cluster::topology::Host;
    use crate::cluster::{ConnectionPool, TcpConnectionPool};
    use crate::error::Error;
    use crate::retry::ConstantReconnectionPolicy;
    use crate::transport::{Connection, MockConnection};

    fn address() -> SocketAddr {
        "127.0.0.1:9042".parse().unwrap()
    }

    fn connection(is_broken: bool) -> Arc<dyn Connection> {
        let mut connection = MockConnection::new();
        connection.expect_is_broken().return_const(is_broken);
        connection.expect_address().return_const(address());
        Arc::new(connection)
    }

    fn reconnection_policy() -> Arc<ConstantReconnectionPolicy> {
        Arc::new(ConstantReconnectionPolicy::new(100).unwrap())
    }

    #[tokio::test]
    async fn should_reuse_connection() {
        let mut manager = MockConnectionManager::new();
        manager
            .expect_connection()
            .times(1)
            .returning(|_| async { Ok(connection(false)) }.boxed());

        let pool = TcpConnectionPool::with_connection_manager(
            Arc::new(manager),
            reconnection_policy(),
        );
        let host = Arc::new(Host::with_address(address()));

        let first = pool.borrow_connection(&host).await.unwrap();
        let second = pool.borrow_connection(&host).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn should_replace_broken_connection() {
        let connections = Arc::new(AtomicUsize::new(0));
        let manager_connections = connections.clone();

        let mut manager = MockConnectionManager::new();
        manager.expect_connection().times(2).returning(move |_| {
            // the first connection breaks right away
            let is_broken = manager_connections.fetch_add(1, Ordering::SeqCst) == 0;
            async move { Ok(connection(is_broken)) }.boxed()
        });

        let pool = TcpConnectionPool::with_connection_manager(
            Arc::new(manager),
            reconnection_policy(),
        );
        let host = Arc::new(Host::with_address(address()));

        pool.borrow_connection(&host).await.unwrap();
        let connection = pool.borrow_connection(&host).await.unwrap();

        assert!(!connection.is_broken());
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_mark_host_down_and_reconnect() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let manager_attempts = attempts.clone();

        let mut manager = MockConnectionManager::new();
        manager.expect_connection().returning(move |_| {
            let attempt = manager_attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionRefused,
                        "refused",
                    )))
                } else {
                    Ok(connection(false))
                }
            }
            .boxed()
        });

        let pool = TcpConnectionPool::with_connection_manager(
            Arc::new(manager),
            reconnection_policy(),
        );
        let host = Arc::new(Host::with_address(address()));

        assert!(pool.borrow_connection(&host).await.is_err());
        assert!(!host.is_up());

        // first reconnection attempt fails, the second one succeeds
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(host.is_up());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        pool.borrow_connection(&host).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_reconnect_after_mark_down() {
        let mut manager = MockConnectionManager::new();
        manager
            .expect_connection()
            .times(2)
            .returning(|_| async { Ok(connection(false)) }.boxed());

        let pool = TcpConnectionPool::with_connection_manager(
            Arc::new(manager),
            reconnection_policy(),
        );
        let host = Arc::new(Host::with_address(address()));

        pool.borrow_connection(&host).await.unwrap();
        pool.mark_down(&host);
        pool.mark_down(&host);
        assert!(!host.is_up());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(host.is_up());
    }
}
