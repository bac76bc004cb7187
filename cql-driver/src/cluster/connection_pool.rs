use std::sync::Arc;

#[cfg(test)]
use mockall::*;

use crate::cluster::topology::Host;
use crate::error::Result;
use crate::future::BoxFuture;
use crate::transport::Connection;

/// Source of connections to hosts, which also tracks host availability.
pub trait ConnectionPool: Send + Sync {
    /// Returns a ready to use connection to given host, establishing one if needed.
    fn borrow_connection<'a>(
        &'a self,
        host: &'a Arc<Host>,
    ) -> BoxFuture<'a, Result<Arc<dyn Connection>>>;

    /// Marks given host as down after a connection failure. The pool is responsible for bringing
    /// it back up.
    fn mark_down(&self, host: &Arc<Host>);
}

#[cfg(test)]
mock! {
    pub ConnectionPool {
    }

    impl ConnectionPool for ConnectionPool {
        fn borrow_connection(
            &self,
            host: &Arc<Host>,
        ) -> BoxFuture<'static, Result<Arc<dyn Connection>>>;

        fn mark_down(&self, host: &Arc<Host>);
    }
}
