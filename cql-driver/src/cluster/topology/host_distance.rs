use derive_more::Display;

/// Determines how the driver treats a host, as decided by the load balancing policy.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Display)]
pub enum HostDistance {
    /// Preferred host, usually in the local datacenter. Query plans try these first.
    Local,
    /// Usable host which is tried only after local ones, e.g. a failover host in a remote
    /// datacenter.
    Remote,
    /// The driver never sends requests to this host.
    Ignored,
}
