use bytemuck::NoUninit;
use derive_more::Display;

/// The state of a host, as viewed from the driver.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, NoUninit)]
#[repr(u8)]
pub enum HostState {
    /// A host is considered up until a connection to it fails. Hosts learned from topology start
    /// in this state, since the driver has no reason to distrust them.
    Up,
    /// The driver has lost its connection to the host and is trying to reconnect in the
    /// background, according to the configured reconnection policy.
    Down,
}
