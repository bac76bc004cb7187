mod reconnection_policy;
mod retry_policy;

pub use crate::retry::reconnection_policy::{
    ConstantReconnectionPolicy, ExponentialReconnectionPolicy, ReconnectionPolicy,
    ReconnectionSchedule,
};
pub use crate::retry::retry_policy::{
    DefaultRetryPolicy, DowngradingConsistencyRetryPolicy, FallthroughRetryPolicy,
    IdempotenceAwareRetryPolicy, LoggingRetryPolicy, RetryDecision, RetryPolicy,
};

#[cfg(test)]
pub(crate) use crate::retry::reconnection_policy::MockReconnectionPolicy;
#[cfg(test)]
pub(crate) use crate::retry::retry_policy::MockRetryPolicy;
