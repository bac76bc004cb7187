use derive_more::Display;
#[cfg(test)]
use mockall::automock;
use tracing::*;

use crate::consistency::Consistency;
use crate::frame::message_error::WriteType;
use crate::statement::Statement;

/// What to do with a request which failed with a timeout or unavailable error.
#[derive(Debug, PartialEq, Eq, Ord, PartialOrd, Hash, Copy, Clone, Display)]
pub enum RetryDecision {
    /// Give up and return the error to the caller.
    #[display("rethrow")]
    Rethrow,
    /// Send the request again on the same connection, at given consistency.
    #[display("retry at {_0}")]
    Retry(Consistency),
    /// Pretend the request succeeded with an empty result.
    #[display("ignore")]
    Ignore,
}

/// Retry policy determines what to do in case of server-side timeouts and unavailability. Each
/// function receives the number of retries already made for the current execution.
#[cfg_attr(test, automock)]
pub trait RetryPolicy {
    /// Called when the coordinator timed out waiting for replicas during a read.
    fn on_read_timeout(
        &self,
        statement: &Statement,
        consistency: Consistency,
        required_responses: i32,
        received_responses: i32,
        data_retrieved: bool,
        retry_count: usize,
    ) -> RetryDecision;

    /// Called when the coordinator timed out waiting for replica acknowledgements during a write.
    fn on_write_timeout(
        &self,
        statement: &Statement,
        consistency: Consistency,
        write_type: WriteType,
        required_acks: i32,
        received_acks: i32,
        retry_count: usize,
    ) -> RetryDecision;

    /// Called when the coordinator knew upfront that not enough replicas were alive.
    fn on_unavailable(
        &self,
        statement: &Statement,
        consistency: Consistency,
        required_replicas: i32,
        alive_replicas: i32,
        retry_count: usize,
    ) -> RetryDecision;
}

/// Default retry policy - retries once when there is a high chance that a retry might help.
/// Unavailable errors are never retried, since the same coordinator would most probably
/// answer the same way.
#[derive(Default, Debug, Clone, Copy)]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn on_read_timeout(
        &self,
        _statement: &Statement,
        consistency: Consistency,
        required_responses: i32,
        received_responses: i32,
        data_retrieved: bool,
        retry_count: usize,
    ) -> RetryDecision {
        // enough replicas answered, but the one asked for data did not
        if retry_count == 0 && received_responses >= required_responses && !data_retrieved {
            RetryDecision::Retry(consistency)
        } else {
            RetryDecision::Rethrow
        }
    }

    fn on_write_timeout(
        &self,
        _statement: &Statement,
        consistency: Consistency,
        write_type: WriteType,
        _required_acks: i32,
        _received_acks: i32,
        retry_count: usize,
    ) -> RetryDecision {
        if retry_count == 0 && write_type == WriteType::BatchLog {
            RetryDecision::Retry(consistency)
        } else {
            RetryDecision::Rethrow
        }
    }

    fn on_unavailable(
        &self,
        _statement: &Statement,
        _consistency: Consistency,
        _required_replicas: i32,
        _alive_replicas: i32,
        _retry_count: usize,
    ) -> RetryDecision {
        RetryDecision::Rethrow
    }
}

/// Forwards all errors directly to the caller, never retries.
#[derive(Default, Debug, Clone, Copy)]
pub struct FallthroughRetryPolicy;

impl RetryPolicy for FallthroughRetryPolicy {
    fn on_read_timeout(
        &self,
        _statement: &Statement,
        _consistency: Consistency,
        _required_responses: i32,
        _received_responses: i32,
        _data_retrieved: bool,
        _retry_count: usize,
    ) -> RetryDecision {
        RetryDecision::Rethrow
    }

    fn on_write_timeout(
        &self,
        _statement: &Statement,
        _consistency: Consistency,
        _write_type: WriteType,
        _required_acks: i32,
        _received_acks: i32,
        _retry_count: usize,
    ) -> RetryDecision {
        RetryDecision::Rethrow
    }

    fn on_unavailable(
        &self,
        _statement: &Statement,
        _consistency: Consistency,
        _required_replicas: i32,
        _alive_replicas: i32,
        _retry_count: usize,
    ) -> RetryDecision {
        RetryDecision::Rethrow
    }
}

/// Retries with a lower consistency level when the original one is known to be unreachable, and
/// behaves like [`DefaultRetryPolicy`] otherwise. Serial consistencies are never downgraded.
///
/// Downgrading weakens the guarantees the caller asked for, so this policy should only be used
/// when reading stale data or partially applied writes is acceptable.
#[derive(Default, Debug, Clone, Copy)]
pub struct DowngradingConsistencyRetryPolicy;

impl DowngradingConsistencyRetryPolicy {
    fn max_likely_to_work(known_ok: i32, consistency: Consistency) -> RetryDecision {
        let decision = if known_ok >= 3 {
            RetryDecision::Retry(Consistency::Three)
        } else if known_ok == 2 {
            RetryDecision::Retry(Consistency::Two)
        } else if known_ok == 1 || consistency == Consistency::EachQuorum {
            // EACH_QUORUM doesn't report a global number of alive replicas, so there might be one
            // up in another datacenter
            RetryDecision::Retry(Consistency::One)
        } else {
            RetryDecision::Rethrow
        };

        if let RetryDecision::Retry(new_consistency) = decision {
            debug!(%consistency, %new_consistency, "Downgrading consistency.");
        }

        decision
    }
}

impl RetryPolicy for DowngradingConsistencyRetryPolicy {
    fn on_read_timeout(
        &self,
        _statement: &Statement,
        consistency: Consistency,
        required_responses: i32,
        received_responses: i32,
        data_retrieved: bool,
        retry_count: usize,
    ) -> RetryDecision {
        if retry_count != 0 || consistency.is_serial() {
            return RetryDecision::Rethrow;
        }

        if received_responses < required_responses {
            Self::max_likely_to_work(received_responses, consistency)
        } else if !data_retrieved {
            RetryDecision::Retry(consistency)
        } else {
            RetryDecision::Rethrow
        }
    }

    fn on_write_timeout(
        &self,
        _statement: &Statement,
        consistency: Consistency,
        write_type: WriteType,
        _required_acks: i32,
        received_acks: i32,
        retry_count: usize,
    ) -> RetryDecision {
        if retry_count != 0 || consistency.is_serial() {
            return RetryDecision::Rethrow;
        }

        match write_type {
            // at least one replica persisted the write, hinted handoff takes care of the rest
            WriteType::Simple | WriteType::Batch if received_acks > 0 => RetryDecision::Ignore,
            // only part of the batch could have been persisted
            WriteType::UnloggedBatch => Self::max_likely_to_work(received_acks, consistency),
            WriteType::BatchLog => RetryDecision::Retry(consistency),
            _ => RetryDecision::Rethrow,
        }
    }

    fn on_unavailable(
        &self,
        _statement: &Statement,
        consistency: Consistency,
        _required_replicas: i32,
        alive_replicas: i32,
        retry_count: usize,
    ) -> RetryDecision {
        if retry_count != 0 || consistency.is_serial() {
            return RetryDecision::Rethrow;
        }

        Self::max_likely_to_work(alive_replicas, consistency)
    }
}

/// Consults the child on write timeouts only for statements explicitly marked as idempotent;
/// otherwise rethrows, since the write might have been applied. Read timeouts and unavailable errors are
/// decided by the child policy, since retrying them cannot duplicate side effects.
pub struct IdempotenceAwareRetryPolicy {
    child: Box<dyn RetryPolicy + Send + Sync>,
}

impl IdempotenceAwareRetryPolicy {
    pub fn new(child: Box<dyn RetryPolicy + Send + Sync>) -> Self {
        IdempotenceAwareRetryPolicy { child }
    }
}

impl RetryPolicy for IdempotenceAwareRetryPolicy {
    fn on_read_timeout(
        &self,
        statement: &Statement,
        consistency: Consistency,
        required_responses: i32,
        received_responses: i32,
        data_retrieved: bool,
        retry_count: usize,
    ) -> RetryDecision {
        self.child.on_read_timeout(
            statement,
            consistency,
            required_responses,
            received_responses,
            data_retrieved,
            retry_count,
        )
    }

    fn on_write_timeout(
        &self,
        statement: &Statement,
        consistency: Consistency,
        write_type: WriteType,
        required_acks: i32,
        received_acks: i32,
        retry_count: usize,
    ) -> RetryDecision {
        if statement.is_idempotent != Some(true) {
            return RetryDecision::Rethrow;
        }

        self.child.on_write_timeout(
            statement,
            consistency,
            write_type,
            required_acks,
            received_acks,
            retry_count,
        )
    }

    fn on_unavailable(
        &self,
        statement: &Statement,
        consistency: Consistency,
        required_replicas: i32,
        alive_replicas: i32,
        retry_count: usize,
    ) -> RetryDecision {
        self.child.on_unavailable(
            statement,
            consistency,
            required_replicas,
            alive_replicas,
            retry_count,
        )
    }
}

/// Logs every decision of the child policy other than rethrow.
pub struct LoggingRetryPolicy {
    child: Box<dyn RetryPolicy + Send + Sync>,
}

impl LoggingRetryPolicy {
    pub fn new(child: Box<dyn RetryPolicy + Send + Sync>) -> Self {
        LoggingRetryPolicy { child }
    }
}

impl RetryPolicy for LoggingRetryPolicy {
    fn on_read_timeout(
        &self,
        statement: &Statement,
        consistency: Consistency,
        required_responses: i32,
        received_responses: i32,
        data_retrieved: bool,
        retry_count: usize,
    ) -> RetryDecision {
        let decision = self.child.on_read_timeout(
            statement,
            consistency,
            required_responses,
            received_responses,
            data_retrieved,
            retry_count,
        );

        if decision != RetryDecision::Rethrow {
            info!(
                %decision,
                %consistency,
                required_responses,
                received_responses,
                data_retrieved,
                retry_count,
                "Read timeout."
            );
        }

        decision
    }

    fn on_write_timeout(
        &self,
        statement: &Statement,
        consistency: Consistency,
        write_type: WriteType,
        required_acks: i32,
        received_acks: i32,
        retry_count: usize,
    ) -> RetryDecision {
        let decision = self.child.on_write_timeout(
            statement,
            consistency,
            write_type,
            required_acks,
            received_acks,
            retry_count,
        );

        if decision != RetryDecision::Rethrow {
            info!(
                %decision,
                %consistency,
                %write_type,
                required_acks,
                received_acks,
                retry_count,
                "Write timeout."
            );
        }

        decision
    }

    fn on_unavailable(
        &self,
        statement: &Statement,
        consistency: Consistency,
        required_replicas: i32,
        alive_replicas: i32,
        retry_count: usize,
    ) -> RetryDecision {
        let decision = self.child.on_unavailable(
            statement,
            consistency,
            required_replicas,
            alive_replicas,
            retry_count,
        );

        if decision != RetryDecision::Rethrow {
            info!(
                %decision,
                %consistency,
                required_replicas,
                alive_replicas,
                retry_count,
                "Unavailable."
            );
        }

        decision
    }
}
