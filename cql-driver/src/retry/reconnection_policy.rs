#[cfg(test)]
use mockall::automock;

use crate::error::{Error, Result};

const DEFAULT_BASE_DELAY_MS: i64 = 1000;
const DEFAULT_MAX_DELAY_MS: i64 = 10 * 60 * 1000;

// doubling stops here, since 2^64 no longer fits
const MAX_ATTEMPTS: u32 = 64;

/// Determines the time for the next reconnection attempt when trying to reconnect to a host. A
/// schedule is an infinite sequence, owned by a single reconnecting entity.
pub trait ReconnectionSchedule {
    /// Returns the delay, in milliseconds, before the next reconnection attempt.
    fn next_delay_ms(&mut self) -> i64;
}

/// Creates reconnection schedules when trying to re-establish connections.
#[cfg_attr(test, automock)]
pub trait ReconnectionPolicy {
    /// Creates new schedule when a connection needs to be re-established.
    fn new_schedule(&self) -> Box<dyn ReconnectionSchedule + Send + Sync>;
}

/// Schedules reconnection at constant interval.
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ConstantReconnectionPolicy {
    delay_ms: i64,
}

impl ConstantReconnectionPolicy {
    /// Creates a policy with given delay, which must be positive.
    pub fn new(delay_ms: i64) -> Result<Self> {
        if delay_ms <= 0 {
            return Err(Error::InvalidArgument(format!(
                "Reconnection delay must be positive, got {delay_ms}"
            )));
        }

        Ok(ConstantReconnectionPolicy { delay_ms })
    }

    #[inline]
    pub fn delay_ms(&self) -> i64 {
        self.delay_ms
    }
}

impl Default for ConstantReconnectionPolicy {
    fn default() -> Self {
        ConstantReconnectionPolicy {
            delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl ReconnectionPolicy for ConstantReconnectionPolicy {
    fn new_schedule(&self) -> Box<dyn ReconnectionSchedule + Send + Sync> {
        Box::new(ConstantReconnectionSchedule {
            delay_ms: self.delay_ms,
        })
    }
}

struct ConstantReconnectionSchedule {
    delay_ms: i64,
}

impl ReconnectionSchedule for ConstantReconnectionSchedule {
    fn next_delay_ms(&mut self) -> i64 {
        self.delay_ms
    }
}

/// A reconnection policy that waits exponentially longer between each reconnection attempt, but
/// keeps a constant delay once a maximum delay is reached. Attempt `i` (counting from 1) waits
/// `min(base_delay * 2^(i - 1), max_delay)`.
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ExponentialReconnectionPolicy {
    base_delay_ms: i64,
    max_delay_ms: i64,
}

impl ExponentialReconnectionPolicy {
    /// Creates a policy with given delays. Fails if any delay is negative, or the maximum delay
    /// is smaller than the base one.
    pub fn new(base_delay_ms: i64, max_delay_ms: i64) -> Result<Self> {
        if base_delay_ms < 0 || max_delay_ms < 0 {
            return Err(Error::InvalidArgument(format!(
                "Reconnection delays cannot be negative, got base {base_delay_ms} and max {max_delay_ms}"
            )));
        }

        if max_delay_ms < base_delay_ms {
            return Err(Error::InvalidArgument(format!(
                "Max reconnection delay {max_delay_ms} cannot be smaller than base delay {base_delay_ms}"
            )));
        }

        Ok(ExponentialReconnectionPolicy {
            base_delay_ms,
            max_delay_ms,
        })
    }

    #[inline]
    pub fn base_delay_ms(&self) -> i64 {
        self.base_delay_ms
    }

    #[inline]
    pub fn max_delay_ms(&self) -> i64 {
        self.max_delay_ms
    }
}

impl Default for ExponentialReconnectionPolicy {
    fn default() -> Self {
        ExponentialReconnectionPolicy {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl ReconnectionPolicy for ExponentialReconnectionPolicy {
    fn new_schedule(&self) -> Box<dyn ReconnectionSchedule + Send + Sync> {
        Box::new(ExponentialReconnectionSchedule::new(
            self.base_delay_ms,
            self.max_delay_ms,
        ))
    }
}

struct ExponentialReconnectionSchedule {
    base_delay_ms: i64,
    max_delay_ms: i64,
    attempt: u32,
}

impl ExponentialReconnectionSchedule {
    fn new(base_delay_ms: i64, max_delay_ms: i64) -> Self {
        ExponentialReconnectionSchedule {
            base_delay_ms,
            max_delay_ms,
            attempt: 0,
        }
    }
}

impl ReconnectionSchedule for ExponentialReconnectionSchedule {
    fn next_delay_ms(&mut self) -> i64 {
        if self.attempt >= MAX_ATTEMPTS {
            return self.max_delay_ms;
        }

        let exponent = self.attempt;
        self.attempt += 1;

        1i64.checked_shl(exponent)
            .filter(|factor| *factor > 0)
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .map(|delay| delay.min(self.max_delay_ms))
            .unwrap_or(self.max_delay_ms)
    }
}
