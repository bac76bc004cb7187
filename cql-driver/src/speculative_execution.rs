//! Pre-emptively query another host if the current one takes too long to respond.
//!
//! Sometimes a node might be experiencing difficulties (ex: long GC pause) and take longer than
//! usual to reply. Queries sent to that node will experience bad latency.
//!
//! One thing we can do to improve that is pre-emptively start a second execution of the query
//! against another host, before the first host has replied or errored out. If that second host
//! replies faster, we can send the response back to the client. We also cancel the first
//! execution.
//!
//! Turning on speculative executions doesn't change the driver's retry behavior. Each parallel
//! execution will trigger retries independently. Speculative executions are only ever started for
//! statements explicitly marked as idempotent.

use crate::cluster::topology::Host;
use crate::error::{Error, Result};
use crate::statement::Statement;

/// Schedule of speculative executions for a single request.
pub trait SpeculativeExecutionPlan {
    /// Returns the delay in milliseconds until the next execution should be started, given the
    /// host used by the last one. A value `<= 0` means no further execution should be scheduled.
    fn next_execution(&mut self, last_host: Option<&Host>) -> i64;
}

/// The policy that decides if the driver will send speculative queries to the next hosts when
/// the current host takes too long to respond.
pub trait SpeculativeExecutionPolicy {
    /// Creates a new plan for given request.
    fn new_plan(
        &self,
        keyspace: Option<&str>,
        statement: &Statement,
    ) -> Box<dyn SpeculativeExecutionPlan + Send>;
}

/// Never schedules speculative executions.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoSpeculativeExecutionPolicy;

impl SpeculativeExecutionPolicy for NoSpeculativeExecutionPolicy {
    fn new_plan(
        &self,
        _keyspace: Option<&str>,
        _statement: &Statement,
    ) -> Box<dyn SpeculativeExecutionPlan + Send> {
        Box::new(NoSpeculativeExecutionPlan)
    }
}

struct NoSpeculativeExecutionPlan;

impl SpeculativeExecutionPlan for NoSpeculativeExecutionPlan {
    fn next_execution(&mut self, _last_host: Option<&Host>) -> i64 {
        0
    }
}

/// A policy that schedules a configurable number of speculative executions, separated by a fixed
/// delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstantSpeculativeExecutionPolicy {
    delay_ms: i64,
    max_speculative_executions: usize,
}

impl ConstantSpeculativeExecutionPolicy {
    /// Creates a new policy. The delay cannot be negative and at least one speculative execution
    /// must be allowed.
    pub fn new(delay_ms: i64, max_speculative_executions: usize) -> Result<Self> {
        if delay_ms < 0 {
            return Err(Error::InvalidArgument(format!(
                "Speculative execution delay cannot be negative, got {delay_ms}"
            )));
        }

        if max_speculative_executions == 0 {
            return Err(Error::InvalidArgument(
                "Max speculative executions must be positive".into(),
            ));
        }

        Ok(ConstantSpeculativeExecutionPolicy {
            delay_ms,
            max_speculative_executions,
        })
    }
}

impl SpeculativeExecutionPolicy for ConstantSpeculativeExecutionPolicy {
    fn new_plan(
        &self,
        _keyspace: Option<&str>,
        _statement: &Statement,
    ) -> Box<dyn SpeculativeExecutionPlan + Send> {
        Box::new(ConstantSpeculativeExecutionPlan {
            delay_ms: self.delay_ms,
            remaining: self.max_speculative_executions,
        })
    }
}

struct ConstantSpeculativeExecutionPlan {
    delay_ms: i64,
    remaining: usize,
}

impl SpeculativeExecutionPlan for ConstantSpeculativeExecutionPlan {
    fn next_execution(&mut self, _last_host: Option<&Host>) -> i64 {
        if self.remaining == 0 {
            return 0;
        }

        self.remaining -= 1;

        // a zero delay still means "start another execution right away"
        self.delay_ms.max(1)
    }
}
