//! Execution engine: run coordination, admission control, job running.

pub mod coordinator;
pub mod rate_limiter;
pub mod runner;

pub use coordinator::{
    run_channel, Coordinator, NodeRunResult, NodeStatus, RunControl, RunHandle, RunOutcome,
    RunSnapshot, RunStatus,
};
pub use rate_limiter::{CounterStore, InMemoryCounterStore, RateLimitDecision, RateLimiter};
pub use runner::{InMemoryJobQueue, JobPayload, JobQueue, JobReport, JobRunner, NodeReport};
