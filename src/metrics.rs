//! Engine metrics over the `metrics` facade.
//!
//! ## Counters
//! - `weft_runs_total` - workflow runs by outcome
//! - `weft_nodes_executed_total` - node executions by kind and status
//! - `weft_jobs_total` - queue jobs by outcome
//! - `weft_admission_denied_total` - rate-limited admissions by identifier
//!
//! ## Histograms
//! - `weft_run_duration_seconds`
//! - `weft_node_duration_seconds` by kind
//!
//! ## Gauges
//! - `weft_active_runs`
//!
//! Installing a recorder (and exposing it anywhere) is the embedding
//! application's concern.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record a finished workflow run.
pub fn record_run(outcome: &str) {
    counter!(
        "weft_runs_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record run duration.
pub fn record_run_duration(duration: Duration, workflow_id: &str) {
    histogram!(
        "weft_run_duration_seconds",
        "workflow" => workflow_id.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a node execution.
pub fn record_node_execution(kind: &str, status: &str) {
    counter!(
        "weft_nodes_executed_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record node execution duration.
pub fn record_node_duration(duration: Duration, kind: &str) {
    histogram!(
        "weft_node_duration_seconds",
        "kind" => kind.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a processed queue job.
pub fn record_job(outcome: &str) {
    counter!(
        "weft_jobs_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a denied admission check.
pub fn record_admission_denied(identifier: &str) {
    counter!(
        "weft_admission_denied_total",
        "identifier" => identifier.to_string()
    )
    .increment(1);
}

pub fn inc_active_runs() {
    gauge!("weft_active_runs").increment(1.0);
}

pub fn dec_active_runs() {
    gauge!("weft_active_runs").decrement(1.0);
}
