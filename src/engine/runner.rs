//! Async job runner.
//!
//! Consumes `JobPayload`s from a queue and drives the coordinator under
//! a worker-concurrency bound, a global throughput gate, and
//! per-organization admission control. Failures are reported, never
//! retried here; retry policy belongs to the queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::coordinator::{Coordinator, NodeStatus, RunOutcome};
use crate::engine::rate_limiter::{CounterStore, RateLimiter};
use crate::error::Result;
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::storage::WorkflowStore;

/// One unit of queued work. Immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub workflow_id: String,
    pub organization_id: String,
    /// What enqueued the job: webhook, schedule, manual, parent run.
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Durable queue seam. `pop` blocks until a job is available and
/// returns `None` once the queue is closed and drained.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn pop(&self) -> Result<Option<JobPayload>>;
}

/// In-memory queue for embedding and tests.
#[derive(Clone, Default)]
pub struct InMemoryJobQueue {
    inner: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<JobPayload>,
    closed: bool,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, job: JobPayload) {
        let mut state = self.inner.lock().await;
        state.jobs.push_back(job);
        drop(state);
        self.notify.notify_waiters();
    }

    /// Close the queue. Pending jobs still drain; `pop` returns `None`
    /// afterwards.
    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn pop(&self) -> Result<Option<JobPayload>> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking state so a push or close
            // racing with the check is never missed.
            notified.as_mut().enable();
            {
                let mut state = self.inner.lock().await;
                if let Some(job) = state.jobs.pop_front() {
                    return Ok(Some(job));
                }
                if state.closed {
                    return Ok(None);
                }
            }
            notified.await;
        }
    }
}

/// Per-node summary inside a job report.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Outcome of one processed job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub workflow_id: String,
    pub organization_id: String,
    pub success: bool,
    /// Array-shaped run output is normalized to `{"items": [...]}`;
    /// object-shaped output passes through.
    pub outputs: Value,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub node_results: HashMap<String, NodeReport>,
}

/// Normalize a run's final output for reporting.
pub fn normalize_outputs(output: Value) -> Value {
    match output {
        Value::Array(items) => json!({ "items": items }),
        other => other,
    }
}

/// Global jobs-per-second gate, independent of per-organization
/// admission limits.
pub struct ThroughputGate {
    per_second: u32,
    window: Mutex<(Instant, u32)>,
}

impl ThroughputGate {
    pub fn new(per_second: u32) -> Self {
        Self {
            per_second,
            window: Mutex::new((Instant::now(), 0)),
        }
    }

    /// Wait until a job may start without exceeding the cap.
    pub async fn admit(&self) {
        if self.per_second == 0 {
            return;
        }
        loop {
            let mut window = self.window.lock().await;
            let (start, count) = *window;
            let elapsed = start.elapsed();
            if elapsed >= Duration::from_secs(1) {
                *window = (Instant::now(), 1);
                return;
            }
            if count < self.per_second {
                window.1 = count + 1;
                return;
            }
            let wait = Duration::from_secs(1) - elapsed;
            drop(window);
            tokio::time::sleep(wait).await;
        }
    }
}

/// Queue consumer driving the coordinator.
#[derive(Clone)]
pub struct JobRunner {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn WorkflowStore>,
    limiter: Arc<RateLimiter<Arc<dyn CounterStore>>>,
    gate: Arc<ThroughputGate>,
    config: EngineConfig,
    shutdown: ShutdownCoordinator,
    reports: mpsc::Sender<JobReport>,
    client: reqwest::Client,
}

impl JobRunner {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn WorkflowStore>,
        counters: Arc<dyn CounterStore>,
        config: EngineConfig,
        shutdown: ShutdownCoordinator,
        reports: mpsc::Sender<JobReport>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(counters, config.admission.clone()));
        let gate = Arc::new(ThroughputGate::new(config.runner.max_jobs_per_second));
        Self {
            queue,
            store,
            limiter,
            gate,
            config,
            shutdown,
            reports,
            client: reqwest::Client::new(),
        }
    }

    /// Run the worker pool until the queue drains or shutdown is
    /// requested. In-flight jobs always complete before a worker exits.
    pub async fn run(self) -> Result<()> {
        let concurrency = self.config.runner.concurrency.max(1);
        info!(concurrency, "job runner starting");

        let mut workers = JoinSet::new();
        for worker_id in 0..concurrency {
            let runner = self.clone();
            workers.spawn(async move { runner.worker_loop(worker_id).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "worker task panicked");
            }
        }
        info!("job runner drained");
        Ok(())
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            let job = tokio::select! {
                _ = self.shutdown.wait_for_shutdown() => {
                    debug!(worker_id, "worker stopping on shutdown");
                    return;
                }
                job = self.queue.pop() => job,
            };

            let job = match job {
                Ok(Some(job)) => job,
                Ok(None) => {
                    debug!(worker_id, "queue closed, worker stopping");
                    return;
                }
                Err(e) => {
                    warn!(worker_id, error = %e, "queue unavailable, worker stopping");
                    return;
                }
            };

            self.gate.admit().await;
            let report = self.process(job).await;
            metrics::record_job(if report.success { "completed" } else { "failed" });
            if self.reports.send(report).await.is_err() {
                warn!(worker_id, "report channel closed, dropping job report");
            }
        }
    }

    async fn process(&self, job: JobPayload) -> JobReport {
        debug!(workflow_id = %job.workflow_id, organization_id = %job.organization_id, "processing job");
        let started = Instant::now();

        let decision = self.limiter.check(&job.organization_id).await;
        if !decision.allowed {
            return JobReport {
                workflow_id: job.workflow_id,
                organization_id: job.organization_id,
                success: false,
                outputs: Value::Null,
                execution_time_ms: started.elapsed().as_millis() as u64,
                error: Some(format!(
                    "rate limit exceeded: {} per {}s window, resets at {}",
                    decision.limit, self.config.admission.window_seconds, decision.reset_at
                )),
                node_results: HashMap::new(),
            };
        }

        let mut coordinator =
            Coordinator::new(self.store.clone()).with_http_client(self.client.clone());
        let outcome = coordinator.run(&job.workflow_id, job.input.clone()).await;

        match outcome {
            Ok(outcome) => report_from_outcome(&job, outcome),
            Err(e) => JobReport {
                workflow_id: job.workflow_id,
                organization_id: job.organization_id,
                success: false,
                outputs: Value::Null,
                execution_time_ms: started.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
                node_results: HashMap::new(),
            },
        }
    }
}

fn report_from_outcome(job: &JobPayload, outcome: RunOutcome) -> JobReport {
    let node_results = outcome
        .node_results
        .iter()
        .map(|(id, result)| {
            (
                id.clone(),
                NodeReport {
                    status: result.status,
                    error: result.error.clone(),
                    duration_ms: result.duration_ms,
                },
            )
        })
        .collect();

    JobReport {
        workflow_id: job.workflow_id.clone(),
        organization_id: job.organization_id.clone(),
        success: outcome.success(),
        outputs: normalize_outputs(outcome.output),
        execution_time_ms: outcome.duration_ms,
        error: outcome.error,
        node_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionConfig;
    use crate::engine::rate_limiter::InMemoryCounterStore;
    use crate::storage::InMemoryWorkflowStore;
    use crate::workflow::parse_definition;

    const ECHO_WORKFLOW: &str = r#"
id: echo
nodes:
  - id: start
    type: trigger
  - id: out
    type: workflow_output
connections:
  - source: start
    target: out
"#;

    fn job(n: u64) -> JobPayload {
        JobPayload {
            workflow_id: "echo".into(),
            organization_id: "org-1".into(),
            trigger: "manual".into(),
            input: Some(json!({"n": n})),
            user_id: None,
        }
    }

    async fn setup(config: EngineConfig) -> (JobRunner, InMemoryJobQueue, mpsc::Receiver<JobReport>) {
        let store = Arc::new(InMemoryWorkflowStore::new());
        store
            .put_workflow(parse_definition(ECHO_WORKFLOW).unwrap())
            .await
            .unwrap();

        let queue = InMemoryJobQueue::new();
        let (report_tx, report_rx) = mpsc::channel(32);
        let runner = JobRunner::new(
            Arc::new(queue.clone()),
            store,
            Arc::new(InMemoryCounterStore::new()) as Arc<dyn CounterStore>,
            config,
            ShutdownCoordinator::new(),
            report_tx,
        );
        (runner, queue, report_rx)
    }

    #[tokio::test]
    async fn test_processes_jobs_and_reports() {
        let (runner, queue, mut reports) = setup(EngineConfig::default()).await;
        for n in 0..3 {
            queue.push(job(n)).await;
        }
        queue.close().await;
        runner.run().await.unwrap();

        let mut seen = Vec::new();
        while let Some(report) = reports.recv().await {
            assert!(report.success, "unexpected failure: {:?}", report.error);
            assert_eq!(report.workflow_id, "echo");
            // Array output is normalized to an items envelope.
            assert!(report.outputs.get("items").is_some());
            assert_eq!(
                report.node_results.get("out").map(|r| r.status),
                Some(NodeStatus::Completed)
            );
            seen.push(report);
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_workflow_reports_failure() {
        let (runner, queue, mut reports) = setup(EngineConfig::default()).await;
        queue
            .push(JobPayload {
                workflow_id: "ghost".into(),
                ..job(0)
            })
            .await;
        queue.close().await;
        runner.run().await.unwrap();

        let report = reports.recv().await.unwrap();
        assert!(!report.success);
        assert!(report.error.unwrap().contains("unknown workflow"));
    }

    #[tokio::test]
    async fn test_admission_limit_rejects_excess_jobs() {
        let config = EngineConfig {
            admission: AdmissionConfig {
                prefix: "test".into(),
                limit: 1,
                window_seconds: 60,
            },
            ..Default::default()
        };
        let (runner, queue, mut reports) = setup(config).await;
        queue.push(job(1)).await;
        queue.push(job(2)).await;
        queue.close().await;
        runner.run().await.unwrap();

        let mut outcomes = Vec::new();
        while let Some(report) = reports.recv().await {
            outcomes.push(report);
        }
        assert_eq!(outcomes.len(), 2);
        let rejected: Vec<_> = outcomes.iter().filter(|r| !r.success).collect();
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0]
            .error
            .as_deref()
            .unwrap()
            .contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_workers() {
        let (runner, _queue, _reports) = setup(EngineConfig::default()).await;
        let shutdown = runner.shutdown.clone();

        let running = tokio::spawn(runner.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.request_shutdown();

        tokio::time::timeout(Duration::from_secs(1), running)
            .await
            .expect("runner did not stop after shutdown")
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_normalize_outputs() {
        assert_eq!(
            normalize_outputs(json!([1, 2])),
            json!({"items": [1, 2]})
        );
        assert_eq!(
            normalize_outputs(json!({"already": "object"})),
            json!({"already": "object"})
        );
        assert_eq!(normalize_outputs(Value::Null), Value::Null);
    }
}
