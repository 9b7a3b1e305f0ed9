//! Execution coordinator.
//!
//! Walks a validated workflow in topological order, dispatches each node
//! to its executor, and tracks per-node results. A run is strictly
//! single-threaded and cooperative: one node at a time, with suspension
//! (breakpoints, wait delays) blocking only this run.
//!
//! External callers steer a run through a control channel. Breakpoint
//! suspension blocks on the channel until `Resume` or `Cancel` arrives;
//! between nodes the channel is polled so a cancel lands promptly.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::item::{items_to_values, ExecutionItem};
use crate::metrics;
use crate::nodes::{self, try_catch::UpstreamFailure, NodeOutput};
use crate::storage::WorkflowStore;
use crate::workflow::{
    validate_workflow, ExecutionGraph, NodeDefinition, NodeKind, WorkflowDefinition,
};

/// Nested execute_workflow depth bound.
const MAX_RUN_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Suspended,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Terminal record for one node in one run. Never mutated after it
/// reaches `Completed` or `Failed`.
#[derive(Debug, Clone)]
pub struct NodeRunResult {
    pub status: NodeStatus,
    pub output: Option<NodeOutput>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Commands a caller can send into a running workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunControl {
    Resume,
    Cancel,
}

/// Externally visible run state, published over a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub status: RunStatus,
    /// Node the run is suspended before, when status is `Suspended`.
    pub suspended_node: Option<String>,
}

/// Caller-side half of the run control pair.
#[derive(Debug, Clone)]
pub struct RunHandle {
    control: mpsc::Sender<RunControl>,
    snapshot: watch::Receiver<RunSnapshot>,
}

impl RunHandle {
    pub async fn resume(&self) -> Result<()> {
        self.control
            .send(RunControl::Resume)
            .await
            .map_err(|_| Error::Execution("run is no longer listening".into()))
    }

    pub async fn cancel(&self) -> Result<()> {
        self.control
            .send(RunControl::Cancel)
            .await
            .map_err(|_| Error::Execution("run is no longer listening".into()))
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Wait until the published snapshot satisfies `predicate`.
    pub async fn wait_for(&mut self, predicate: impl Fn(&RunSnapshot) -> bool) -> Result<RunSnapshot> {
        loop {
            {
                let current = self.snapshot.borrow();
                if predicate(&current) {
                    return Ok(current.clone());
                }
            }
            self.snapshot
                .changed()
                .await
                .map_err(|_| Error::Execution("run ended without publishing state".into()))?;
        }
    }
}

/// Coordinator-side half of the run control pair.
pub struct RunControls {
    control: mpsc::Receiver<RunControl>,
    snapshot: watch::Sender<RunSnapshot>,
}

/// Create a connected `RunHandle` / `RunControls` pair.
pub fn run_channel() -> (RunHandle, RunControls) {
    let (control_tx, control_rx) = mpsc::channel(8);
    let (snapshot_tx, snapshot_rx) = watch::channel(RunSnapshot {
        status: RunStatus::Pending,
        suspended_node: None,
    });
    (
        RunHandle {
            control: control_tx,
            snapshot: snapshot_rx,
        },
        RunControls {
            control: control_rx,
            snapshot: snapshot_tx,
        },
    )
}

/// Final record for one run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Unique id assigned when the run started.
    pub run_id: String,
    pub status: RunStatus,
    /// Items from the designated output node (or the last executed
    /// node), as a JSON array.
    pub output: Value,
    pub error: Option<String>,
    pub node_results: HashMap<String, NodeRunResult>,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

pub struct Coordinator {
    store: Arc<dyn WorkflowStore>,
    client: reqwest::Client,
    breakpoints: HashSet<String>,
    controls: Option<RunControls>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self {
            store,
            client: reqwest::Client::new(),
            breakpoints: HashSet::new(),
            controls: None,
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Node ids to suspend before. Toggled before the run starts.
    pub fn with_breakpoints(mut self, breakpoints: impl IntoIterator<Item = String>) -> Self {
        self.breakpoints = breakpoints.into_iter().collect();
        self
    }

    /// Attach the coordinator half of a [`run_channel`] pair.
    pub fn with_controls(mut self, controls: RunControls) -> Self {
        self.controls = Some(controls);
        self
    }

    /// Run a stored workflow by id.
    #[instrument(skip(self, payload), fields(workflow_id = %workflow_id))]
    pub async fn run(&mut self, workflow_id: &str, payload: Option<Value>) -> Result<RunOutcome> {
        let workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| Error::Execution(format!("unknown workflow: {workflow_id}")))?;
        self.run_definition(&workflow, payload).await
    }

    /// Run a definition directly, without the store lookup.
    #[instrument(skip(self, workflow, payload), fields(workflow_id = %workflow.id))]
    pub async fn run_definition(
        &mut self,
        workflow: &WorkflowDefinition,
        payload: Option<Value>,
    ) -> Result<RunOutcome> {
        metrics::inc_active_runs();
        let result = self.execute(workflow, payload, 0).await;
        metrics::dec_active_runs();

        match &result {
            Ok(outcome) => {
                metrics::record_run(match outcome.status {
                    RunStatus::Completed => "completed",
                    RunStatus::Failed => "failed",
                    RunStatus::Cancelled => "cancelled",
                    _ => "unknown",
                });
                metrics::record_run_duration(
                    Duration::from_millis(outcome.duration_ms),
                    &workflow.id,
                );
            }
            Err(_) => metrics::record_run("error"),
        }
        result
    }

    async fn execute(
        &mut self,
        workflow: &WorkflowDefinition,
        payload: Option<Value>,
        depth: usize,
    ) -> Result<RunOutcome> {
        if depth >= MAX_RUN_DEPTH {
            return Err(Error::Execution(format!(
                "workflow nesting exceeds {MAX_RUN_DEPTH} levels"
            )));
        }

        validate_workflow(workflow)?;
        let graph = ExecutionGraph::build(workflow)?;
        let order = graph.execution_order()?;
        let reachable = graph.reachable_from_entries();

        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let deadline = started + Duration::from_secs(workflow.settings.timeout_seconds.max(1));
        self.publish(depth, RunStatus::Running, None);
        info!(run_id = %run_id, nodes = order.len(), "run started");

        let mut results: HashMap<String, NodeRunResult> = HashMap::new();
        let mut failures: Vec<(String, String)> = Vec::new();
        let mut last_executed: Option<String> = None;

        for node_id in &order {
            if !reachable.contains(node_id) {
                continue;
            }
            let node = workflow
                .get_node(node_id)
                .ok_or_else(|| Error::Execution(format!("node vanished: {node_id}")))?;

            if depth == 0 && self.poll_cancel() {
                return Ok(self.finish_cancelled(workflow, depth, run_id, started, results));
            }
            if Instant::now() >= deadline {
                let message = format!(
                    "run exceeded {} seconds",
                    workflow.settings.timeout_seconds
                );
                return Ok(self.finish_failed(depth, run_id, started, results, node_id.clone(), message));
            }

            if depth == 0 && self.breakpoints.contains(node_id) {
                debug!(node = %node_id, "breakpoint hit, suspending");
                self.publish(depth, RunStatus::Suspended, Some(node_id.clone()));
                match self.await_resume().await {
                    ResumeOutcome::Resume => {
                        self.publish(depth, RunStatus::Running, None);
                    }
                    ResumeOutcome::Cancel => {
                        return Ok(self.finish_cancelled(workflow, depth, run_id, started, results));
                    }
                }
            }

            let inputs = gather_inputs(workflow, node, &results);
            let failure = match &node.kind {
                NodeKind::TryCatch(config) => {
                    upstream_failure(workflow, &graph, node_id, config.scope, &failures)?
                }
                _ => None,
            };

            results.insert(
                node_id.clone(),
                NodeRunResult {
                    status: NodeStatus::Running,
                    output: None,
                    error: None,
                    duration_ms: None,
                },
            );
            let node_started = Instant::now();
            let outcome = self
                .dispatch(node, &inputs, payload.as_ref(), failure.as_ref(), depth)
                .await;
            let duration = node_started.elapsed();
            metrics::record_node_duration(duration, node.kind.name());

            match outcome {
                Ok(output) => {
                    debug!(node = %node_id, items = output.item_count(), "node completed");
                    metrics::record_node_execution(node.kind.name(), "completed");
                    if let NodeKind::Wait(config) = &node.kind {
                        let delay = nodes::wait::compute_delay_ms(config);
                        if delay > 0 {
                            debug!(node = %node_id, delay_ms = delay, "wait delay");
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                        }
                    }
                    results.insert(
                        node_id.clone(),
                        NodeRunResult {
                            status: NodeStatus::Completed,
                            output: Some(output),
                            error: None,
                            duration_ms: Some(duration.as_millis() as u64),
                        },
                    );
                    last_executed = Some(node_id.clone());
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(node = %node_id, error = %message, "node failed");
                    metrics::record_node_execution(node.kind.name(), "failed");
                    results.insert(
                        node_id.clone(),
                        NodeRunResult {
                            status: NodeStatus::Failed,
                            output: None,
                            error: Some(message.clone()),
                            duration_ms: Some(duration.as_millis() as u64),
                        },
                    );

                    let caught = workflow.settings.continue_on_fail
                        || has_downstream_catch(workflow, &graph, node_id)?;
                    if caught {
                        failures.push((node_id.clone(), message));
                        continue;
                    }
                    return Ok(self.finish_failed(depth, run_id, started, results, node_id.clone(), message));
                }
            }
        }

        let output = final_output(workflow, &order, &results, last_executed.as_deref());
        self.publish(depth, RunStatus::Completed, None);
        info!(run_id = %run_id, duration_ms = started.elapsed().as_millis() as u64, "run completed");
        Ok(RunOutcome {
            run_id,
            status: RunStatus::Completed,
            output,
            error: None,
            node_results: results,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn dispatch(
        &mut self,
        node: &NodeDefinition,
        inputs: &[ExecutionItem],
        payload: Option<&Value>,
        failure: Option<&UpstreamFailure>,
        depth: usize,
    ) -> Result<NodeOutput> {
        let items = match &node.kind {
            NodeKind::Trigger => nodes::trigger::run_trigger(payload)?,
            NodeKind::Noop => nodes::trigger::run_noop(inputs)?,
            NodeKind::Filter(config) => nodes::filter::run(inputs, config)?,
            NodeKind::Limit(config) => nodes::limit::run(inputs, config)?,
            NodeKind::RemoveDuplicates(config) => nodes::dedupe::run(inputs, config)?,
            NodeKind::Aggregate(config) => nodes::aggregate::run(inputs, config)?,
            NodeKind::Summarize(config) => nodes::summarize::run(inputs, config)?,
            NodeKind::SplitOut(config) => nodes::split::run(inputs, config)?,
            NodeKind::Merge(config) => nodes::merge::run(inputs, config)?,
            NodeKind::EditFields(config) => nodes::set::run(inputs, config)?,
            NodeKind::DateTime(config) => nodes::datetime::run(inputs, config)?,
            NodeKind::Wait(config) => nodes::wait::run(inputs, config)?,
            NodeKind::HttpRequest(config) => {
                nodes::http::run(&self.client, inputs, config).await?
            }
            NodeKind::If(config) => return nodes::if_node::run(inputs, config),
            NodeKind::Switch(config) => return nodes::switch::run(inputs, config),
            NodeKind::TryCatch(_) => return nodes::try_catch::run(inputs, failure),
            NodeKind::ThrowError(config) => nodes::throw::run(inputs, config)?,
            NodeKind::ExecuteWorkflow(config) => {
                let child = self
                    .store
                    .get_workflow(&config.workflow_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Execution(format!("unknown workflow: {}", config.workflow_id))
                    })?;
                let child_payload = nodes::subworkflow::child_payload(inputs);
                let outcome = Box::pin(self.execute(&child, child_payload, depth + 1)).await?;
                if outcome.status != RunStatus::Completed {
                    return Err(Error::Node(format!(
                        "sub-workflow {} failed: {}",
                        config.workflow_id,
                        outcome.error.unwrap_or_else(|| "unknown error".into())
                    )));
                }
                match outcome.output {
                    Value::Array(values) => crate::item::values_to_items(values),
                    other => vec![ExecutionItem::from_value(other)],
                }
            }
            NodeKind::WorkflowInput(config) => nodes::io::run_input(payload, config)?,
            NodeKind::WorkflowOutput(config) => nodes::io::run_output(inputs, config)?,
        };
        Ok(NodeOutput::Items(items))
    }

    /// Publish run state. Nested sub-workflow runs stay silent; only the
    /// top-level run owns the snapshot channel.
    fn publish(&self, depth: usize, status: RunStatus, suspended_node: Option<String>) {
        if depth > 0 {
            return;
        }
        if let Some(controls) = &self.controls {
            controls.snapshot.send_replace(RunSnapshot {
                status,
                suspended_node,
            });
        }
    }

    fn poll_cancel(&mut self) -> bool {
        let Some(controls) = &mut self.controls else {
            return false;
        };
        loop {
            match controls.control.try_recv() {
                Ok(RunControl::Cancel) => return true,
                Ok(RunControl::Resume) => continue,
                Err(_) => return false,
            }
        }
    }

    async fn await_resume(&mut self) -> ResumeOutcome {
        let Some(controls) = &mut self.controls else {
            // No channel means nobody can resume; do not deadlock.
            return ResumeOutcome::Resume;
        };
        loop {
            match controls.control.recv().await {
                Some(RunControl::Resume) => return ResumeOutcome::Resume,
                Some(RunControl::Cancel) | None => return ResumeOutcome::Cancel,
            }
        }
    }

    fn finish_cancelled(
        &self,
        workflow: &WorkflowDefinition,
        depth: usize,
        run_id: String,
        started: Instant,
        results: HashMap<String, NodeRunResult>,
    ) -> RunOutcome {
        info!(workflow_id = %workflow.id, run_id = %run_id, "run cancelled");
        self.publish(depth, RunStatus::Cancelled, None);
        RunOutcome {
            run_id,
            status: RunStatus::Cancelled,
            output: Value::Array(Vec::new()),
            error: Some("run cancelled".into()),
            node_results: results,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn finish_failed(
        &self,
        depth: usize,
        run_id: String,
        started: Instant,
        results: HashMap<String, NodeRunResult>,
        node_id: String,
        message: String,
    ) -> RunOutcome {
        self.publish(depth, RunStatus::Failed, None);
        RunOutcome {
            run_id,
            status: RunStatus::Failed,
            output: Value::Array(Vec::new()),
            error: Some(format!("{node_id}: {message}")),
            node_results: results,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

enum ResumeOutcome {
    Resume,
    Cancel,
}

/// Concatenate the items every inbound connection delivers, honoring the
/// source's named output port. Failed or skipped sources contribute
/// nothing.
fn gather_inputs(
    workflow: &WorkflowDefinition,
    node: &NodeDefinition,
    results: &HashMap<String, NodeRunResult>,
) -> Vec<ExecutionItem> {
    let mut items = Vec::new();
    for connection in workflow.connections.iter().filter(|c| c.target == node.id) {
        if let Some(result) = results.get(&connection.source) {
            if let Some(output) = &result.output {
                items.extend_from_slice(output.port_items(connection.source_handle.as_deref()));
            }
        }
    }
    items
}

/// Nodes whose failures a try/catch observes.
///
/// `chain` walks all transitive predecessors but stops at any nearer
/// try/catch, which already absorbed everything behind it. `immediate`
/// only looks at direct predecessors.
fn watched_scope(
    workflow: &WorkflowDefinition,
    graph: &ExecutionGraph,
    catch_id: &str,
    scope: nodes::try_catch::TryCatchScope,
) -> Result<HashSet<String>> {
    let mut watched: HashSet<String> = HashSet::new();
    match scope {
        nodes::try_catch::TryCatchScope::Immediate => {
            watched.extend(
                graph
                    .direct_predecessors(catch_id)?
                    .into_iter()
                    .map(String::from),
            );
        }
        nodes::try_catch::TryCatchScope::Chain => {
            let mut queue: VecDeque<String> = graph
                .direct_predecessors(catch_id)?
                .into_iter()
                .map(String::from)
                .collect();
            while let Some(current) = queue.pop_front() {
                if !watched.insert(current.clone()) {
                    continue;
                }
                let is_catch = workflow
                    .get_node(&current)
                    .map(|n| matches!(n.kind, NodeKind::TryCatch(_)))
                    .unwrap_or(false);
                if is_catch {
                    watched.remove(&current);
                    continue;
                }
                queue.extend(
                    graph
                        .direct_predecessors(&current)?
                        .into_iter()
                        .map(String::from),
                );
            }
        }
    }
    Ok(watched)
}

/// Is there a try/catch downstream that can absorb this node's failure?
/// Only one whose watched scope contains the failing node counts; an
/// `immediate`-scoped catch further away must not swallow it.
fn has_downstream_catch(
    workflow: &WorkflowDefinition,
    graph: &ExecutionGraph,
    node_id: &str,
) -> Result<bool> {
    for id in graph.transitive_successors(node_id)? {
        if let Some(node) = workflow.get_node(&id) {
            if let NodeKind::TryCatch(config) = &node.kind {
                if watched_scope(workflow, graph, &id, config.scope)?.contains(node_id) {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Most recent failure inside the try/catch node's watched scope.
fn upstream_failure(
    workflow: &WorkflowDefinition,
    graph: &ExecutionGraph,
    node_id: &str,
    scope: nodes::try_catch::TryCatchScope,
    failures: &[(String, String)],
) -> Result<Option<UpstreamFailure>> {
    let watched = watched_scope(workflow, graph, node_id, scope)?;
    Ok(failures
        .iter()
        .rev()
        .find(|(node, _)| watched.contains(node))
        .map(|(node, message)| UpstreamFailure {
            node: node.clone(),
            message: message.clone(),
        }))
}

/// Designated `workflow_output` node's items, else the last executed
/// node's main port.
fn final_output(
    workflow: &WorkflowDefinition,
    order: &[String],
    results: &HashMap<String, NodeRunResult>,
    last_executed: Option<&str>,
) -> Value {
    let designated = order.iter().rev().find(|id| {
        workflow
            .get_node(id)
            .map(|n| matches!(n.kind, NodeKind::WorkflowOutput(_)))
            .unwrap_or(false)
            && results.contains_key(id.as_str())
    });

    let source = designated.map(String::as_str).or(last_executed);
    let items = source
        .and_then(|id| results.get(id))
        .and_then(|result| result.output.as_ref())
        .map(|output| output.main_items().to_vec())
        .unwrap_or_default();

    Value::Array(items_to_values(&items))
}
