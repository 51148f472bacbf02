use crate::registry::NodeRegistry;
use crate::resolver::DependencyResolver;
use canvascore::{
    merge_inputs, BlockReason, EventBus, ExecutionEvent, GraphSnapshot, GraphStore, NodeContext,
    NodeError, NodeId, NodeKind, NodeStatus, RunId, RunSnapshot, RunStatus, Value, WorkflowError,
};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Map;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tokio::sync::RwLock;

type NodeTask = BoxFuture<'static, (NodeId, Result<Value, NodeError>)>;

/// Drives one workflow run over the Graph Store.
///
/// Nodes are released in Kahn order: a node enters the FIFO ready queue once
/// every distinct upstream node has succeeded. Up to `max_parallel` ready
/// nodes are in flight at once, all polled on the caller's task.
pub struct WorkflowExecutor {
    max_parallel: usize,
    pacing_delay: Duration,
}

impl WorkflowExecutor {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            pacing_delay: Duration::ZERO,
        }
    }

    /// Pause after each node finishes so observers can follow progress
    pub fn with_pacing(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Execute the current graph and return the run report
    pub async fn execute(
        &self,
        store: &RwLock<GraphStore>,
        registry: &NodeRegistry,
        event_bus: &EventBus,
    ) -> RunReport {
        let run_id = RunId::new_v4();
        let start_time = Instant::now();

        let graph = {
            let mut store = store.write().await;
            store.reset_run_state();
            store.snapshot()
        };

        tracing::info!(
            run_id = %run_id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Starting workflow run"
        );
        event_bus.emit(ExecutionEvent::RunStarted {
            run_id,
            node_count: graph.nodes.len(),
            timestamp: Utc::now(),
        });
        for node in &graph.nodes {
            emit_status(event_bus, run_id, &node.id, NodeStatus::Idle, None, None);
        }

        let mut run = Run {
            run_id,
            store,
            registry,
            event_bus,
            resolver: DependencyResolver::new(&graph),
            graph: &graph,
            pacing_delay: self.pacing_delay,
            state: RunState::default(),
        };
        let outcome = run.drive(self.max_parallel).await;
        let outputs: Vec<NodeId> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Output)
            .map(|n| n.id.clone())
            .collect();

        let (status, snapshot, error) = match outcome {
            Ok(()) => {
                let snapshot = RunSnapshot::new(
                    run.state.results.clone(),
                    run.state.executed.clone(),
                );
                match snapshot.to_value() {
                    Ok(bundle) => {
                        for id in &outputs {
                            run.publish(id, NodeStatus::Success, Some(bundle.clone()), None)
                                .await;
                        }
                    }
                    Err(e) => {
                        tracing::error!(run_id = %run_id, error = %e, "Failed to encode run results");
                        for id in &outputs {
                            run.publish(id, NodeStatus::Error, None, Some(e.to_string()))
                                .await;
                        }
                    }
                }
                (RunStatus::Completed, Some(snapshot), None)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(run_id = %run_id, error = %message, "Workflow run failed");
                for id in &outputs {
                    run.publish(id, NodeStatus::Error, None, Some(message.clone()))
                        .await;
                }
                (RunStatus::Failed, None, Some(message))
            }
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            run_id = %run_id,
            status = ?status,
            executed = run.state.executed.len(),
            failed = run.state.failed.len(),
            blocked = run.state.blocked.len(),
            "Workflow run finished in {}ms",
            duration_ms
        );
        event_bus.emit(ExecutionEvent::RunCompleted {
            run_id,
            status,
            snapshot: snapshot.clone(),
            error: error.clone(),
            duration_ms,
            timestamp: Utc::now(),
        });

        RunReport {
            run_id,
            status,
            snapshot,
            error,
            failed: run.state.failed,
            blocked: run.state.blocked,
            duration_ms,
        }
    }
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Per-run bookkeeping, discarded when the run ends
#[derive(Default)]
struct RunState {
    /// Upstream nodes still to succeed, per node
    pending: HashMap<NodeId, usize>,
    queue: VecDeque<NodeId>,
    /// Executed, failed or blocked
    settled: HashSet<NodeId>,
    executed: Vec<NodeId>,
    results: Map<String, Value>,
    failed: Vec<FailedNode>,
    blocked: Vec<BlockedNode>,
}

struct Run<'a> {
    run_id: RunId,
    store: &'a RwLock<GraphStore>,
    registry: &'a NodeRegistry,
    event_bus: &'a EventBus,
    resolver: DependencyResolver,
    graph: &'a GraphSnapshot,
    pacing_delay: Duration,
    state: RunState,
}

impl Run<'_> {
    async fn drive(&mut self, max_parallel: usize) -> Result<(), WorkflowError> {
        let starts = self.resolver.start_nodes()?;

        for id in self.resolver.nodes() {
            self.state
                .pending
                .insert(id.clone(), self.resolver.in_degree(id));
        }
        for id in starts {
            if self.state.pending[&id] == 0 {
                self.state.queue.push_back(id);
            } else {
                tracing::debug!(node_id = %id, "start node waits for its upstream nodes");
            }
        }

        let mut running: FuturesUnordered<NodeTask> = FuturesUnordered::new();
        // New nodes are held back until the pause after the last settled node ends
        let mut paused_until: Option<Instant> = None;
        loop {
            if paused_until.is_some_and(|until| until <= Instant::now()) {
                paused_until = None;
            }
            while paused_until.is_none() && running.len() < max_parallel {
                let Some(node_id) = self.state.queue.pop_front() else {
                    break;
                };
                if self.state.settled.contains(&node_id) {
                    continue;
                }
                match self.dispatch(&node_id).await {
                    Ok(task) => running.push(task),
                    Err(message) => {
                        self.record_failure(&node_id, message).await;
                        paused_until = self.pause_end();
                    }
                }
            }

            let settled = match paused_until {
                Some(until) => tokio::select! {
                    Some(settled) = running.next() => Some(settled),
                    _ = tokio::time::sleep_until(until) => continue,
                },
                None => running.next().await,
            };
            let Some((node_id, outcome)) = settled else {
                break;
            };
            match outcome {
                Ok(result) => self.record_success(&node_id, result).await,
                Err(e) => self.record_failure(&node_id, e.to_string()).await,
            }
            paused_until = self.pause_end();
        }

        self.block_unreached();
        Ok(())
    }

    /// Mark a ready node running and build the task executing it
    async fn dispatch(&self, node_id: &NodeId) -> Result<NodeTask, String> {
        let node = self
            .graph
            .nodes
            .iter()
            .find(|n| &n.id == node_id)
            .ok_or_else(|| format!("Node not found: {}", node_id))?;

        let input = merge_inputs(
            self.resolver
                .incoming_of(node_id)
                .iter()
                .filter_map(|source| self.state.results.get(source)),
        );

        tracing::info!(node_id = %node_id, kind = %node.kind, "Starting node");
        self.publish(node_id, NodeStatus::Running, None, None).await;

        let behavior = self
            .registry
            .behavior_for(node.kind)
            .map_err(|e| e.to_string())?;
        let input = behavior.prepare_input(input, &node.data.config);
        let ctx = NodeContext::new(
            node_id.clone(),
            node.kind,
            self.event_bus.create_emitter(self.run_id, node_id.clone()),
        )
        .with_input(input)
        .with_config(node.data.config.clone());

        let node_id = node_id.clone();
        Ok(async move {
            let start = Instant::now();
            let result = behavior.execute(ctx).await;
            tracing::debug!(
                node_id = %node_id,
                "Node finished in {}ms",
                start.elapsed().as_millis()
            );
            (node_id, result)
        }
        .boxed())
    }

    /// End of the pause that follows a settled node, if pacing is on
    fn pause_end(&self) -> Option<Instant> {
        (!self.pacing_delay.is_zero()).then(|| Instant::now() + self.pacing_delay)
    }

    async fn record_success(&mut self, node_id: &NodeId, result: Value) {
        tracing::info!(node_id = %node_id, "Node completed");
        self.publish(node_id, NodeStatus::Success, Some(result.clone()), None)
            .await;

        self.state.results.insert(node_id.clone(), result);
        self.state.executed.push(node_id.clone());
        self.state.settled.insert(node_id.clone());

        for next in self.resolver.outgoing_of(node_id) {
            if self.state.settled.contains(next) {
                continue;
            }
            if let Some(count) = self.state.pending.get_mut(next) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.state.queue.push_back(next.clone());
                }
            }
        }
    }

    async fn record_failure(&mut self, node_id: &NodeId, message: String) {
        tracing::error!(node_id = %node_id, error = %message, "Node failed");
        self.publish(node_id, NodeStatus::Error, None, Some(message.clone()))
            .await;

        self.state.settled.insert(node_id.clone());
        self.state.failed.push(FailedNode {
            node_id: node_id.clone(),
            error: message,
        });

        for downstream in self.resolver.descendants(node_id) {
            self.block(downstream, BlockReason::UpstreamFailed);
        }
    }

    /// Nodes still pending once the queue drains sit behind a dependency cycle
    fn block_unreached(&mut self) {
        let unreached: Vec<NodeId> = self
            .resolver
            .nodes()
            .iter()
            .filter(|id| !self.state.settled.contains(*id))
            .cloned()
            .collect();
        if unreached.is_empty() {
            return;
        }

        tracing::warn!(
            run_id = %self.run_id,
            cycle = ?self.resolver.find_cycle(),
            "{} node(s) never became ready",
            unreached.len()
        );
        for id in unreached {
            self.block(id, BlockReason::UnmetDependency);
        }
    }

    fn block(&mut self, node_id: NodeId, reason: BlockReason) {
        if !self.state.settled.insert(node_id.clone()) {
            return;
        }
        tracing::warn!(node_id = %node_id, reason = ?reason, "Node blocked");
        self.event_bus.emit(ExecutionEvent::NodeBlocked {
            run_id: self.run_id,
            node_id: node_id.clone(),
            reason,
            timestamp: Utc::now(),
        });
        self.state.blocked.push(BlockedNode { node_id, reason });
    }

    /// Write a status transition to the store and announce it
    async fn publish(
        &self,
        node_id: &NodeId,
        status: NodeStatus,
        result: Option<Value>,
        error: Option<String>,
    ) {
        let written = self.store.write().await.update_status(
            node_id,
            status,
            result.clone(),
            error.clone(),
        );
        if let Err(e) = written {
            tracing::warn!(node_id = %node_id, error = %e, "Skipping status write-back");
        }
        emit_status(self.event_bus, self.run_id, node_id, status, result, error);
    }
}

fn emit_status(
    event_bus: &EventBus,
    run_id: RunId,
    node_id: &NodeId,
    status: NodeStatus,
    result: Option<Value>,
    error: Option<String>,
) {
    event_bus.emit(ExecutionEvent::NodeStatusChanged {
        run_id,
        node_id: node_id.clone(),
        status,
        result,
        error,
        timestamp: Utc::now(),
    });
}

/// Result of one workflow run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Aggregate bundle, present when the run completed
    pub snapshot: Option<RunSnapshot>,
    /// Reason the run failed
    pub error: Option<String>,
    pub failed: Vec<FailedNode>,
    pub blocked: Vec<BlockedNode>,
    pub duration_ms: u64,
}

impl RunReport {
    /// Successfully executed nodes in completion order
    pub fn executed_nodes(&self) -> &[NodeId] {
        self.snapshot
            .as_ref()
            .map(|s| s.executed_nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn result_of(&self, node_id: &str) -> Option<&Value> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.workflow_results.get(node_id))
    }

    pub fn is_blocked(&self, node_id: &str) -> bool {
        self.blocked.iter().any(|b| b.node_id == node_id)
    }

    pub fn is_failed(&self, node_id: &str) -> bool {
        self.failed.iter().any(|f| f.node_id == node_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedNode {
    pub node_id: NodeId,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockedNode {
    pub node_id: NodeId,
    pub reason: BlockReason,
}
