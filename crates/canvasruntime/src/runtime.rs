use crate::{registry::NodeRegistry, RunReport, WorkflowExecutor};
use canvascore::{EventBus, ExecutionEvent, GraphStore, RunStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// Owns the canvas graph and runs it, one run at a time
pub struct CanvasRuntime {
    graph: Arc<RwLock<GraphStore>>,
    registry: Arc<NodeRegistry>,
    executor: Arc<WorkflowExecutor>,
    event_bus: Arc<EventBus>,
    running: AtomicBool,
    last_run: RwLock<Option<RunReport>>,
}

impl CanvasRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self::with_graph(GraphStore::new(), registry, config)
    }

    /// Create a runtime over an existing graph
    pub fn with_graph(graph: GraphStore, registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        let executor = Arc::new(
            WorkflowExecutor::new(config.max_parallel_nodes).with_pacing(config.pacing_delay),
        );
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size.max(1)));

        Self {
            graph: Arc::new(RwLock::new(graph)),
            registry,
            executor,
            event_bus,
            running: AtomicBool::new(false),
            last_run: RwLock::new(None),
        }
    }

    /// The Graph Store edited by the user and updated by runs
    pub fn graph(&self) -> &Arc<RwLock<GraphStore>> {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Run the current graph.
    ///
    /// Returns `None` without doing anything when a run is already active.
    pub async fn run(&self) -> Option<RunReport> {
        if !self.try_claim() {
            tracing::debug!("Run already in progress, ignoring request");
            return None;
        }
        let _guard = RunningGuard(&self.running);
        Some(self.execute_and_record().await)
    }

    /// Start a run on a background task.
    ///
    /// Returns `false` when a run is already active.
    pub fn spawn_run(self: &Arc<Self>) -> bool {
        if !self.try_claim() {
            tracing::debug!("Run already in progress, ignoring request");
            return false;
        }
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = RunningGuard(&runtime.running);
            runtime.execute_and_record().await;
        });
        true
    }

    fn try_claim(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn execute_and_record(&self) -> RunReport {
        let report = self
            .executor
            .execute(&self.graph, &self.registry, &self.event_bus)
            .await;
        *self.last_run.write().await = Some(report.clone());
        report
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Workflow-level status of the active or most recent run
    pub async fn status(&self) -> RunStatus {
        if self.is_running() {
            return RunStatus::Running;
        }
        self.last_run
            .read()
            .await
            .as_ref()
            .map(|r| r.status)
            .unwrap_or_default()
    }

    pub async fn last_run(&self) -> Option<RunReport> {
        self.last_run.read().await.clone()
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Get the event bus for direct access
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for CanvasRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the running flag when a run ends, even by panic
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Ready nodes allowed in flight at once; 1 runs strictly sequentially
    pub max_parallel_nodes: usize,
    pub event_buffer_size: usize,
    /// Pause after each node finishes
    pub pacing_delay: Duration,
}

impl RuntimeConfig {
    /// No pacing, sequential execution
    pub fn headless() -> Self {
        Self {
            pacing_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Defaults overridden by `CANVAS_PACING_MS` and `CANVAS_MAX_PARALLEL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_number::<u64>("CANVAS_PACING_MS") {
            config.pacing_delay = Duration::from_millis(ms);
        }
        if let Some(max) = env_number::<usize>("CANVAS_MAX_PARALLEL") {
            config.max_parallel_nodes = max;
        }
        config
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}: not a number: {:?}", name, raw);
            None
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: 1,
            event_buffer_size: 1000,
            pacing_delay: Duration::from_millis(500),
        }
    }
}
