// crates/canvascli/src/main.rs

use anyhow::{Context, Result};
use canvascore::{
    ExecutionEvent, GraphStore, NodeEvent, NodeKind, NodeSpec, NodeStatus, RunStatus,
    WorkflowError,
};
use canvasnodes::NodesConfig;
use canvasruntime::{CanvasRuntime, DependencyResolver, NodeRegistry, RuntimeConfig};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "canvas")]
#[command(about = "Workflow Canvas CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a graph file
    Run {
        /// Path to graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Base URL of the agent query service
        #[arg(long, env = "AGENT_API_URL")]
        agent_api_url: Option<String>,

        /// Pause after each node finishes, in milliseconds
        #[arg(long, env = "CANVAS_PACING_MS", default_value_t = 500)]
        pacing_ms: u64,

        /// Ready nodes allowed to run at once
        #[arg(long, env = "CANVAS_MAX_PARALLEL", default_value_t = 1)]
        max_parallel: usize,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a graph file
    Validate {
        /// Path to graph JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create an example graph
    Init {
        /// Output file path
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,
    },
}

/// On-disk form of a canvas graph
#[derive(Debug, Default, Serialize, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    nodes: Vec<NodeSpec>,
    #[serde(default)]
    edges: Vec<EdgeSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeSpec {
    source: String,
    target: String,
}

impl GraphDocument {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid graph file {}", path.display()))
    }

    fn into_store(self) -> Result<GraphStore> {
        let mut store = GraphStore::new();
        for spec in self.nodes {
            store.insert(spec)?;
        }
        for edge in &self.edges {
            store
                .connect(&edge.source, &edge.target)
                .with_context(|| format!("Cannot connect {} -> {}", edge.source, edge.target))?;
        }
        Ok(store)
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn registry(config: &NodesConfig) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    canvasnodes::register_all(&mut registry, config);
    registry
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            agent_api_url,
            pacing_ms,
            max_parallel,
            verbose,
        } => {
            init_tracing(verbose);

            let nodes_config = NodesConfig {
                agent_api_url: agent_api_url.filter(|url| !url.trim().is_empty()),
                ..NodesConfig::default()
            };
            let runtime_config = RuntimeConfig {
                max_parallel_nodes: max_parallel,
                pacing_delay: Duration::from_millis(pacing_ms),
                ..RuntimeConfig::default()
            };
            run_graph(file, nodes_config, runtime_config).await?;
        }

        Commands::Validate { file } => {
            init_tracing(false);
            validate_graph(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_graph(output)?;
        }
    }

    Ok(())
}

async fn run_graph(
    file: PathBuf,
    nodes_config: NodesConfig,
    runtime_config: RuntimeConfig,
) -> Result<()> {
    println!("🚀 Loading graph from: {}", file.display());

    let document = GraphDocument::load(&file)?;
    println!("   Nodes: {}", document.nodes.len());
    println!("   Edges: {}", document.edges.len());
    println!();

    let graph = document.into_store()?;
    let runtime = CanvasRuntime::with_graph(
        graph,
        Arc::new(registry(&nodes_config)),
        runtime_config,
    );

    // Print events as they arrive
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let finished = matches!(event, ExecutionEvent::RunCompleted { .. });
                    print_event(event);
                    if finished {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event printer skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let report = runtime
        .run()
        .await
        .context("A run is already in progress")?;
    event_task.await?;

    println!();
    println!("📊 Execution Summary:");
    println!("   Run ID: {}", report.run_id);
    println!("   Executed: {} nodes", report.executed_nodes().len());
    for failed in &report.failed {
        println!("   Failed: {} ({})", failed.node_id, failed.error);
    }
    for blocked in &report.blocked {
        println!("   Blocked: {} ({:?})", blocked.node_id, blocked.reason);
    }

    match report.status {
        RunStatus::Completed => {
            if let Some(snapshot) = &report.snapshot {
                println!();
                println!("📤 Output:");
                println!("{}", serde_json::to_string_pretty(snapshot)?);
            }
            Ok(())
        }
        _ => Err(WorkflowError::Execution(
            report.error.unwrap_or_else(|| "unknown error".to_string()),
        )
        .into()),
    }
}

fn print_event(event: ExecutionEvent) {
    match event {
        ExecutionEvent::RunStarted { node_count, .. } => {
            println!("▶️  Workflow started ({} nodes)", node_count);
        }
        ExecutionEvent::NodeStatusChanged {
            node_id,
            status,
            error,
            ..
        } => match status {
            NodeStatus::Idle => {}
            NodeStatus::Running => println!("  ⚡ Starting node: {}", node_id),
            NodeStatus::Success => println!("  ✅ Node {} completed", node_id),
            NodeStatus::Error => println!(
                "  ❌ Node {} failed: {}",
                node_id,
                error.unwrap_or_default()
            ),
        },
        ExecutionEvent::NodeBlocked {
            node_id, reason, ..
        } => {
            println!("  ⏸️  Node {} blocked ({:?})", node_id, reason);
        }
        ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
            NodeEvent::Info { message } => {
                println!("     ℹ️  [{}] {}", node_id, message);
            }
            NodeEvent::Warning { message } => {
                println!("     ⚠️  [{}] {}", node_id, message);
            }
        },
        ExecutionEvent::RunCompleted {
            status,
            duration_ms,
            ..
        } => {
            if status == RunStatus::Completed {
                println!("✨ Workflow completed successfully in {}ms", duration_ms);
            } else {
                println!("💥 Workflow failed after {}ms", duration_ms);
            }
        }
    }
}

fn validate_graph(file: PathBuf) -> Result<()> {
    println!("🔍 Validating graph: {}", file.display());

    let document = GraphDocument::load(&file)?;
    let (node_count, edge_count) = (document.nodes.len(), document.edges.len());
    let graph = document.into_store()?.snapshot();

    let resolver = DependencyResolver::new(&graph);
    let starts = resolver.start_nodes()?;

    let registry = registry(&NodesConfig::default());
    if let Some(node) = graph.nodes.iter().find(|n| !registry.contains(n.kind)) {
        return Err(WorkflowError::UnknownNodeType(node.kind))
            .with_context(|| format!("Node {} cannot run", node.id));
    }

    println!("✅ Graph is valid:");
    println!("   Nodes: {}", node_count);
    println!("   Edges: {}", edge_count);
    println!("   Start nodes: {}", starts.join(", "));

    if let Some(cycle) = resolver.find_cycle() {
        println!(
            "⚠️  Nodes in a cycle will never run: {}",
            cycle.join(" -> ")
        );
    }

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = registry(&NodesConfig::default());
    for kind in registry.list_node_kinds() {
        if let Some(metadata) = registry.metadata(kind) {
            println!("  • {} - {} ({})", kind, kind.display_name(), metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", kind);
        }
    }
}

fn create_example_graph(output: PathBuf) -> Result<()> {
    let node = |id: &str, kind: NodeKind| NodeSpec::new(kind).with_id(id);
    let edge = |source: &str, target: &str| EdgeSpec {
        source: source.to_string(),
        target: target.to_string(),
    };

    let document = GraphDocument {
        nodes: vec![
            node("start", NodeKind::Start),
            node("trigger", NodeKind::Trigger),
            node("pool", NodeKind::Pool),
            node("watcher", NodeKind::PoolWatcher),
            node("question", NodeKind::Test)
                .with_label("Ask Agent")
                .with_config("question", "What changed in the pool?"),
            node("agent", NodeKind::Agent),
            node("output", NodeKind::Output),
        ],
        edges: vec![
            edge("start", "trigger"),
            edge("trigger", "pool"),
            edge("pool", "watcher"),
            edge("watcher", "output"),
            edge("question", "agent"),
            edge("agent", "output"),
        ],
    };

    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(&output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✨ Created example graph: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  AGENT_API_URL=http://localhost:8000 canvas run --file {}",
        output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults_pace_one_node_at_a_time() {
        std::env::remove_var("CANVAS_PACING_MS");
        std::env::remove_var("CANVAS_MAX_PARALLEL");

        let cli = Cli::try_parse_from(["canvas", "run", "--file", "graph.json"]).unwrap();
        let Commands::Run {
            pacing_ms,
            max_parallel,
            ..
        } = cli.command
        else {
            panic!("expected run command");
        };

        assert_eq!(pacing_ms, 500);
        assert_eq!(max_parallel, 1);
        assert_eq!(
            Duration::from_millis(pacing_ms),
            RuntimeConfig::default().pacing_delay
        );
    }

    #[test]
    fn test_pacing_can_be_disabled() {
        let cli =
            Cli::try_parse_from(["canvas", "run", "--file", "g.json", "--pacing-ms", "0"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { pacing_ms: 0, .. }));
    }
}
