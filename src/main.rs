use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nodeflow_engine::{
  CallbackObserver, EngineConfig, ExecuteOptions, ExecutionResult, GraphEngine,
};
use nodeflow_graph::{Graph, topology};
use nodeflow_processor::ProcessorRegistry;

/// Nodeflow - run node graphs from the command line
#[derive(Parser)]
#[command(name = "nodeflow")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Execute every end node of a graph
  Run {
    /// Path to the graph file (JSON)
    graph_file: PathBuf,

    /// Per-node timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
  },

  /// Validate a graph and show its end nodes and dependencies
  Inspect {
    /// Path to the graph file (JSON)
    graph_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nodeflow=info,warn")),
    )
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      graph_file,
      timeout_ms,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_graph(graph_file, timeout_ms))?;
    }
    Some(Commands::Inspect { graph_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(inspect_graph(graph_file))?;
    }
    None => {
      println!("nodeflow - use --help to see available commands");
    }
  }

  Ok(())
}

async fn load_graph(path: &Path) -> Result<Graph> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read graph file: {}", path.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse graph file: {}", path.display()))
}

async fn run_graph(graph_file: PathBuf, timeout_ms: Option<u64>) -> Result<()> {
  let graph = load_graph(&graph_file).await?;
  eprintln!(
    "Loaded graph: {} nodes, {} connections",
    graph.nodes.len(),
    graph.connections.len()
  );

  let mut config = EngineConfig::default();
  if let Some(ms) = timeout_ms {
    config = config.with_node_timeout(Duration::from_millis(ms));
  }
  let engine = GraphEngine::with_config(graph, ProcessorRegistry::with_builtins(), config);

  let observer = CallbackObserver::new()
    .on_progress(|progress, total| eprintln!("Progress: {}/{}", progress, total))
    .on_node_error(|id, title, error| eprintln!("Node {} ({}) failed: {}", id, title, error));

  let execution = engine.execute(ExecuteOptions::with_observer(observer));
  tokio::pin!(execution);

  let results = tokio::select! {
    results = &mut execution => results,
    _ = tokio::signal::ctrl_c() => {
      eprintln!("Cancelling...");
      engine.cancel();
      execution.await
    }
  }
  .context("graph execution failed")?;

  let failed = results.iter().filter(|r| !r.is_success()).count();
  eprintln!(
    "Execution finished: {} end nodes, {} failed",
    results.len(),
    failed
  );

  println!("{}", serde_json::to_string_pretty(&results_by_node(&results))?);

  Ok(())
}

/// End-node results keyed by node id.
fn results_by_node(results: &[ExecutionResult]) -> serde_json::Map<String, serde_json::Value> {
  results
    .iter()
    .map(|r| {
      let value = match r.value() {
        Some(value) => serde_json::json!({
          "title": r.title,
          "value": value,
          "elapsed_ms": r.elapsed_ms,
        }),
        None => serde_json::json!({
          "title": r.title,
          "error": r.error(),
          "elapsed_ms": r.elapsed_ms,
        }),
      };
      (r.node_id.to_string(), value)
    })
    .collect()
}

async fn inspect_graph(graph_file: PathBuf) -> Result<()> {
  let graph = load_graph(&graph_file).await?;
  graph
    .validate()
    .with_context(|| format!("invalid graph: {}", graph_file.display()))?;

  println!("{}", serde_json::to_string_pretty(&describe(&graph))?);

  Ok(())
}

fn describe(graph: &Graph) -> serde_json::Value {
  let end_nodes: Vec<_> = topology::end_nodes(graph)
    .into_iter()
    .map(|n| serde_json::json!({ "id": n.id, "title": n.title, "node_type": n.node_type }))
    .collect();

  serde_json::json!({
    "nodes": graph.nodes.len(),
    "connections": graph.connections.len(),
    "end_nodes": end_nodes,
    "dependency_edges": topology::dependency_edges(graph),
    "estimated_total": topology::estimate_total(graph),
  })
}
