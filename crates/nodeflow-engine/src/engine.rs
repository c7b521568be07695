//! Run coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use futures::future::join_all;
use nodeflow_graph::{Graph, GraphIndex, Node, NodeId, NodeValue, topology};
use nodeflow_processor::{NodeError, NodeOutput, ProcessorRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{Span, error, info, instrument, warn};

use crate::cache::ExecutionCache;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{ExecuteOptions, ExecutionObserver};
use crate::executor::{RunContext, execute_node};
use crate::monitor::RunMonitor;
use crate::result::{ExecutionResult, NodeOutcome};
use crate::status::{ExecutionStatus, RunState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Held for the whole of `execute`; only one run per engine at a time.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self(flag))
  }
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// Cancellation handle of the run in flight.
struct ActiveRun {
  run_id: String,
  cancel: CancellationToken,
}

/// Executes a node graph.
///
/// Owns the working graph: after every run the engine swaps in a new copy
/// annotated with the outcome of each node the run reached. Snapshots handed
/// out earlier by [`graph`](Self::graph) are never mutated.
pub struct GraphEngine {
  graph: RwLock<Arc<Graph>>,
  registry: Arc<ProcessorRegistry>,
  config: EngineConfig,
  status: Arc<Mutex<ExecutionStatus>>,
  state: Mutex<RunState>,
  running: AtomicBool,
  active: Mutex<Option<ActiveRun>>,
}

impl GraphEngine {
  pub fn new(graph: Graph, registry: ProcessorRegistry) -> Self {
    Self::with_config(graph, registry, EngineConfig::default())
  }

  pub fn with_config(graph: Graph, registry: ProcessorRegistry, config: EngineConfig) -> Self {
    Self {
      graph: RwLock::new(Arc::new(graph)),
      registry: Arc::new(registry),
      config,
      status: Arc::new(Mutex::new(ExecutionStatus::idle())),
      state: Mutex::new(RunState::Idle),
      running: AtomicBool::new(false),
      active: Mutex::new(None),
    }
  }

  /// The current graph, including annotations written by the last run.
  pub fn graph(&self) -> Arc<Graph> {
    self
      .graph
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// The current node list, including `processing`/`result` annotations.
  pub fn nodes(&self) -> Vec<Node> {
    self.graph().nodes.clone()
  }

  /// Replace the working graph. Refused while a run is in flight.
  pub fn set_graph(&self, graph: Graph) -> Result<(), EngineError> {
    if self.running.load(Ordering::Acquire) {
      return Err(EngineError::AlreadyExecuting);
    }
    self.swap_graph(graph);
    Ok(())
  }

  fn swap_graph(&self, graph: Graph) {
    *self.graph.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(graph);
  }

  pub fn status(&self) -> ExecutionStatus {
    *lock(&self.status)
  }

  pub fn state(&self) -> RunState {
    *lock(&self.state)
  }

  /// Request best-effort cancellation of the run in flight.
  ///
  /// Reports `is_executing = false` immediately. Branches not yet settled
  /// resolve to [`NodeError::Cancelled`]; node computations already running
  /// are not interrupted and still report their completion.
  pub fn cancel(&self) {
    let run_id = {
      let active = lock(&self.active);
      let Some(run) = active.as_ref() else {
        return;
      };
      run.cancel.cancel();
      run.run_id.clone()
    };
    lock(&self.status).is_executing = false;

    let mut state = lock(&self.state);
    if *state == RunState::Executing {
      *state = RunState::Cancelled;
    }
    warn!(run_id = %run_id, "run_cancelled");
  }

  /// Execute every end node of the graph.
  ///
  /// Returns one result per end node, in graph order. A failing node fails
  /// only the end nodes that depend on it; the call itself errs only when the
  /// run cannot start (another run in flight, an invalid graph, or no end
  /// nodes).
  #[instrument(name = "graph_execute", skip_all, fields(run_id = tracing::field::Empty))]
  pub async fn execute(
    &self,
    options: ExecuteOptions,
  ) -> Result<Vec<ExecutionResult>, EngineError> {
    let _guard = RunGuard::acquire(&self.running).ok_or(EngineError::AlreadyExecuting)?;

    let run_id = uuid::Uuid::new_v4().to_string();
    Span::current().record("run_id", run_id.as_str());

    let cancel = CancellationToken::new();
    *lock(&self.active) = Some(ActiveRun {
      run_id: run_id.clone(),
      cancel: cancel.clone(),
    });
    *lock(&self.state) = RunState::Executing;
    *lock(&self.status) = ExecutionStatus {
      is_executing: true,
      progress: 0,
      total: 0,
    };

    let observer = options.observer;
    let result = self.run(&run_id, cancel.clone(), observer.clone()).await;

    lock(&self.active).take();
    *lock(&self.status) = ExecutionStatus::idle();

    match result {
      Ok(results) => {
        let cancelled = cancel.is_cancelled();
        *lock(&self.state) = if cancelled {
          RunState::Cancelled
        } else {
          RunState::Completed
        };
        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
          run_id = %run_id,
          end_nodes = results.len(),
          failed,
          cancelled,
          "run_completed"
        );
        observer.on_complete(&results);
        Ok(results)
      }
      Err(e) => {
        *lock(&self.state) = RunState::Failed;
        error!(run_id = %run_id, error = %e, "run_failed");
        observer.on_error(&e.to_string());
        Err(e)
      }
    }
  }

  async fn run(
    &self,
    run_id: &str,
    cancel: CancellationToken,
    observer: Arc<dyn ExecutionObserver>,
  ) -> Result<Vec<ExecutionResult>, EngineError> {
    let graph = self.graph();
    graph.validate()?;

    let end_nodes: Vec<(NodeId, String)> = topology::end_nodes(&graph)
      .into_iter()
      .map(|n| (n.id, n.title.clone()))
      .collect();
    if end_nodes.is_empty() {
      return Err(EngineError::NoEndNodes);
    }

    let estimate = topology::estimate_total(&graph);
    info!(
      run_id = %run_id,
      nodes = graph.nodes.len(),
      end_nodes = end_nodes.len(),
      estimate,
      "run_started"
    );

    let run = Arc::new(RunContext {
      run_id: run_id.to_string(),
      index: GraphIndex::new(&graph),
      graph: Arc::clone(&graph),
      registry: Arc::clone(&self.registry),
      cache: ExecutionCache::new(),
      cancel,
      config: self.config.clone(),
      monitor: RunMonitor::new(run_id.to_string(), Arc::clone(&self.status), estimate, observer),
    });

    let results = join_all(
      end_nodes
        .iter()
        .map(|(node_id, title)| run_branch(&run, *node_id, title)),
    )
    .await;

    // A branch gives up on its node when the run is cancelled, and a consumer
    // drops its inputs when it times out. Computations already started still
    // run to settlement.
    loop {
      let in_flight = run.cache.in_flight();
      if in_flight.is_empty() {
        break;
      }
      join_all(in_flight).await;
    }

    // Dropping the cache's futures also releases their handles on `run`.
    let outcomes = run.cache.drain();
    self.swap_graph(annotate(&graph, outcomes, &results));

    Ok(results)
  }
}

/// Execute one end node and capture its outcome; never fails the run.
async fn run_branch(run: &Arc<RunContext>, node_id: NodeId, title: &str) -> ExecutionResult {
  let started = Instant::now();
  let observer = run.monitor.observer();
  observer.on_node_start(node_id, title);
  info!(run_id = %run.run_id, node_id, title, "node_started");

  // Once dispatched, the node's own settlement is reported by the monitor.
  let outcome = if run.cancel.is_cancelled() {
    let e = NodeError::Cancelled;
    observer.on_node_error(node_id, title, &e.to_string());
    Err(e)
  } else {
    let future = execute_node(run, node_id);
    tokio::select! {
      biased;
      outcome = future => outcome,
      _ = run.cancel.cancelled() => Err(NodeError::Cancelled),
    }
  };

  ExecutionResult {
    node_id,
    title: title.to_string(),
    outcome: match outcome {
      Ok(output) => NodeOutcome::Success {
        value: output.to_value(),
      },
      Err(e) => NodeOutcome::Error {
        message: e.to_string(),
      },
    },
    elapsed_ms: started.elapsed().as_millis() as u64,
  }
}

/// Copy `graph`, recording each reached node's outcome on it.
///
/// End-node results take precedence over cache outcomes; a cache entry that
/// never started is recorded as cancelled.
fn annotate(
  graph: &Graph,
  outcomes: Vec<(NodeId, Option<Result<NodeOutput, NodeError>>)>,
  results: &[ExecutionResult],
) -> Graph {
  let mut annotated = graph.clone();
  let index = GraphIndex::new(graph);

  let mut record = |node_id: NodeId, value: NodeValue| {
    if let Some(node) = index
      .position(node_id)
      .and_then(|p| annotated.nodes.get_mut(p))
    {
      node.processing = false;
      node.result = Some(value);
    }
  };

  for (node_id, outcome) in outcomes {
    let value = match outcome {
      Some(Ok(output)) => output.to_value(),
      Some(Err(e)) => NodeValue::String(format!("Error: {e}")),
      None => NodeValue::String(format!("Error: {}", NodeError::Cancelled)),
    };
    record(node_id, value);
  }
  for result in results {
    record(result.node_id, result.display_value());
  }

  annotated
}
