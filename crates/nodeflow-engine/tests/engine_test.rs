//! Integration tests for GraphEngine::execute.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nodeflow_engine::{
  CallbackObserver, ChannelObserver, EngineConfig, EngineError, ExecuteOptions, ExecutionEvent,
  GraphEngine, RunState,
};
use nodeflow_graph::{Connection, Graph, GraphBuilder, Node, NodeId};
use nodeflow_processor::{NodeError, NodeOutput, NodeProcessor, ProcessContext, ProcessorRegistry};
use serde_json::json;

/// Emits the node's value after an optional delay and counts invocations
/// that ran to completion.
struct CountingProcessor {
  calls: Arc<AtomicUsize>,
  delay: Duration,
}

#[async_trait]
impl NodeProcessor for CountingProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(NodeOutput::Value(ctx.node.value.clone()))
  }
}

/// Sleeps, then emits the node's title.
struct SlowProcessor {
  delay: Duration,
}

#[async_trait]
impl NodeProcessor for SlowProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    tokio::time::sleep(self.delay).await;
    Ok(NodeOutput::from(ctx.node.title.as_str()))
  }
}

/// Sleeps, then relays its first input.
struct LazyRelayProcessor {
  delay: Duration,
}

#[async_trait]
impl NodeProcessor for LazyRelayProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    tokio::time::sleep(self.delay).await;
    let value = ctx
      .inputs()
      .await?
      .into_iter()
      .next()
      .and_then(|(_, value)| value)
      .unwrap_or_default();
    Ok(NodeOutput::Value(value))
  }
}

struct FailingProcessor;

#[async_trait]
impl NodeProcessor for FailingProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    Err(ctx.fail("model unavailable"))
  }
}

fn registry(calls: &Arc<AtomicUsize>) -> ProcessorRegistry {
  let mut registry = ProcessorRegistry::with_builtins();
  registry
    .register(
      "count",
      CountingProcessor {
        calls: calls.clone(),
        delay: Duration::ZERO,
      },
    )
    .register(
      "slow_count",
      CountingProcessor {
        calls: calls.clone(),
        delay: Duration::from_millis(100),
      },
    )
    .register(
      "slow",
      SlowProcessor {
        delay: Duration::from_secs(1),
      },
    )
    .register(
      "brief",
      SlowProcessor {
        delay: Duration::from_millis(40),
      },
    )
    .register(
      "lazy",
      LazyRelayProcessor {
        delay: Duration::from_millis(40),
      },
    )
    .register("fail", FailingProcessor);
  registry
}

fn node(id: NodeId, node_type: &str) -> Node {
  Node::new(id, format!("Node {id}"), node_type).with_output("out", "string")
}

fn relay(id: NodeId) -> Node {
  Node::new(id, format!("Relay {id}"), "join")
    .with_input("in", "string")
    .with_output("out", "string")
}

fn sink(id: NodeId) -> Node {
  Node::new(id, format!("Sink {id}"), "join").with_input("in", "string")
}

/// Source 1 (of type `source_type`) shared by end nodes 2 and 3.
fn diamond_of(source_type: &str) -> Graph {
  let mut builder = GraphBuilder::new();
  builder
    .add_node(node(1, source_type).with_value(json!("shared")))
    .unwrap()
    .add_node(sink(2))
    .unwrap()
    .add_node(sink(3))
    .unwrap();
  builder.connect(100, 200).unwrap().connect(100, 300).unwrap();
  builder.build()
}

fn diamond() -> Graph {
  diamond_of("count")
}

type Recorded = Arc<Mutex<Vec<NodeId>>>;

/// Records the node ids reported through `on_node_complete` and
/// `on_node_error`.
fn recording_observer() -> (CallbackObserver, Recorded, Recorded) {
  let completed = Arc::new(Mutex::new(Vec::new()));
  let failed = Arc::new(Mutex::new(Vec::new()));
  let (on_complete, on_error) = (completed.clone(), failed.clone());
  let observer = CallbackObserver::new()
    .on_node_complete(move |id, _, _| on_complete.lock().unwrap().push(id))
    .on_node_error(move |id, _, _| on_error.lock().unwrap().push(id));
  (observer, completed, failed)
}

#[tokio::test]
async fn test_shared_ancestor_runs_once_per_run() {
  let calls = Arc::new(AtomicUsize::new(0));
  let engine = GraphEngine::new(diamond(), registry(&calls));

  let results = engine.execute(ExecuteOptions::new()).await.unwrap();

  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(results.len(), 2);
  assert_eq!(results[0].value(), Some(&json!("shared")));
  assert_eq!(results[0].value(), results[1].value());
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_ancestor_is_shared() {
  let calls = Arc::new(AtomicUsize::new(0));
  let engine = GraphEngine::new(diamond_of("slow_count"), registry(&calls));

  let results = engine.execute(ExecuteOptions::new()).await.unwrap();

  // Both branches reached node 1 while its computation was still sleeping.
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(results.len(), 2);
  assert_eq!(results[0].value(), Some(&json!("shared")));
  assert_eq!(results[0].value(), results[1].value());
}

#[tokio::test]
async fn test_rerun_does_not_reuse_cache() {
  let calls = Arc::new(AtomicUsize::new(0));
  let engine = GraphEngine::new(diamond(), registry(&calls));

  let first = engine.execute(ExecuteOptions::new()).await.unwrap();
  let second = engine.execute(ExecuteOptions::new()).await.unwrap();

  assert_eq!(calls.load(Ordering::SeqCst), 2);
  let values = |results: &[nodeflow_engine::ExecutionResult]| {
    results.iter().map(|r| r.value().cloned()).collect::<Vec<_>>()
  };
  assert_eq!(values(&first), values(&second));
  assert_eq!(engine.state(), RunState::Completed);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_bounded() {
  let calls = Arc::new(AtomicUsize::new(0));
  // 1 -> 2 -> 3, plus isolated end node 4.
  let graph = Graph::new(
    vec![
      node(1, "count").with_value(json!("a")),
      relay(2),
      sink(3),
      node(4, "text").with_value(json!("b")),
    ],
    vec![Connection::new(100, 200), Connection::new(201, 300)],
  );
  let engine = GraphEngine::new(graph, registry(&calls));

  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  let observer = CallbackObserver::new().on_progress(move |progress, total| {
    sink.lock().unwrap().push((progress, total));
  });

  engine
    .execute(ExecuteOptions::with_observer(observer))
    .await
    .unwrap();

  let seen = seen.lock().unwrap().clone();
  assert_eq!(seen.len(), 4);
  assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
  assert!(seen.iter().all(|&(progress, total)| progress <= total));
  assert_eq!(seen.last(), Some(&(4, 4)));

  let status = engine.status();
  assert_eq!(status.progress, 0);
  assert!(!status.is_executing);
}

#[tokio::test]
async fn test_failure_isolated_to_its_branch() {
  let calls = Arc::new(AtomicUsize::new(0));
  let graph = Graph::new(
    vec![node(1, "fail"), sink(2), node(3, "text").with_value(json!("ok"))],
    vec![Connection::new(100, 200)],
  );
  let engine = GraphEngine::new(graph, registry(&calls));

  let results = engine.execute(ExecuteOptions::new()).await.unwrap();

  assert_eq!(results.len(), 2);
  assert_eq!(results[0].node_id, 2);
  assert_eq!(results[0].error(), Some("model unavailable"));
  assert_eq!(results[1].node_id, 3);
  assert_eq!(results[1].value(), Some(&json!("ok")));

  let nodes = engine.nodes();
  assert_eq!(nodes[0].result, Some(json!("Error: model unavailable")));
  assert_eq!(nodes[1].result, Some(json!("Error: model unavailable")));
  assert_eq!(nodes[2].result, Some(json!("ok")));
}

#[tokio::test]
async fn test_missing_processor_isolated_to_its_branch() {
  let calls = Arc::new(AtomicUsize::new(0));
  let graph = Graph::new(
    vec![node(1, "llm"), sink(2), node(3, "text").with_value(json!("ok"))],
    vec![Connection::new(100, 200)],
  );
  let engine = GraphEngine::new(graph, registry(&calls));

  let results = engine.execute(ExecuteOptions::new()).await.unwrap();

  assert_eq!(
    results[0].error(),
    Some("no processor registered for node 1 (type 'llm')")
  );
  assert!(results[1].is_success());
}

#[tokio::test]
async fn test_no_end_nodes_fails_run() {
  let calls = Arc::new(AtomicUsize::new(0));
  let graph = Graph::new(
    vec![relay(1), relay(2)],
    vec![Connection::new(101, 200), Connection::new(201, 100)],
  );
  let engine = GraphEngine::new(graph, registry(&calls));

  let errors = Arc::new(Mutex::new(Vec::new()));
  let sink = errors.clone();
  let observer =
    CallbackObserver::new().on_error(move |message| sink.lock().unwrap().push(message.to_string()));

  let err = engine
    .execute(ExecuteOptions::with_observer(observer))
    .await
    .unwrap_err();

  assert_eq!(err, EngineError::NoEndNodes);
  assert!(!engine.status().is_executing);
  assert_eq!(engine.state(), RunState::Failed);
  assert_eq!(
    *errors.lock().unwrap(),
    vec!["no end nodes found: every node has a connected output".to_string()]
  );
}

#[tokio::test]
async fn test_cycle_is_reported_not_hung() {
  let calls = Arc::new(AtomicUsize::new(0));
  // 1 and 2 feed each other; 2 also feeds end node 3.
  let graph = Graph::new(
    vec![relay(1), relay(2), sink(3)],
    vec![
      Connection::new(101, 200),
      Connection::new(201, 100),
      Connection::new(201, 300),
    ],
  );
  let engine = GraphEngine::new(graph, registry(&calls));

  let results = engine.execute(ExecuteOptions::new()).await.unwrap();

  assert_eq!(results.len(), 1);
  assert_eq!(results[0].error(), Some("cycle detected at node 2"));
}

#[tokio::test]
async fn test_multi_output_node_feeds_each_socket() {
  let calls = Arc::new(AtomicUsize::new(0));
  let split = Node::new(2, "Split", "split")
    .with_value(json!("="))
    .with_input("in", "string")
    .with_output("key", "string")
    .with_output("value", "string");
  let graph = Graph::new(
    vec![node(1, "text").with_value(json!("lang=rust")), split, sink(3), sink(4)],
    vec![
      Connection::new(100, 200),
      Connection::new(201, 300),
      Connection::new(202, 400),
    ],
  );
  let engine = GraphEngine::new(graph, registry(&calls));

  let results = engine.execute(ExecuteOptions::new()).await.unwrap();

  assert_eq!(results[0].value(), Some(&json!("lang")));
  assert_eq!(results[1].value(), Some(&json!("rust")));
  assert_eq!(
    engine.nodes()[1].result,
    Some(json!({"201": "lang", "202": "rust"}))
  );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_marks_pending_end_nodes() {
  let calls = Arc::new(AtomicUsize::new(0));
  let graph = Graph::new(
    vec![node(1, "slow"), sink(2), node(3, "slow")],
    vec![Connection::new(100, 200)],
  );
  let engine = GraphEngine::new(graph, registry(&calls));

  let (results, ()) = tokio::join!(engine.execute(ExecuteOptions::new()), async {
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(engine.status().is_executing);
    engine.cancel();
    assert!(!engine.status().is_executing);
  });

  let results = results.unwrap();
  assert_eq!(results.len(), 2);
  assert!(
    results
      .iter()
      .all(|r| r.error() == Some("Execution cancelled"))
  );
  assert_eq!(engine.state(), RunState::Cancelled);

  // Node 1 was already running when the run was cancelled.
  let nodes = engine.nodes();
  assert_eq!(nodes[0].result, Some(json!("Node 1")));
  assert_eq!(nodes[1].result, Some(json!("Error: Execution cancelled")));
  assert_eq!(nodes[2].result, Some(json!("Error: Execution cancelled")));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_lets_started_nodes_finish() {
  let calls = Arc::new(AtomicUsize::new(0));
  let graph = Graph::new(
    vec![node(1, "slow_count").with_value(json!("late")), sink(2)],
    vec![Connection::new(100, 200)],
  );
  let engine = GraphEngine::new(graph, registry(&calls));
  let (observer, completed, failed) = recording_observer();

  let execution = engine.execute(ExecuteOptions::with_observer(observer));
  let (results, ()) = tokio::join!(execution, async {
    tokio::time::sleep(Duration::from_millis(10)).await;
    engine.cancel();
  });

  let results = results.unwrap();
  assert_eq!(results[0].error(), Some("Execution cancelled"));
  assert_eq!(engine.state(), RunState::Cancelled);

  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(*completed.lock().unwrap(), vec![1, 2]);
  assert!(failed.lock().unwrap().is_empty());
  assert_eq!(engine.nodes()[0].result, Some(json!("late")));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_end_node_reported_once() {
  let calls = Arc::new(AtomicUsize::new(0));
  let graph = Graph::new(
    vec![node(1, "slow"), node(2, "text").with_value(json!("b"))],
    vec![],
  );
  let engine = GraphEngine::new(graph, registry(&calls));
  let (observer, completed, failed) = recording_observer();

  let execution = engine.execute(ExecuteOptions::with_observer(observer));
  let (results, ()) = tokio::join!(execution, async {
    tokio::time::sleep(Duration::from_millis(10)).await;
    engine.cancel();
  });

  // End node 1 was cancelled mid-computation: its result says so, and its
  // node reports only the completion that eventually arrived.
  let results = results.unwrap();
  assert_eq!(results[0].error(), Some("Execution cancelled"));
  assert_eq!(results[1].value(), Some(&json!("b")));
  assert_eq!(*completed.lock().unwrap(), vec![2, 1]);
  assert!(failed.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_execute_is_rejected() {
  let calls = Arc::new(AtomicUsize::new(0));
  let engine = GraphEngine::new(Graph::new(vec![node(1, "slow")], vec![]), registry(&calls));

  let (first, second) = tokio::join!(
    engine.execute(ExecuteOptions::new()),
    engine.execute(ExecuteOptions::new())
  );

  assert_eq!(second.unwrap_err(), EngineError::AlreadyExecuting);
  assert_eq!(first.unwrap()[0].value(), Some(&json!("Node 1")));
  assert!(engine.execute(ExecuteOptions::new()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_node_timeout() {
  let calls = Arc::new(AtomicUsize::new(0));
  let config = EngineConfig::default().with_node_timeout(Duration::from_millis(50));
  let graph = Graph::new(
    vec![node(1, "slow"), node(2, "text").with_value(json!("fast"))],
    vec![],
  );
  let engine = GraphEngine::with_config(graph, registry(&calls), config);

  let results = engine.execute(ExecuteOptions::new()).await.unwrap();

  assert_eq!(results[0].error(), Some("node 1 timed out"));
  assert_eq!(results[1].value(), Some(&json!("fast")));
}

#[tokio::test(start_paused = true)]
async fn test_consumer_timeout_leaves_producer_result() {
  let calls = Arc::new(AtomicUsize::new(0));
  let config = EngineConfig::default().with_node_timeout(Duration::from_millis(50));
  // Node 2 waits 40ms before asking for node 1, which takes another 40ms.
  let graph = Graph::new(
    vec![
      node(1, "brief"),
      Node::new(2, "Lazy 2", "lazy").with_input("in", "string"),
    ],
    vec![Connection::new(100, 200)],
  );
  let engine = GraphEngine::with_config(graph, registry(&calls), config);
  let (observer, completed, failed) = recording_observer();

  let results = engine
    .execute(ExecuteOptions::with_observer(observer))
    .await
    .unwrap();

  assert_eq!(results[0].error(), Some("node 2 timed out"));
  assert_eq!(engine.state(), RunState::Completed);
  assert_eq!(*failed.lock().unwrap(), vec![2]);
  assert_eq!(*completed.lock().unwrap(), vec![1]);

  let nodes = engine.nodes();
  assert_eq!(nodes[0].result, Some(json!("Node 1")));
  assert_eq!(nodes[1].result, Some(json!("Error: node 2 timed out")));
}

#[tokio::test]
async fn test_channel_observer_sees_run_in_order() {
  let calls = Arc::new(AtomicUsize::new(0));
  let graph = Graph::new(
    vec![node(1, "text").with_value(json!("hi")), sink(2)],
    vec![Connection::new(100, 200)],
  );
  let engine = GraphEngine::new(graph, registry(&calls));
  let (observer, mut receiver) = ChannelObserver::channel();

  let results = engine
    .execute(ExecuteOptions::with_observer(observer))
    .await
    .unwrap();

  let mut events = Vec::new();
  while let Ok(event) = receiver.try_recv() {
    events.push(event);
  }

  assert_eq!(
    events,
    vec![
      ExecutionEvent::NodeStarted {
        node_id: 2,
        title: "Sink 2".to_string()
      },
      ExecutionEvent::Progress {
        progress: 1,
        total: 2
      },
      ExecutionEvent::NodeCompleted {
        node_id: 1,
        title: "Node 1".to_string(),
        result: json!("hi")
      },
      ExecutionEvent::Progress {
        progress: 2,
        total: 2
      },
      ExecutionEvent::NodeCompleted {
        node_id: 2,
        title: "Sink 2".to_string(),
        result: json!("hi")
      },
      ExecutionEvent::RunCompleted { results },
    ]
  );
}
