//! Node executor.
//!
//! A node's future is stored in the run's cache before anything inside it
//! runs, so every consumer of a shared ancestor awaits the same computation.
//! Inputs are resolved lazily: asking for an input runs (or joins) the
//! producing node through the same cache.

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use nodeflow_graph::{Graph, GraphIndex, Node, NodeId, NodeValue, SocketId};
use nodeflow_processor::{
  InputResolver, NodeError, NodeOutput, ProcessContext, ProcessorRegistry,
};
use tokio_util::sync::CancellationToken;

use crate::cache::{ExecutionCache, NodeFuture};
use crate::config::EngineConfig;
use crate::monitor::RunMonitor;

/// Everything shared by the branches of one run.
pub(crate) struct RunContext {
  pub run_id: String,
  pub graph: Arc<Graph>,
  pub index: GraphIndex,
  pub registry: Arc<ProcessorRegistry>,
  pub cache: ExecutionCache,
  pub cancel: CancellationToken,
  pub config: EngineConfig,
  pub monitor: RunMonitor,
}

impl RunContext {
  pub fn node(&self, node_id: NodeId) -> Option<&Node> {
    self
      .index
      .position(node_id)
      .and_then(|position| self.graph.nodes.get(position))
  }

  fn title(&self, node_id: NodeId) -> String {
    self
      .node(node_id)
      .map(|n| n.title.clone())
      .unwrap_or_default()
  }
}

/// Get the memoized future for `node_id`, creating it on first request.
pub(crate) fn execute_node(run: &Arc<RunContext>, node_id: NodeId) -> NodeFuture {
  let (future, created) = run.cache.get_or_insert_with(node_id, || {
    let run = Arc::clone(run);
    async move {
      let outcome = compute(&run, node_id).await;
      run.cache.mark_settled(node_id);
      run
        .monitor
        .node_settled(node_id, &run.title(node_id), &outcome);
      outcome
    }
    .boxed()
  });

  if created {
    run.monitor.node_inserted();
  }
  future
}

async fn compute(run: &Arc<RunContext>, node_id: NodeId) -> Result<NodeOutput, NodeError> {
  let node = run.node(node_id).ok_or(NodeError::NodeNotFound { node_id })?;

  if run.cancel.is_cancelled() {
    return Err(NodeError::Cancelled);
  }
  run.cache.mark_started(node_id);

  let processor = run.registry.resolve(node)?;
  let inputs = NodeInputs {
    run: Arc::clone(run),
    consumer: node_id,
  };
  let process = processor.process(ProcessContext::new(node, &inputs));

  match run.config.node_timeout {
    Some(limit) => tokio::time::timeout(limit, process)
      .await
      .map_err(|_| NodeError::Timeout { node_id })?,
    None => process.await,
  }
}

/// Input resolution for one consuming node.
struct NodeInputs {
  run: Arc<RunContext>,
  consumer: NodeId,
}

#[async_trait]
impl InputResolver for NodeInputs {
  async fn resolve(&self, socket_id: SocketId) -> Result<Option<NodeValue>, NodeError> {
    if self.run.index.owner(socket_id) != Some(self.consumer) {
      return Ok(None);
    }
    let Some(source) = self.run.index.source_of(socket_id) else {
      return Ok(None);
    };
    let producer = self.run.index.owner(source).ok_or_else(|| {
      NodeError::failed(
        self.consumer,
        format!("input socket {socket_id} is fed by unknown socket {source}"),
      )
    })?;

    let _wait = self.run.cache.begin_wait(self.consumer, producer)?;
    let output = execute_node(&self.run, producer).await?;
    Ok(output.for_socket(source))
  }
}
