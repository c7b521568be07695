//! Execution events and observers.
//!
//! The engine reports progress through an [`ExecutionObserver`] supplied per
//! run in [`ExecuteOptions`]. Every method has a no-op default, so observers
//! implement only what they care about.

use std::fmt;
use std::sync::Arc;

use nodeflow_graph::{NodeId, NodeValue};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::ExecutionResult;

/// Receives callbacks while a run progresses.
pub trait ExecutionObserver: Send + Sync {
  /// A node settled; `progress` of an estimated `total` nodes are done.
  fn on_progress(&self, _progress: usize, _total: usize) {}

  /// An end node's branch was dispatched.
  fn on_node_start(&self, _node_id: NodeId, _title: &str) {}

  /// A node (end or interior) produced a value.
  fn on_node_complete(&self, _node_id: NodeId, _title: &str, _result: &NodeValue) {}

  /// A node (end or interior) failed or was cancelled.
  fn on_node_error(&self, _node_id: NodeId, _title: &str, _error: &str) {}

  /// The run finished; one result per end node.
  fn on_complete(&self, _results: &[ExecutionResult]) {}

  /// The run failed as a whole (e.g. no end nodes).
  fn on_error(&self, _message: &str) {}
}

/// An observer that discards all callbacks.
#[derive(Debug, Clone, Default)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Events mirrored from observer callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  Progress {
    progress: usize,
    total: usize,
  },
  NodeStarted {
    node_id: NodeId,
    title: String,
  },
  NodeCompleted {
    node_id: NodeId,
    title: String,
    result: NodeValue,
  },
  NodeFailed {
    node_id: NodeId,
    title: String,
    error: String,
  },
  RunCompleted {
    results: Vec<ExecutionResult>,
  },
  RunFailed {
    error: String,
  },
}

/// An observer that sends every callback as an [`ExecutionEvent`] to an
/// unbounded channel.
///
/// Send errors are ignored: a dropped receiver just stops observing.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelObserver {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create an observer together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }

  fn send(&self, event: ExecutionEvent) {
    let _ = self.sender.send(event);
  }
}

impl ExecutionObserver for ChannelObserver {
  fn on_progress(&self, progress: usize, total: usize) {
    self.send(ExecutionEvent::Progress { progress, total });
  }

  fn on_node_start(&self, node_id: NodeId, title: &str) {
    self.send(ExecutionEvent::NodeStarted {
      node_id,
      title: title.to_string(),
    });
  }

  fn on_node_complete(&self, node_id: NodeId, title: &str, result: &NodeValue) {
    self.send(ExecutionEvent::NodeCompleted {
      node_id,
      title: title.to_string(),
      result: result.clone(),
    });
  }

  fn on_node_error(&self, node_id: NodeId, title: &str, error: &str) {
    self.send(ExecutionEvent::NodeFailed {
      node_id,
      title: title.to_string(),
      error: error.to_string(),
    });
  }

  fn on_complete(&self, results: &[ExecutionResult]) {
    self.send(ExecutionEvent::RunCompleted {
      results: results.to_vec(),
    });
  }

  fn on_error(&self, message: &str) {
    self.send(ExecutionEvent::RunFailed {
      error: message.to_string(),
    });
  }
}

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;
type NodeStartFn = Box<dyn Fn(NodeId, &str) + Send + Sync>;
type NodeCompleteFn = Box<dyn Fn(NodeId, &str, &NodeValue) + Send + Sync>;
type NodeErrorFn = Box<dyn Fn(NodeId, &str, &str) + Send + Sync>;
type CompleteFn = Box<dyn Fn(&[ExecutionResult]) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&str) + Send + Sync>;

/// An observer assembled from optional closures.
///
/// ```ignore
/// let observer = CallbackObserver::new()
///   .on_progress(|progress, total| println!("{progress}/{total}"))
///   .on_node_error(|id, title, error| eprintln!("{id} {title}: {error}"));
/// ```
#[derive(Default)]
pub struct CallbackObserver {
  progress: Option<ProgressFn>,
  node_start: Option<NodeStartFn>,
  node_complete: Option<NodeCompleteFn>,
  node_error: Option<NodeErrorFn>,
  complete: Option<CompleteFn>,
  error: Option<ErrorFn>,
}

impl CallbackObserver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
    self.progress = Some(Box::new(f));
    self
  }

  pub fn on_node_start(mut self, f: impl Fn(NodeId, &str) + Send + Sync + 'static) -> Self {
    self.node_start = Some(Box::new(f));
    self
  }

  pub fn on_node_complete(
    mut self,
    f: impl Fn(NodeId, &str, &NodeValue) + Send + Sync + 'static,
  ) -> Self {
    self.node_complete = Some(Box::new(f));
    self
  }

  pub fn on_node_error(mut self, f: impl Fn(NodeId, &str, &str) + Send + Sync + 'static) -> Self {
    self.node_error = Some(Box::new(f));
    self
  }

  pub fn on_complete(mut self, f: impl Fn(&[ExecutionResult]) + Send + Sync + 'static) -> Self {
    self.complete = Some(Box::new(f));
    self
  }

  pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
    self.error = Some(Box::new(f));
    self
  }
}

impl ExecutionObserver for CallbackObserver {
  fn on_progress(&self, progress: usize, total: usize) {
    if let Some(f) = &self.progress {
      f(progress, total);
    }
  }

  fn on_node_start(&self, node_id: NodeId, title: &str) {
    if let Some(f) = &self.node_start {
      f(node_id, title);
    }
  }

  fn on_node_complete(&self, node_id: NodeId, title: &str, result: &NodeValue) {
    if let Some(f) = &self.node_complete {
      f(node_id, title, result);
    }
  }

  fn on_node_error(&self, node_id: NodeId, title: &str, error: &str) {
    if let Some(f) = &self.node_error {
      f(node_id, title, error);
    }
  }

  fn on_complete(&self, results: &[ExecutionResult]) {
    if let Some(f) = &self.complete {
      f(results);
    }
  }

  fn on_error(&self, message: &str) {
    if let Some(f) = &self.error {
      f(message);
    }
  }
}

impl fmt::Debug for CallbackObserver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CallbackObserver")
      .field("on_progress", &self.progress.is_some())
      .field("on_node_start", &self.node_start.is_some())
      .field("on_node_complete", &self.node_complete.is_some())
      .field("on_node_error", &self.node_error.is_some())
      .field("on_complete", &self.complete.is_some())
      .field("on_error", &self.error.is_some())
      .finish()
  }
}

/// Options for a single [`GraphEngine::execute`](crate::GraphEngine::execute) call.
#[derive(Clone)]
pub struct ExecuteOptions {
  pub(crate) observer: Arc<dyn ExecutionObserver>,
}

impl ExecuteOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_observer(observer: impl ExecutionObserver + 'static) -> Self {
    Self {
      observer: Arc::new(observer),
    }
  }
}

impl Default for ExecuteOptions {
  fn default() -> Self {
    Self {
      observer: Arc::new(NoopObserver),
    }
  }
}

impl fmt::Debug for ExecuteOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExecuteOptions").finish_non_exhaustive()
  }
}
