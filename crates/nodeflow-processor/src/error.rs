//! Node-level errors.

use nodeflow_graph::NodeId;
use thiserror::Error;

/// Errors produced while computing a single node.
///
/// Cloneable because one node's outcome is shared by every consumer awaiting
/// it; an upstream failure reaches each dependent node unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
  /// The node's type has no registered processor.
  #[error("no processor registered for node {node_id} (type '{node_type}')")]
  MissingProcessor { node_id: NodeId, node_type: String },

  /// The node's processor reported a failure.
  #[error("{message}")]
  Failed { node_id: NodeId, message: String },

  /// The node was awaited while it was itself waiting on the awaiting node.
  #[error("cycle detected at node {node_id}")]
  CycleDetected { node_id: NodeId },

  /// A connection points at a node that is not in the graph.
  #[error("node {node_id} not found")]
  NodeNotFound { node_id: NodeId },

  /// The node's computation exceeded the configured timeout.
  #[error("node {node_id} timed out")]
  Timeout { node_id: NodeId },

  /// The run was cancelled before the node settled.
  #[error("Execution cancelled")]
  Cancelled,
}

impl NodeError {
  pub fn failed(node_id: NodeId, message: impl Into<String>) -> Self {
    Self::Failed {
      node_id,
      message: message.into(),
    }
  }
}
