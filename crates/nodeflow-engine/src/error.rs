//! Run-level errors.

use nodeflow_graph::GraphError;

/// Errors that fail a whole run.
///
/// Failures of individual nodes are not run errors: they are reported per end
/// node in the run's results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
  /// Another run is still in flight on this engine.
  #[error("graph is already executing")]
  AlreadyExecuting,

  /// Every node's output feeds another node, so there is nothing to pull.
  #[error("no end nodes found: every node has a connected output")]
  NoEndNodes,

  /// The graph failed structural validation.
  #[error("invalid graph: {0}")]
  InvalidGraph(#[from] GraphError),
}
