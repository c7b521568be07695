//! Per-end-node results.

use nodeflow_graph::{NodeId, NodeValue};
use serde::{Deserialize, Serialize};

/// Outcome of one end node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
  Success { value: NodeValue },
  Error { message: String },
}

/// Result of one end node's branch of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub node_id: NodeId,
  pub title: String,
  #[serde(flatten)]
  pub outcome: NodeOutcome,
  /// Wall time from dispatching the branch to its settlement.
  pub elapsed_ms: u64,
}

impl ExecutionResult {
  pub fn is_success(&self) -> bool {
    matches!(self.outcome, NodeOutcome::Success { .. })
  }

  pub fn value(&self) -> Option<&NodeValue> {
    match &self.outcome {
      NodeOutcome::Success { value } => Some(value),
      NodeOutcome::Error { .. } => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match &self.outcome {
      NodeOutcome::Success { .. } => None,
      NodeOutcome::Error { message } => Some(message),
    }
  }

  /// Value stored on the node after the run: the result, or an
  /// `"Error: <message>"` placeholder.
  pub fn display_value(&self) -> NodeValue {
    match &self.outcome {
      NodeOutcome::Success { value } => value.clone(),
      NodeOutcome::Error { message } => NodeValue::String(format!("Error: {}", message)),
    }
  }
}
