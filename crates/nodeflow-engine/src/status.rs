use serde::{Deserialize, Serialize};

/// Snapshot of the engine's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
  pub is_executing: bool,
  /// Nodes settled so far in the current run.
  pub progress: usize,
  /// Upper-bound estimate of the nodes the run can reach.
  pub total: usize,
}

impl ExecutionStatus {
  pub fn idle() -> Self {
    Self::default()
  }
}

/// Lifecycle of the most recent run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  #[default]
  Idle,
  Executing,
  Completed,
  Failed,
  Cancelled,
}
