use std::time::Duration;

/// Configuration for the graph engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
  /// Upper bound for a single node's computation. `None` disables the limit.
  pub node_timeout: Option<Duration>,
}

impl EngineConfig {
  pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
    self.node_timeout = Some(timeout);
    self
  }
}
