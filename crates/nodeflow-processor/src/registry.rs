use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nodeflow_graph::{Node, NodeValue};

use crate::builtin;
use crate::error::NodeError;
use crate::output::NodeOutput;
use crate::processor::{FnProcessor, NodeProcessor};

/// Maps node-type tags to the processors that compute them.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
  processors: HashMap<String, Arc<dyn NodeProcessor>>,
}

impl ProcessorRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a registry with every builtin node type registered.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    builtin::register_all(&mut registry);
    registry
  }

  /// Register a processor for a node type, replacing any previous one.
  pub fn register(
    &mut self,
    node_type: impl Into<String>,
    processor: impl NodeProcessor + 'static,
  ) -> &mut Self {
    self.processors.insert(node_type.into(), Arc::new(processor));
    self
  }

  /// Register a synchronous function over the node and its resolved inputs.
  pub fn register_fn<F>(&mut self, node_type: impl Into<String>, func: F) -> &mut Self
  where
    F: Fn(&Node, Vec<Option<NodeValue>>) -> Result<NodeOutput, NodeError> + Send + Sync + 'static,
  {
    self.register(node_type, FnProcessor::new(func))
  }

  /// Get the processor for a node type.
  pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeProcessor>> {
    self.processors.get(node_type).cloned()
  }

  /// Get the processor for a node, failing with `MissingProcessor`.
  pub fn resolve(&self, node: &Node) -> Result<Arc<dyn NodeProcessor>, NodeError> {
    self
      .get(&node.node_type)
      .ok_or_else(|| NodeError::MissingProcessor {
        node_id: node.id,
        node_type: node.node_type.clone(),
      })
  }

  pub fn contains(&self, node_type: &str) -> bool {
    self.processors.contains_key(node_type)
  }

  /// Registered node types, sorted.
  pub fn node_types(&self) -> Vec<&str> {
    let mut types: Vec<&str> = self.processors.keys().map(String::as_str).collect();
    types.sort_unstable();
    types
  }
}

impl fmt::Debug for ProcessorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProcessorRegistry")
      .field("node_types", &self.node_types())
      .finish()
  }
}
