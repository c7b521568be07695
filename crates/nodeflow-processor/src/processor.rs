use async_trait::async_trait;
use nodeflow_graph::{Node, NodeValue};

use crate::context::ProcessContext;
use crate::error::NodeError;
use crate::output::NodeOutput;

/// Computation for one node type.
#[async_trait]
pub trait NodeProcessor: Send + Sync {
  /// Compute the node's output, pulling inputs through `ctx`.
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError>;
}

/// Processor built from a synchronous function over the node and its
/// resolved inputs (in socket declaration order).
pub struct FnProcessor<F> {
  func: F,
}

impl<F> FnProcessor<F>
where
  F: Fn(&Node, Vec<Option<NodeValue>>) -> Result<NodeOutput, NodeError> + Send + Sync,
{
  pub fn new(func: F) -> Self {
    Self { func }
  }
}

#[async_trait]
impl<F> NodeProcessor for FnProcessor<F>
where
  F: Fn(&Node, Vec<Option<NodeValue>>) -> Result<NodeOutput, NodeError> + Send + Sync,
{
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    let inputs = ctx
      .inputs()
      .await?
      .into_iter()
      .map(|(_, value)| value)
      .collect();
    (self.func)(ctx.node, inputs)
  }
}
