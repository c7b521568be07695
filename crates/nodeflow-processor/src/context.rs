use async_trait::async_trait;
use nodeflow_graph::{Node, NodeValue, Socket, SocketId};

use crate::error::NodeError;

/// Resolves the value arriving at an input socket.
///
/// Implemented by the engine: resolving an input may run (or await) the
/// upstream node that feeds it.
#[async_trait]
pub trait InputResolver: Send + Sync {
  /// Value arriving at `socket_id`, or `None` when nothing is connected or
  /// the producer emitted nothing for the connected output socket.
  async fn resolve(&self, socket_id: SocketId) -> Result<Option<NodeValue>, NodeError>;
}

/// Everything a processor sees while computing one node.
pub struct ProcessContext<'a> {
  pub node: &'a Node,
  inputs: &'a dyn InputResolver,
}

impl<'a> ProcessContext<'a> {
  pub fn new(node: &'a Node, inputs: &'a dyn InputResolver) -> Self {
    Self { node, inputs }
  }

  /// Value of the input socket with the given id.
  pub async fn input(&self, socket_id: SocketId) -> Result<Option<NodeValue>, NodeError> {
    self.inputs.resolve(socket_id).await
  }

  /// Values of all input sockets, in declaration order.
  pub async fn inputs(&self) -> Result<Vec<(&'a Socket, Option<NodeValue>)>, NodeError> {
    let mut values = Vec::new();
    for socket in self.node.inputs() {
      values.push((socket, self.input(socket.id).await?));
    }
    Ok(values)
  }

  /// Build a failure attributed to this node.
  pub fn fail(&self, message: impl Into<String>) -> NodeError {
    NodeError::failed(self.node.id, message)
  }
}
