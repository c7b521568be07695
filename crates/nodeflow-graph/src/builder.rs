use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::{Connection, Node, NodeId, SocketId};

/// Incremental graph construction with connection checks.
///
/// ```
/// use nodeflow_graph::{GraphBuilder, Node};
///
/// let mut builder = GraphBuilder::new();
/// builder.add_node(Node::new(1, "Topic", "text").with_output("out", "string"))?;
/// builder.add_node(Node::new(2, "Prompt", "template").with_input("topic", "string"))?;
/// builder.connect(100, 200)?;
/// let graph = builder.build();
/// assert_eq!(graph.connections.len(), 1);
/// # Ok::<(), nodeflow_graph::GraphError>(())
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
  graph: Graph,
}

impl GraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a node. Node ids and socket ids must not collide with existing ones.
  pub fn add_node(&mut self, node: Node) -> Result<&mut Self, GraphError> {
    if self.graph.node(node.id).is_some() {
      return Err(GraphError::DuplicateNode(node.id));
    }
    if let Some(socket) = node
      .sockets
      .iter()
      .find(|s| self.graph.socket(s.id).is_some())
    {
      return Err(GraphError::DuplicateSocket(socket.id));
    }
    self.graph.nodes.push(node);
    Ok(self)
  }

  /// Connect an output socket to an input socket.
  ///
  /// Fails if either socket is unknown, the directions are wrong, or the
  /// input socket is already fed by another connection.
  pub fn connect(&mut self, from: SocketId, to: SocketId) -> Result<&mut Self, GraphError> {
    let (_, from_socket) = self
      .graph
      .socket(from)
      .ok_or(GraphError::UnknownSocket(from))?;
    if !from_socket.is_output() {
      return Err(GraphError::NotAnOutput {
        node_id: from_socket.node_id,
        socket_id: from,
      });
    }

    let (_, to_socket) = self.graph.socket(to).ok_or(GraphError::UnknownSocket(to))?;
    if !to_socket.is_input() {
      return Err(GraphError::NotAnInput {
        node_id: to_socket.node_id,
        socket_id: to,
      });
    }

    if self.graph.connection_into(to).is_some() {
      return Err(GraphError::FanIn {
        socket_id: to,
        count: 2,
      });
    }

    self.graph.connections.push(Connection::new(from, to));
    Ok(self)
  }

  /// Remove a node and every connection touching its sockets.
  pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
    let position = self
      .graph
      .nodes
      .iter()
      .position(|n| n.id == node_id)
      .ok_or(GraphError::NodeNotFound(node_id))?;
    let node = self.graph.nodes.remove(position);

    self.graph.connections.retain(|c| {
      node.socket(c.from_socket).is_none() && node.socket(c.to_socket).is_none()
    });

    Ok(node)
  }

  pub fn build(self) -> Graph {
    self.graph
  }
}
