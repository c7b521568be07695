use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node::{Connection, Node, NodeId, Socket, SocketId};

/// A node graph: nodes and the connections between their sockets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
  #[serde(default)]
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub connections: Vec<Connection>,
}

impl Graph {
  pub fn new(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
    Self { nodes, connections }
  }

  /// Get a node by ID.
  pub fn node(&self, node_id: NodeId) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  /// Get a socket and its owning node by socket ID.
  pub fn socket(&self, socket_id: SocketId) -> Option<(&Node, &Socket)> {
    self
      .nodes
      .iter()
      .find_map(|n| n.socket(socket_id).map(|s| (n, s)))
  }

  /// The connection feeding an input socket, if any.
  pub fn connection_into(&self, socket_id: SocketId) -> Option<&Connection> {
    self.connections.iter().find(|c| c.to_socket == socket_id)
  }

  /// Whether anything consumes the given output socket.
  pub fn is_consumed(&self, socket_id: SocketId) -> bool {
    self.connections.iter().any(|c| c.from_socket == socket_id)
  }

  /// Check structural invariants the engine relies on.
  ///
  /// Node and socket ids must be unique, every connection must join an
  /// existing output socket to an existing input socket, and no input socket
  /// may have more than one incoming connection.
  pub fn validate(&self) -> Result<(), GraphError> {
    let mut node_ids = HashSet::new();
    let mut sockets: HashMap<SocketId, &Socket> = HashMap::new();

    for node in &self.nodes {
      if !node_ids.insert(node.id) {
        return Err(GraphError::DuplicateNode(node.id));
      }
      for socket in &node.sockets {
        if sockets.insert(socket.id, socket).is_some() {
          return Err(GraphError::DuplicateSocket(socket.id));
        }
      }
    }

    let mut incoming: HashMap<SocketId, usize> = HashMap::new();
    for connection in &self.connections {
      let from = sockets
        .get(&connection.from_socket)
        .ok_or(GraphError::UnknownSocket(connection.from_socket))?;
      let to = sockets
        .get(&connection.to_socket)
        .ok_or(GraphError::UnknownSocket(connection.to_socket))?;

      if !from.is_output() {
        return Err(GraphError::NotAnOutput {
          node_id: from.node_id,
          socket_id: from.id,
        });
      }
      if !to.is_input() {
        return Err(GraphError::NotAnInput {
          node_id: to.node_id,
          socket_id: to.id,
        });
      }

      *incoming.entry(to.id).or_default() += 1;
    }

    if let Some((socket_id, count)) = incoming.into_iter().find(|(_, count)| *count > 1) {
      return Err(GraphError::FanIn { socket_id, count });
    }

    Ok(())
  }
}

/// Owned lookup tables over a graph, built once per execution.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
  /// node_id -> position in `Graph::nodes`.
  positions: HashMap<NodeId, usize>,
  /// socket_id -> owning node_id.
  owners: HashMap<SocketId, NodeId>,
  /// input socket_id -> output socket_id feeding it.
  feeds: HashMap<SocketId, SocketId>,
}

impl GraphIndex {
  pub fn new(graph: &Graph) -> Self {
    let mut positions = HashMap::with_capacity(graph.nodes.len());
    let mut owners = HashMap::new();

    for (position, node) in graph.nodes.iter().enumerate() {
      positions.entry(node.id).or_insert(position);
      for socket in &node.sockets {
        owners.entry(socket.id).or_insert(node.id);
      }
    }

    // Last connection wins; `Graph::validate` rejects fan-in beforehand.
    let feeds = graph
      .connections
      .iter()
      .map(|c| (c.to_socket, c.from_socket))
      .collect();

    Self {
      positions,
      owners,
      feeds,
    }
  }

  /// Position of a node inside `Graph::nodes`.
  pub fn position(&self, node_id: NodeId) -> Option<usize> {
    self.positions.get(&node_id).copied()
  }

  /// Node that owns a socket.
  pub fn owner(&self, socket_id: SocketId) -> Option<NodeId> {
    self.owners.get(&socket_id).copied()
  }

  /// Output socket connected to an input socket.
  pub fn source_of(&self, input_socket: SocketId) -> Option<SocketId> {
    self.feeds.get(&input_socket).copied()
  }
}
