use serde::{Deserialize, Serialize};

/// Node identifier, unique within a graph.
pub type NodeId = u32;

/// Socket identifier, unique across the whole graph.
pub type SocketId = u32;

/// Normalized value produced and consumed by nodes.
///
/// Strings, numbers, booleans, arrays, plain objects or null.
pub type NodeValue = serde_json::Value;

/// Sockets are numbered `node_id * SOCKETS_PER_NODE + index`, so a node holds
/// at most this many conventionally numbered sockets.
pub const SOCKETS_PER_NODE: u32 = 100;

/// Direction of a socket relative to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDirection {
  Input,
  Output,
}

/// A typed connection point on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Socket {
  pub id: SocketId,
  pub title: String,
  pub direction: SocketDirection,
  pub node_id: NodeId,
  /// Declared data type, informational only.
  #[serde(default = "default_data_type")]
  pub data_type: String,
}

fn default_data_type() -> String {
  "any".to_string()
}

impl Socket {
  /// Create an input socket using the conventional id for `index`.
  ///
  /// # Panics
  ///
  /// Panics when [`derive_id`](Self::derive_id) has no id for the pair.
  pub fn input(
    node_id: NodeId,
    index: u32,
    title: impl Into<String>,
    data_type: impl Into<String>,
  ) -> Self {
    Self {
      id: Self::conventional_id(node_id, index),
      title: title.into(),
      direction: SocketDirection::Input,
      node_id,
      data_type: data_type.into(),
    }
  }

  /// Create an output socket using the conventional id for `index`.
  ///
  /// # Panics
  ///
  /// Panics when [`derive_id`](Self::derive_id) has no id for the pair.
  pub fn output(
    node_id: NodeId,
    index: u32,
    title: impl Into<String>,
    data_type: impl Into<String>,
  ) -> Self {
    Self {
      id: Self::conventional_id(node_id, index),
      title: title.into(),
      direction: SocketDirection::Output,
      node_id,
      data_type: data_type.into(),
    }
  }

  /// Conventional socket id for the `index`-th socket of a node.
  ///
  /// `None` when `index` would spill into the next node's ids or the id
  /// does not fit in a [`SocketId`]. Graphs with larger node ids assign
  /// socket ids explicitly.
  pub fn derive_id(node_id: NodeId, index: u32) -> Option<SocketId> {
    if index >= SOCKETS_PER_NODE {
      return None;
    }
    node_id.checked_mul(SOCKETS_PER_NODE)?.checked_add(index)
  }

  fn conventional_id(node_id: NodeId, index: u32) -> SocketId {
    match Self::derive_id(node_id, index) {
      Some(id) => id,
      None => panic!("no conventional socket id for socket {index} of node {node_id}"),
    }
  }

  pub fn is_input(&self) -> bool {
    self.direction == SocketDirection::Input
  }

  pub fn is_output(&self) -> bool {
    self.direction == SocketDirection::Output
  }
}

/// A directed edge from an output socket to an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
  pub from_socket: SocketId,
  pub to_socket: SocketId,
}

impl Connection {
  pub fn new(from_socket: SocketId, to_socket: SocketId) -> Self {
    Self {
      from_socket,
      to_socket,
    }
  }
}

/// A computation node in the graph.
///
/// The computation itself is not part of the node: it is looked up by
/// `node_type` in a processor registry when the node is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: NodeId,
  pub title: String,
  pub node_type: String,
  /// Node-specific configuration payload (e.g. the text of a text node).
  #[serde(default)]
  pub value: NodeValue,
  #[serde(default)]
  pub sockets: Vec<Socket>,
  /// Set by the engine after a run.
  #[serde(default)]
  pub processing: bool,
  /// Result of the last run that reached this node, or an `"Error: ..."` string.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<NodeValue>,
}

impl Node {
  pub fn new(id: NodeId, title: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      id,
      title: title.into(),
      node_type: node_type.into(),
      value: NodeValue::Null,
      sockets: Vec::new(),
      processing: false,
      result: None,
    }
  }

  /// Set the node's configuration value.
  pub fn with_value(mut self, value: NodeValue) -> Self {
    self.value = value;
    self
  }

  /// Append an input socket with the next conventional id.
  ///
  /// Panics past [`SOCKETS_PER_NODE`] sockets, or when the node id is too
  /// large for conventional socket ids.
  pub fn with_input(mut self, title: impl Into<String>, data_type: impl Into<String>) -> Self {
    let index = self.sockets.len() as u32;
    self
      .sockets
      .push(Socket::input(self.id, index, title, data_type));
    self
  }

  /// Append an output socket with the next conventional id.
  ///
  /// Panics past [`SOCKETS_PER_NODE`] sockets, or when the node id is too
  /// large for conventional socket ids.
  pub fn with_output(mut self, title: impl Into<String>, data_type: impl Into<String>) -> Self {
    let index = self.sockets.len() as u32;
    self
      .sockets
      .push(Socket::output(self.id, index, title, data_type));
    self
  }

  pub fn inputs(&self) -> impl Iterator<Item = &Socket> {
    self.sockets.iter().filter(|s| s.is_input())
  }

  pub fn outputs(&self) -> impl Iterator<Item = &Socket> {
    self.sockets.iter().filter(|s| s.is_output())
  }

  /// Find a socket on this node by id.
  pub fn socket(&self, socket_id: SocketId) -> Option<&Socket> {
    self.sockets.iter().find(|s| s.id == socket_id)
  }

}
