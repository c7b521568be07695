use thiserror::Error;

use crate::node::{NodeId, SocketId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("node not found: {0}")]
  NodeNotFound(NodeId),

  #[error("duplicate node id: {0}")]
  DuplicateNode(NodeId),

  #[error("duplicate socket id: {0}")]
  DuplicateSocket(SocketId),

  #[error("connection references unknown socket: {0}")]
  UnknownSocket(SocketId),

  #[error("socket {socket_id} on node {node_id} is not an output socket")]
  NotAnOutput { node_id: NodeId, socket_id: SocketId },

  #[error("socket {socket_id} on node {node_id} is not an input socket")]
  NotAnInput { node_id: NodeId, socket_id: SocketId },

  #[error("input socket {socket_id} has {count} incoming connections (at most one allowed)")]
  FanIn { socket_id: SocketId, count: usize },
}
