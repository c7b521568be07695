//! Nodeflow Graph
//!
//! Plain data describing a node graph: nodes carrying typed sockets, and
//! directed connections from output sockets to input sockets. Graphs are
//! serialisable so they can be loaded from JSON files.
//!
//! The [`topology`] module derives the execution entry points ("end nodes",
//! nodes whose outputs nothing consumes) and the flattened node-to-node
//! dependency list used for progress estimation.

mod builder;
mod error;
mod graph;
mod node;
pub mod topology;

pub use builder::GraphBuilder;
pub use error::GraphError;
pub use graph::{Graph, GraphIndex};
pub use node::{
  Connection, Node, NodeId, NodeValue, SOCKETS_PER_NODE, Socket, SocketDirection, SocketId,
};
pub use topology::{dependency_edges, end_nodes, estimate_total};
