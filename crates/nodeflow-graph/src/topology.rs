//! Topology resolution.
//!
//! Execution starts from end nodes and pulls inputs recursively, so nothing
//! here orders nodes. The dependency edge list only feeds the progress
//! estimate.

use std::collections::{BTreeSet, HashSet};

use crate::graph::{Graph, GraphIndex};
use crate::node::{Node, NodeId};

/// Nodes none of whose output sockets feed any connection.
///
/// A node without output sockets is always an end node. The returned nodes
/// keep the order of `graph.nodes`.
pub fn end_nodes(graph: &Graph) -> Vec<&Node> {
  let consumed: HashSet<_> = graph.connections.iter().map(|c| c.from_socket).collect();

  graph
    .nodes
    .iter()
    .filter(|node| node.outputs().all(|s| !consumed.contains(&s.id)))
    .collect()
}

/// Deduplicated `(producer, consumer)` node pairs, one per connected pair.
///
/// Connections whose sockets are unknown are skipped.
pub fn dependency_edges(graph: &Graph) -> Vec<(NodeId, NodeId)> {
  let index = GraphIndex::new(graph);

  graph
    .connections
    .iter()
    .filter_map(|c| Some((index.owner(c.from_socket)?, index.owner(c.to_socket)?)))
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Upper bound on the number of nodes a run can execute.
///
/// Counts the distinct nodes touched by the dependency edges plus the end
/// nodes. Every executed node is either an end node or the producer of some
/// edge, so progress can never exceed this total.
pub fn estimate_total(graph: &Graph) -> usize {
  dependency_edges(graph)
    .into_iter()
    .flat_map(|(producer, consumer)| [producer, consumer])
    .chain(end_nodes(graph).into_iter().map(|n| n.id))
    .collect::<HashSet<_>>()
    .len()
}
