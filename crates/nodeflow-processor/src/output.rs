use std::collections::BTreeMap;

use nodeflow_graph::{NodeValue, SocketId};
use serde::{Deserialize, Serialize};

/// What a processor produced for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum NodeOutput {
  /// No value at all.
  #[default]
  Empty,
  /// A single value, handed to every consumer regardless of output socket.
  Value(NodeValue),
  /// One value per output socket.
  Sockets(BTreeMap<SocketId, NodeValue>),
}

impl NodeOutput {
  /// Value seen by a consumer connected to `socket_id`.
  pub fn for_socket(&self, socket_id: SocketId) -> Option<NodeValue> {
    match self {
      Self::Empty => None,
      Self::Value(value) => Some(value.clone()),
      Self::Sockets(values) => values.get(&socket_id).cloned(),
    }
  }

  /// Display-safe form: `Empty` becomes null, per-socket outputs become an
  /// object keyed by socket id.
  pub fn to_value(&self) -> NodeValue {
    match self {
      Self::Empty => NodeValue::Null,
      Self::Value(value) => value.clone(),
      Self::Sockets(values) => NodeValue::Object(
        values
          .iter()
          .map(|(id, value)| (id.to_string(), value.clone()))
          .collect(),
      ),
    }
  }
}

impl From<NodeValue> for NodeOutput {
  fn from(value: NodeValue) -> Self {
    Self::Value(value)
  }
}

impl From<String> for NodeOutput {
  fn from(value: String) -> Self {
    Self::Value(NodeValue::String(value))
  }
}

impl From<&str> for NodeOutput {
  fn from(value: &str) -> Self {
    Self::Value(NodeValue::String(value.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_single_value_passes_through_any_socket() {
    let output = NodeOutput::from(json!({"answer": 42}));
    assert_eq!(output.for_socket(101), Some(json!({"answer": 42})));
    assert_eq!(output.for_socket(999), Some(json!({"answer": 42})));
  }

  #[test]
  fn test_socket_output_selects_entry() {
    let output = NodeOutput::Sockets(BTreeMap::from([(101, json!("head")), (102, json!("tail"))]));
    assert_eq!(output.for_socket(102), Some(json!("tail")));
    assert_eq!(output.for_socket(103), None);
    assert_eq!(output.to_value(), json!({"101": "head", "102": "tail"}));
  }

  #[test]
  fn test_empty_displays_as_null() {
    assert_eq!(NodeOutput::Empty.for_socket(1), None);
    assert_eq!(NodeOutput::Empty.to_value(), NodeValue::Null);
  }
}
