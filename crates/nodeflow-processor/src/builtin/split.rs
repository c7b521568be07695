use std::collections::BTreeMap;

use async_trait::async_trait;
use nodeflow_graph::NodeValue;

use super::display_text;
use crate::context::ProcessContext;
use crate::error::NodeError;
use crate::output::NodeOutput;
use crate::processor::NodeProcessor;

/// Splits its first input at the first occurrence of a separator.
///
/// The head goes to the first output socket and the tail (empty when the
/// separator is absent) to the second. The separator is the node's string
/// value, or a newline when unset.
pub struct SplitProcessor;

#[async_trait]
impl NodeProcessor for SplitProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    let separator = ctx.node.value.as_str().unwrap_or("\n");
    let mut outputs = ctx.node.outputs();
    let (Some(head_socket), Some(tail_socket)) = (outputs.next(), outputs.next()) else {
      return Err(ctx.fail("split node needs two output sockets"));
    };

    let text = match ctx.node.inputs().next() {
      Some(socket) => ctx
        .input(socket.id)
        .await?
        .map(|v| display_text(&v))
        .unwrap_or_default(),
      None => String::new(),
    };

    let (head, tail) = text.split_once(separator).unwrap_or((text.as_str(), ""));

    Ok(NodeOutput::Sockets(BTreeMap::from([
      (head_socket.id, NodeValue::String(head.to_string())),
      (tail_socket.id, NodeValue::String(tail.to_string())),
    ])))
  }
}
