use async_trait::async_trait;
use nodeflow_graph::NodeValue;

use crate::context::ProcessContext;
use crate::error::NodeError;
use crate::output::NodeOutput;
use crate::processor::NodeProcessor;

/// Parses its first input as JSON.
///
/// Non-string inputs are already structured and pass through unchanged; an
/// unconnected input yields no value.
pub struct JsonParseProcessor;

#[async_trait]
impl NodeProcessor for JsonParseProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    let Some(socket) = ctx.node.inputs().next() else {
      return Err(ctx.fail("json_parse node has no input socket"));
    };

    match ctx.input(socket.id).await? {
      None => Ok(NodeOutput::Empty),
      Some(NodeValue::String(text)) => serde_json::from_str::<NodeValue>(&text)
        .map(NodeOutput::Value)
        .map_err(|e| ctx.fail(format!("invalid JSON: {}", e))),
      Some(value) => Ok(NodeOutput::Value(value)),
    }
  }
}
