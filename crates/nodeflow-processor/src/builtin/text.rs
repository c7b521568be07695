use async_trait::async_trait;
use nodeflow_graph::NodeValue;

use super::display_text;
use crate::context::ProcessContext;
use crate::error::NodeError;
use crate::output::NodeOutput;
use crate::processor::NodeProcessor;

/// Emits the node's configured value.
pub struct TextProcessor;

#[async_trait]
impl NodeProcessor for TextProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    Ok(NodeOutput::Value(ctx.node.value.clone()))
  }
}

/// Emits the node's configured value as a number.
///
/// Numeric strings are accepted; anything else fails the node.
pub struct NumberProcessor;

#[async_trait]
impl NodeProcessor for NumberProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    let number = match &ctx.node.value {
      NodeValue::Number(n) => n.clone(),
      NodeValue::String(s) => s
        .trim()
        .parse::<serde_json::Number>()
        .map_err(|_| ctx.fail(format!("'{}' is not a number", s)))?,
      other => return Err(ctx.fail(format!("expected a number, got {}", other))),
    };
    Ok(NodeOutput::Value(NodeValue::Number(number)))
  }
}

/// Joins every connected input into one string.
///
/// The separator is the node's string value, or a newline when unset.
/// Unconnected inputs are skipped.
pub struct JoinProcessor;

#[async_trait]
impl NodeProcessor for JoinProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    let separator = ctx.node.value.as_str().unwrap_or("\n");
    let parts: Vec<String> = ctx
      .inputs()
      .await?
      .into_iter()
      .filter_map(|(_, value)| value.as_ref().map(display_text))
      .collect();
    Ok(NodeOutput::from(parts.join(separator)))
  }
}
