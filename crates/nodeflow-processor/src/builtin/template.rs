use async_trait::async_trait;
use minijinja::{Environment, Value};
use tracing::debug;

use crate::context::ProcessContext;
use crate::error::NodeError;
use crate::output::NodeOutput;
use crate::processor::NodeProcessor;

/// Renders the node's value as a minijinja template.
///
/// The template context holds one variable per input socket, named by the
/// socket title. Unconnected inputs are absent from the context, so
/// `{{ missing }}` renders as an empty string.
///
/// ```text
/// value:  "Write a short poem about {{ topic }} in a {{ tone }} tone."
/// inputs: topic <- "autumn", tone <- "wistful"
/// output: "Write a short poem about autumn in a wistful tone."
/// ```
pub struct TemplateProcessor;

#[async_trait]
impl NodeProcessor for TemplateProcessor {
  async fn process(&self, ctx: ProcessContext<'_>) -> Result<NodeOutput, NodeError> {
    let template = ctx
      .node
      .value
      .as_str()
      .ok_or_else(|| ctx.fail("template node value must be a string"))?;

    let context: serde_json::Map<String, serde_json::Value> = ctx
      .inputs()
      .await?
      .into_iter()
      .filter_map(|(socket, value)| value.map(|v| (socket.title.clone(), v)))
      .collect();
    debug!(node_id = ctx.node.id, variables = context.len(), "rendering template");

    let env = Environment::new();
    let rendered = env
      .render_str(template, Value::from_serialize(&context))
      .map_err(|e| ctx.fail(format!("failed to render template: {}", e)))?;

    Ok(NodeOutput::from(rendered))
  }
}
