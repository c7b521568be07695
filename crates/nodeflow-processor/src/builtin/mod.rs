//! Builtin node types.
//!
//! | type         | inputs            | output                                      |
//! |--------------|-------------------|---------------------------------------------|
//! | `text`       | -                 | the node's `value`                          |
//! | `number`     | -                 | the node's `value` as a number              |
//! | `template`   | any, by title     | the node's `value` rendered with minijinja  |
//! | `join`       | any               | inputs joined with the `value` separator    |
//! | `json_parse` | first input       | the input parsed as JSON                    |
//! | `split`      | first input       | head and tail on the first two outputs      |

mod json;
mod split;
mod template;
mod text;

pub use json::JsonParseProcessor;
pub use split::SplitProcessor;
pub use template::TemplateProcessor;
pub use text::{JoinProcessor, NumberProcessor, TextProcessor};

use nodeflow_graph::NodeValue;

use crate::registry::ProcessorRegistry;

/// Register every builtin processor under its node type.
pub fn register_all(registry: &mut ProcessorRegistry) {
  registry
    .register("text", TextProcessor)
    .register("number", NumberProcessor)
    .register("template", TemplateProcessor)
    .register("join", JoinProcessor)
    .register("json_parse", JsonParseProcessor)
    .register("split", SplitProcessor);
}

/// Plain-text rendering of a value: strings verbatim, everything else as JSON.
pub(crate) fn display_text(value: &NodeValue) -> String {
  match value {
    NodeValue::String(s) => s.clone(),
    NodeValue::Null => String::new(),
    other => other.to_string(),
  }
}
