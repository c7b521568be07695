//! Nodeflow Processor
//!
//! A node carries no code of its own: its `node_type` tag is looked up in a
//! [`ProcessorRegistry`] to find the [`NodeProcessor`] that computes it. The
//! processor receives a [`ProcessContext`] through which it pulls the values
//! of its input sockets; how those values are produced (and memoized) is up
//! to the engine driving the run.

pub mod builtin;
mod context;
mod error;
mod output;
mod processor;
mod registry;

pub use context::{InputResolver, ProcessContext};
pub use error::NodeError;
pub use output::NodeOutput;
pub use processor::{FnProcessor, NodeProcessor};
pub use registry::ProcessorRegistry;
